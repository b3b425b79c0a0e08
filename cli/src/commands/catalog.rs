use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use basket_core::models::CategoryOrigin;
use basket_core::service::ShoppingService;

use super::helpers::{format_timestamp, not_found, resolve_category_id, truncate};

// --- Products ---

pub(crate) fn cmd_product_ls(svc: &ShoppingService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct ProductRow {
        #[tabled(rename = "Barcode")]
        barcode: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Last used")]
        last_used: String,
    }

    let products = svc.products()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&products)?);
        return Ok(());
    }
    if products.is_empty() {
        eprintln!("No cached products. Scan a barcode with `basket scan` to add one.");
        return Ok(());
    }

    let rows: Vec<ProductRow> = products
        .iter()
        .map(|p| ProductRow {
            barcode: p.barcode.clone(),
            name: truncate(&p.name, 35),
            category: p.category.clone(),
            last_used: format_timestamp(p.last_used),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_product_rm(svc: &ShoppingService, barcode: &str, json: bool) -> Result<()> {
    if !svc.delete_product(barcode)? {
        not_found(&format!("Product {barcode} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": barcode }));
    } else {
        println!("Removed product {barcode}");
    }
    Ok(())
}

pub(crate) fn cmd_product_clear(svc: &ShoppingService, json: bool) -> Result<()> {
    let removed = svc.clear_products()?;
    if json {
        println!("{}", serde_json::json!({ "removed": removed }));
    } else {
        println!("Removed {removed} cached product(s)");
    }
    Ok(())
}

// --- Categories ---

pub(crate) fn cmd_category_ls(svc: &ShoppingService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct CategoryRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "")]
        icon: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Origin")]
        origin: String,
    }

    let categories = svc.categories()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }

    let rows: Vec<CategoryRow> = categories
        .iter()
        .map(|c| CategoryRow {
            id: c.id.clone(),
            icon: c.icon.clone(),
            name: c.name.clone(),
            origin: match c.origin {
                CategoryOrigin::Builtin => "built-in".to_string(),
                CategoryOrigin::Custom => "custom".to_string(),
            },
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_category_add(
    svc: &ShoppingService,
    name: &str,
    icon: Option<String>,
    json: bool,
) -> Result<()> {
    let created = svc.create_custom_category(name, icon)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        println!("Created category '{}' ({})", created.name, created.id);
    }
    Ok(())
}

pub(crate) fn cmd_category_rm(svc: &ShoppingService, category: &str, json: bool) -> Result<()> {
    let id = resolve_category_id(svc, category, json)?;
    if !svc.delete_custom_category(&id)? {
        not_found(&format!("Category '{category}' not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted category {id}; its items moved to 'other'");
    }
    Ok(())
}

pub(crate) fn cmd_category_order(
    svc: &ShoppingService,
    categories: &[String],
    json: bool,
) -> Result<()> {
    let mut order = Vec::with_capacity(categories.len());
    for category in categories {
        order.push(resolve_category_id(svc, category, json)?);
    }
    svc.set_category_order(&order)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&svc.categories()?)?);
    } else {
        let names: Vec<String> = svc.categories()?.into_iter().map(|c| c.name).collect();
        println!("Category order: {}", names.join(", "));
    }
    Ok(())
}

pub(crate) fn cmd_category_reset_order(svc: &ShoppingService, json: bool) -> Result<()> {
    svc.reset_category_order()?;
    if json {
        println!("{}", serde_json::json!({ "reset": true }));
    } else {
        println!("Category order reset to default");
    }
    Ok(())
}

// --- Preferences ---

pub(crate) fn cmd_pref_ls(svc: &ShoppingService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct PrefRow {
        #[tabled(rename = "Item")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Learned")]
        learned_at: String,
    }

    let prefs = svc.preferences()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&prefs)?);
        return Ok(());
    }
    if prefs.is_empty() {
        eprintln!("No learned preferences. Use `basket item recat` to teach one.");
        return Ok(());
    }

    let rows: Vec<PrefRow> = prefs
        .iter()
        .map(|p| PrefRow {
            name: truncate(&p.name, 35),
            category: p.category.clone(),
            learned_at: format_timestamp(p.learned_at),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_pref_rm(svc: &ShoppingService, name: &str, json: bool) -> Result<()> {
    if !svc.forget_preference(name)? {
        not_found(&format!("No preference for '{name}'"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "forgotten": name }));
    } else {
        println!("Forgot the category preference for '{name}'");
    }
    Ok(())
}
