use anyhow::{Result, bail};

use basket_core::models::{ShoppingItem, UpdateItem};
use basket_core::service::ShoppingService;

use super::helpers::{format_quantity, not_found, resolve_category_id, resolve_list};

fn require_item(svc: &ShoppingService, id: &str, json: bool) -> Result<ShoppingItem> {
    match svc.find_item(id)? {
        Some(item) => Ok(item),
        None => not_found(&format!("Item {id} not found"), json),
    }
}

/// Quick add: the text may hold several items, a pasted block or a transcript.
pub(crate) fn cmd_add(svc: &ShoppingService, list: &str, text: &str, json: bool) -> Result<()> {
    let list = resolve_list(svc, list, json)?;
    let added = svc.quick_add(&list.id, text)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&added)?);
    } else if added.is_empty() {
        eprintln!("Nothing to add");
    } else {
        for item in &added {
            println!("Added {} [{}] to '{}'", item.name, item.category, list.name);
        }
    }
    Ok(())
}

pub(crate) fn cmd_item_add(
    svc: &ShoppingService,
    list: &str,
    name: &str,
    quantity: f64,
    unit: Option<String>,
    json: bool,
) -> Result<()> {
    let list = resolve_list(svc, list, json)?;
    let item = svc.add_item(&list.id, name, quantity, unit)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!(
            "Added {} x{} [{}] to '{}'",
            item.name,
            format_quantity(&item),
            item.category,
            list.name
        );
    }
    Ok(())
}

pub(crate) fn cmd_item_check(
    svc: &ShoppingService,
    id: &str,
    completed: bool,
    json: bool,
) -> Result<()> {
    require_item(svc, id, json)?;
    let item = svc.set_item_completed(id, completed)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else if completed {
        println!("☑ {}", item.name);
    } else {
        println!("☐ {}", item.name);
    }
    Ok(())
}

pub(crate) fn cmd_item_rm(svc: &ShoppingService, id: &str, json: bool) -> Result<()> {
    if !svc.delete_item(id)? {
        not_found(&format!("Item {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted item {id}");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
pub(crate) fn cmd_item_edit(
    svc: &ShoppingService,
    id: &str,
    name: Option<String>,
    quantity: Option<f64>,
    unit: Option<String>,
    clear_unit: bool,
    notes: Option<String>,
    clear_notes: bool,
    json: bool,
) -> Result<()> {
    let update = UpdateItem {
        name,
        quantity,
        unit: if clear_unit { Some(None) } else { unit.map(Some) },
        notes: if clear_notes { Some(None) } else { notes.map(Some) },
    };
    if update.name.is_none()
        && update.quantity.is_none()
        && update.unit.is_none()
        && update.notes.is_none()
    {
        bail!("Nothing to update. Provide at least one of --name, --quantity, --unit or --notes");
    }

    require_item(svc, id, json)?;
    let item = svc.update_item(id, &update)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("Updated {} x{}", item.name, format_quantity(&item));
    }
    Ok(())
}

/// Recategorize an item and every item sharing its name, in all lists.
pub(crate) fn cmd_item_recat(
    svc: &ShoppingService,
    id: &str,
    category: &str,
    json: bool,
) -> Result<()> {
    let item = require_item(svc, id, json)?;
    let category_id = resolve_category_id(svc, category, json)?;
    let updated = svc.change_item_category(id, &category_id)?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "name": item.name, "category": category_id, "updated": updated })
        );
    } else {
        println!(
            "'{}' is now [{category_id}] ({updated} item(s) updated across all lists)",
            item.name
        );
    }
    Ok(())
}

pub(crate) fn cmd_clear(svc: &ShoppingService, list: &str, json: bool) -> Result<()> {
    let list = resolve_list(svc, list, json)?;
    let removed = svc.clear_completed(&list.id)?;
    if json {
        println!("{}", serde_json::json!({ "list": list.id, "removed": removed }));
    } else {
        println!("Removed {removed} completed item(s) from '{}'", list.name);
    }
    Ok(())
}
