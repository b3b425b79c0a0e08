use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use basket_core::models::{Category, ShoppingItem, ShoppingList};
use basket_core::service::ShoppingService;

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a lookup miss and exit with status 2.
pub(crate) fn not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

/// Look a list up by id or name, exiting with status 2 if there is none.
pub(crate) fn resolve_list(svc: &ShoppingService, list: &str, json: bool) -> Result<ShoppingList> {
    match svc.find_list(list)? {
        Some(found) => Ok(found),
        None => not_found(&format!("List '{list}' not found"), json),
    }
}

/// Match a category by id, then by case-insensitive display name.
pub(crate) fn find_category<'a>(categories: &'a [Category], query: &str) -> Option<&'a Category> {
    let wanted = query.trim().to_lowercase();
    categories
        .iter()
        .find(|c| c.id == query.trim())
        .or_else(|| categories.iter().find(|c| c.name.to_lowercase() == wanted))
}

pub(crate) fn resolve_category_id(svc: &ShoppingService, query: &str, json: bool) -> Result<String> {
    let categories = svc.categories()?;
    match find_category(&categories, query) {
        Some(category) => Ok(category.id.clone()),
        None => not_found(&format!("Category '{query}' not found"), json),
    }
}

pub(crate) fn read_json_file(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Write to `path`, or to stdout when no path is given.
pub(crate) fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

pub(crate) fn format_timestamp(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}

pub(crate) fn format_quantity(item: &ShoppingItem) -> String {
    match &item.unit {
        Some(unit) => format!("{} {unit}", item.quantity),
        None => item.quantity.to_string(),
    }
}

pub(crate) fn print_lists_table(lists: &[ShoppingList], counts: &[(usize, usize)]) {
    #[derive(Tabled)]
    struct ListRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Items")]
        items: String,
        #[tabled(rename = "Updated")]
        updated: String,
        #[tabled(rename = "Archived")]
        archived: String,
    }

    let rows: Vec<ListRow> = lists
        .iter()
        .zip(counts)
        .map(|(l, (total, done))| ListRow {
            id: l.id.clone(),
            name: truncate(&l.name, 30),
            items: format!("{done}/{total}"),
            updated: format_timestamp(l.updated_at),
            archived: if l.archived { "yes".into() } else { String::new() },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_items_table(items: &[ShoppingItem], categories: &[Category]) {
    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "")]
        done: &'static str,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    let rows: Vec<ItemRow> = items
        .iter()
        .map(|i| ItemRow {
            done: if i.completed { "☑" } else { "☐" },
            id: i.id.clone(),
            name: truncate(&i.name, 35),
            quantity: format_quantity(i),
            category: categories
                .iter()
                .find(|c| c.id == i.category)
                .map_or_else(|| i.category.clone(), |c| format!("{} {}", c.icon, c.name)),
            notes: i
                .notes
                .as_deref()
                .map(|n| truncate(n, 25))
                .unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
