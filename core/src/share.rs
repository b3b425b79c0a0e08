//! Single-list export files and the plain-text share block.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::backup::{BackupError, ValidationReport, check_version_field, restore_item};
use crate::db::Database;
use crate::models::{
    Category, LIST_EXPORT_VERSION, ListExport, NewList, ShoppingItem, ShoppingList, now_millis,
    validate_list_name,
};

const UNCHECKED: &str = "☐";
const CHECKED: &str = "☑";
const UNKNOWN_CATEGORY_ICON: &str = "📦";

pub fn export_list(db: &Database, list_id: &str) -> Result<ListExport> {
    let list = db.get_list(list_id)?;
    let items = db.get_items_for_list(list_id)?;
    Ok(ListExport {
        version: LIST_EXPORT_VERSION.to_string(),
        exported_at: now_millis(),
        list,
        items,
    })
}

/// Validate a single-list export. Full backups are rejected.
#[must_use]
pub fn validate_list_export(candidate: &Value) -> ValidationReport {
    let Some(obj) = candidate.as_object() else {
        return ValidationReport::from_errors(vec![
            "List export must be a JSON object".to_string(),
        ]);
    };

    let mut errors = Vec::new();
    check_version_field(obj, "list export", &mut errors);

    if !obj.get("exportedAt").is_some_and(Value::is_number) {
        errors.push("exportedAt must be a number".to_string());
    }
    match obj.get("list") {
        Some(Value::Object(list)) => {
            if !list.get("name").is_some_and(Value::is_string) {
                errors.push("list.name must be a string".to_string());
            }
        }
        _ => errors.push("list must be an object".to_string()),
    }
    if !obj.get("items").is_some_and(Value::is_array) {
        errors.push("items must be an array".to_string());
    }
    if obj.contains_key("lists") || obj.contains_key("customCategories") {
        errors.push("This is a full backup, not a single-list export".to_string());
    }

    ValidationReport::from_errors(errors)
}

/// Create a new list from an export. Ids are regenerated and item
/// completion is kept.
pub fn import_list(db: &Database, candidate: &Value) -> Result<ShoppingList, BackupError> {
    validate_list_export(candidate).into_result()?;
    let export: ListExport = serde_json::from_value(candidate.clone()).map_err(|e| {
        BackupError::Restore(anyhow::Error::new(e).context("Malformed list export"))
    })?;
    restore_list(db, &export).map_err(BackupError::Restore)
}

fn restore_list(db: &Database, export: &ListExport) -> Result<ShoppingList> {
    let tx = db.transaction()?;
    let created = db.insert_list(&NewList {
        name: validate_list_name(&export.list.name)?,
        color: export.list.color.clone(),
    })?;
    for item in &export.items {
        restore_item(db, &created.id, item)
            .with_context(|| format!("Invalid item '{}'", item.name))?;
    }
    tx.commit()?;
    info!(list = %created.name, items = export.items.len(), "imported list");
    db.get_list(&created.id)
}

fn format_quantity(item: &ShoppingItem) -> Option<String> {
    let has_quantity = (item.quantity - 1.0).abs() > f64::EPSILON;
    match (&item.unit, has_quantity) {
        (Some(unit), _) => Some(format!("{} {unit}", item.quantity)),
        (None, true) => Some(item.quantity.to_string()),
        (None, false) => None,
    }
}

/// Render a list for pasting into a message.
///
/// Items are grouped under their category headings in display order. Empty
/// categories are skipped, and items whose category is unknown go last.
#[must_use]
pub fn format_share_text(
    list: &ShoppingList,
    items: &[ShoppingItem],
    categories: &[Category],
) -> String {
    let mut out = format!("🛒 {}\n", list.name);

    if items.is_empty() {
        out.push_str("\nNo items\n");
        return out;
    }

    let mut sections: Vec<(String, Vec<&ShoppingItem>)> = categories
        .iter()
        .map(|c| (format!("{} {}", c.icon, c.name), Vec::new()))
        .collect();
    let mut unknown: Vec<(String, Vec<&ShoppingItem>)> = Vec::new();

    for item in items {
        if let Some(idx) = categories.iter().position(|c| c.id == item.category) {
            sections[idx].1.push(item);
        } else if let Some(section) = unknown
            .iter_mut()
            .find(|(id, _)| *id == item.category)
        {
            section.1.push(item);
        } else {
            unknown.push((item.category.clone(), vec![item]));
        }
    }
    sections.extend(
        unknown
            .into_iter()
            .map(|(id, entries)| (format!("{UNKNOWN_CATEGORY_ICON} {id}"), entries)),
    );

    for (heading, entries) in sections.iter().filter(|(_, e)| !e.is_empty()) {
        let _ = write!(out, "\n{heading}\n");
        for item in entries {
            let glyph = if item.completed { CHECKED } else { UNCHECKED };
            match format_quantity(item) {
                Some(qty) => {
                    let _ = writeln!(out, "{glyph} {} ({qty})", item.name);
                }
                None => {
                    let _ = writeln!(out, "{glyph} {}", item.name);
                }
            }
        }
    }

    let completed = items.iter().filter(|i| i.completed).count();
    let noun = if items.len() == 1 { "item" } else { "items" };
    let _ = write!(out, "\n{} {noun} · {completed} completed\n", items.len());
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backup::{export_backup, validate_backup};
    use crate::categories::builtin_categories;
    use crate::models::NewItem;

    fn list(name: &str) -> ShoppingList {
        ShoppingList {
            id: "l1".to_string(),
            name: name.to_string(),
            created_at: 0,
            updated_at: 0,
            archived: false,
            color: None,
        }
    }

    fn item(name: &str, category: &str, completed: bool) -> ShoppingItem {
        ShoppingItem {
            id: format!("i-{name}"),
            list_id: "l1".to_string(),
            name: name.to_string(),
            quantity: 1.0,
            unit: None,
            category: category.to_string(),
            completed,
            added_at: 0,
            completed_at: completed.then_some(1),
            barcode: None,
            notes: None,
        }
    }

    #[test]
    fn test_share_text_groups_by_category_order() {
        let items = vec![
            item("Bread", "bakery", false),
            item("Milk", "dairy", true),
            item("Apples", "produce", false),
        ];
        let text = format_share_text(&list("Groceries"), &items, &builtin_categories());

        assert!(text.starts_with("🛒 Groceries\n"));
        let produce = text.find("🥬 Produce").unwrap();
        let dairy = text.find("🥛 Dairy & Eggs").unwrap();
        let bakery = text.find("🍞 Bakery").unwrap();
        assert!(produce < dairy && dairy < bakery);
        assert!(text.contains("☑ Milk\n"));
        assert!(text.contains("☐ Bread\n"));
        assert!(!text.contains("Frozen"));
        assert!(text.ends_with("3 items · 1 completed\n"));
    }

    #[test]
    fn test_share_text_quantities() {
        let mut apples = item("Apples", "produce", false);
        apples.quantity = 6.0;
        let mut milk = item("Milk", "dairy", false);
        milk.quantity = 2.0;
        milk.unit = Some("L".to_string());
        let mut flour = item("Flour", "pantry", false);
        flour.unit = Some("kg".to_string());

        let text = format_share_text(&list("L"), &[apples, milk, flour], &builtin_categories());
        assert!(text.contains("☐ Apples (6)\n"));
        assert!(text.contains("☐ Milk (2 L)\n"));
        assert!(text.contains("☐ Flour (1 kg)\n"));
    }

    #[test]
    fn test_share_text_unknown_category_last() {
        let items = vec![item("Widget", "custom-gone", false), item("Milk", "dairy", false)];
        let text = format_share_text(&list("L"), &items, &builtin_categories());
        let dairy = text.find("Dairy").unwrap();
        let unknown = text.find("📦 custom-gone").unwrap();
        assert!(dairy < unknown);
    }

    #[test]
    fn test_share_text_empty_and_singular() {
        let empty = format_share_text(&list("Empty"), &[], &builtin_categories());
        assert_eq!(empty, "🛒 Empty\n\nNo items\n");

        let one = format_share_text(
            &list("One"),
            &[item("Milk", "dairy", false)],
            &builtin_categories(),
        );
        assert!(one.ends_with("1 item · 0 completed\n"));
    }

    #[test]
    fn test_export_and_import_list() {
        let db = Database::open_in_memory().unwrap();
        let groceries = db
            .insert_list(&NewList {
                name: "Groceries".to_string(),
                color: Some("#123456".to_string()),
            })
            .unwrap();
        let milk = db
            .insert_item(&NewItem::named(&groceries.id, "Milk", "dairy"))
            .unwrap();
        db.insert_item(&NewItem::named(&groceries.id, "Bread", "bakery"))
            .unwrap();
        db.set_item_completed(&milk.id, true).unwrap();

        let export = export_list(&db, &groceries.id).unwrap();
        assert_eq!(export.items.len(), 2);
        let value = serde_json::to_value(&export).unwrap();
        assert!(validate_list_export(&value).valid);
        assert!(!validate_backup(&value).valid);

        let imported = import_list(&db, &value).unwrap();
        assert_ne!(imported.id, groceries.id);
        assert_eq!(imported.name, "Groceries");
        assert_eq!(imported.color.as_deref(), Some("#123456"));

        let items = db.get_items_for_list(&imported.id).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().any(|i| i.name == "Milk" && i.completed));
        assert!(items.iter().all(|i| i.list_id == imported.id));
    }

    #[test]
    fn test_list_export_rejects_full_backup() {
        let db = Database::open_in_memory().unwrap();
        let backup = serde_json::to_value(export_backup(&db).unwrap()).unwrap();
        let report = validate_list_export(&backup);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("full backup")));

        let err = import_list(&db, &backup).unwrap_err();
        assert!(matches!(err, BackupError::Validation { .. }));
    }

    #[test]
    fn test_list_export_version_checked() {
        let report = validate_list_export(&json!({
            "version": "3.0.0", "exportedAt": 1,
            "list": {"id": "l1", "name": "L"}, "items": []
        }));
        assert!(!report.valid);
        assert!(report.errors[0].contains("Incompatible list export version"));
    }

    #[test]
    fn test_import_list_bad_item_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let export = json!({
            "version": "1.0.0", "exportedAt": 1,
            "list": {"id": "l1", "name": "Party"},
            "items": [{"listId": "l1", "name": "Chips", "quantity": -1}]
        });
        let err = import_list(&db, &export).unwrap_err();
        assert!(matches!(err, BackupError::Restore(_)));
        assert!(db.get_all_lists(true).unwrap().is_empty());
    }
}
