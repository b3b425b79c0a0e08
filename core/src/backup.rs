//! Full backup snapshots: export, shape validation and restore.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::db::Database;
use crate::models::{
    BACKUP_VERSION, BackupSnapshot, ImportSummary, NewItem, NewList, ShoppingItem, now_millis,
    validate_list_name, validate_restored_item,
};
use crate::parse::sanitize_item_name;

/// Major version this build can restore.
pub const SUPPORTED_MAJOR_VERSION: u64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Invalid backup: {}", .errors.join("; "))]
    Validation { errors: Vec<String> },

    #[error("Failed to restore backup: {0:#}")]
    Restore(anyhow::Error),

    #[error("Backup is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackupError {
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, BackupError::Validation { .. } | BackupError::Json(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub(crate) fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub(crate) fn into_result(self) -> Result<(), BackupError> {
        if self.valid {
            Ok(())
        } else {
            Err(BackupError::Validation {
                errors: self.errors,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Layer the snapshot over existing data instead of replacing it.
    pub merge: bool,
}

/// Check a `version` string against [`SUPPORTED_MAJOR_VERSION`].
pub(crate) fn check_version(version: &str, what: &str) -> Option<String> {
    let major = version.trim().split('.').next().unwrap_or_default();
    match major.parse::<u64>() {
        Ok(SUPPORTED_MAJOR_VERSION) => None,
        Ok(_) => Some(format!(
            "Incompatible {what} version {version} (supported: {SUPPORTED_MAJOR_VERSION}.x)"
        )),
        Err(_) => Some(format!("Unrecognised {what} version '{version}'")),
    }
}

pub(crate) fn check_version_field(
    obj: &serde_json::Map<String, Value>,
    what: &str,
    errors: &mut Vec<String>,
) {
    match obj.get("version") {
        None => errors.push("Missing version".to_string()),
        Some(Value::String(version)) => errors.extend(check_version(version, what)),
        Some(_) => errors.push("version must be a string".to_string()),
    }
}

/// Validate the shape of a candidate backup, collecting every problem found.
#[must_use]
pub fn validate_backup(candidate: &Value) -> ValidationReport {
    let Some(obj) = candidate.as_object() else {
        return ValidationReport::from_errors(vec!["Backup must be a JSON object".to_string()]);
    };

    let mut errors = Vec::new();
    check_version_field(obj, "backup", &mut errors);

    match obj.get("timestamp") {
        Some(ts) if ts.is_i64() => {}
        Some(ts) if ts.is_number() => {
            errors.push("timestamp must be a whole number of milliseconds".to_string());
        }
        _ => errors.push("timestamp must be a number".to_string()),
    }
    for field in ["lists", "items", "customCategories", "products"] {
        if !obj.get(field).is_some_and(Value::is_array) {
            errors.push(format!("{field} must be an array"));
        }
    }
    if obj.get("categoryPreferences").is_some_and(|v| !v.is_object()) {
        errors.push("categoryPreferences must be an object".to_string());
    }
    if obj.get("categoryOrder").is_some_and(|v| !v.is_array()) {
        errors.push("categoryOrder must be an array".to_string());
    }
    if obj.contains_key("exportedAt") && obj.get("list").is_some_and(Value::is_object) {
        errors.push("This is a single-list export, not a full backup".to_string());
    }

    ValidationReport::from_errors(errors)
}

/// Collect every list (archived included), item, custom category, product,
/// preference and the category order into one snapshot.
pub fn export_backup(db: &Database) -> Result<BackupSnapshot> {
    let lists = db.get_all_lists(true)?;
    let mut items = Vec::new();
    for list in &lists {
        items.extend(db.get_items_for_list(&list.id)?);
    }
    let category_preferences = db
        .get_all_preferences()?
        .into_iter()
        .map(|p| (p.name, p.category))
        .collect();

    let snapshot = BackupSnapshot {
        version: BACKUP_VERSION.to_string(),
        timestamp: now_millis(),
        lists,
        items,
        custom_categories: db.get_custom_categories()?,
        products: db.get_all_products()?,
        category_preferences,
        category_order: db.get_category_order()?,
    };
    info!(
        lists = snapshot.lists.len(),
        items = snapshot.items.len(),
        products = snapshot.products.len(),
        "exported backup"
    );
    Ok(snapshot)
}

pub fn export_backup_json(db: &Database) -> Result<String> {
    let snapshot = export_backup(db)?;
    serde_json::to_string_pretty(&snapshot).context("Failed to serialize backup")
}

/// Parse backup text and import it.
pub fn import_backup_str(
    db: &Database,
    text: &str,
    options: ImportOptions,
) -> Result<ImportSummary, BackupError> {
    let value: Value = serde_json::from_str(text)?;
    import_backup(db, &value, options)
}

/// Validate and restore a backup. Nothing is written unless validation
/// passes, and a failure while restoring rolls the whole import back.
pub fn import_backup(
    db: &Database,
    candidate: &Value,
    options: ImportOptions,
) -> Result<ImportSummary, BackupError> {
    validate_backup(candidate).into_result()?;

    let snapshot: BackupSnapshot = serde_json::from_value(candidate.clone())
        .map_err(|e| BackupError::Restore(anyhow::Error::new(e).context("Malformed backup row")))?;

    restore(db, &snapshot, options).map_err(BackupError::Restore)
}

fn restore(db: &Database, snapshot: &BackupSnapshot, options: ImportOptions) -> Result<ImportSummary> {
    let tx = db.transaction()?;
    let mut summary = ImportSummary {
        merged: options.merge,
        ..ImportSummary::default()
    };

    if !options.merge {
        summary.lists_removed = db.delete_all_lists()?;
        db.clear_products()?;
        db.delete_all_custom_categories()?;
    }

    for category in &snapshot.custom_categories {
        db.upsert_custom_category(category)
            .with_context(|| format!("Failed to restore category '{}'", category.name))?;
        summary.categories_restored += 1;
    }
    db.prune_orphaned_preferences()?;

    for product in &snapshot.products {
        db.restore_product(product)
            .with_context(|| format!("Failed to restore product {}", product.barcode))?;
        summary.products_restored += 1;
    }

    let mut items_by_list: HashMap<&str, Vec<&ShoppingItem>> = HashMap::new();
    for item in &snapshot.items {
        items_by_list
            .entry(item.list_id.as_str())
            .or_default()
            .push(item);
    }

    for list in &snapshot.lists {
        let name = validate_list_name(&list.name)
            .with_context(|| format!("Invalid list '{}'", list.id))?;
        let created = db.insert_list(&NewList {
            name,
            color: list.color.clone(),
        })?;

        for item in items_by_list.remove(list.id.as_str()).unwrap_or_default() {
            restore_item(db, &created.id, item)
                .with_context(|| format!("Invalid item '{}' in list '{}'", item.name, list.name))?;
            summary.items_restored += 1;
        }

        if list.archived {
            db.set_list_archived(&created.id, true)?;
        }
        summary.lists_restored += 1;
    }

    let orphaned: usize = items_by_list.values().map(Vec::len).sum();
    if orphaned > 0 {
        warn!(orphaned, "skipped backup items that reference a missing list");
    }
    summary.orphaned_items_skipped = orphaned;

    let known = db.category_ids()?;
    for (name, category) in &snapshot.category_preferences {
        if !known.contains(category) {
            warn!(%name, %category, "skipped preference for unknown category");
            summary.preferences_skipped += 1;
            continue;
        }
        db.save_preference(name, category)
            .with_context(|| format!("Failed to restore preference for '{name}'"))?;
        summary.preferences_restored += 1;
    }

    if !options.merge || !snapshot.category_order.is_empty() {
        db.set_category_order(&snapshot.category_order)?;
    }

    tx.commit()?;
    info!(
        merged = summary.merged,
        lists = summary.lists_restored,
        items = summary.items_restored,
        "imported backup"
    );
    Ok(summary)
}

/// Recreate an item under `list_id`, then re-apply its completion state.
pub(crate) fn restore_item(db: &Database, list_id: &str, item: &ShoppingItem) -> Result<()> {
    validate_restored_item(item)?;
    let created = db.insert_item(&NewItem {
        list_id: list_id.to_string(),
        name: sanitize_item_name(&item.name),
        quantity: item.quantity,
        unit: item.unit.clone(),
        category: item.category.clone(),
        barcode: item.barcode.clone(),
        notes: item.notes.clone(),
    })?;
    if item.completed {
        db.set_item_completed_at(&created.id, Some(item.completed_at.unwrap_or_else(now_millis)))?;
    }
    Ok(())
}
