use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::parse::sanitize_item_name;

/// Version written into full backups. Only the major component is checked on import.
pub const BACKUP_VERSION: &str = "1.0.0";

/// Version written into single-list exports.
pub const LIST_EXPORT_VERSION: &str = "1.0.0";

/// Sentinel category for anything the keyword index does not recognise.
pub const OTHER_CATEGORY: &str = "other";

#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Lowercased, trimmed form of an item name. Preferences and the
/// category fan-out are keyed by this.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn default_quantity() -> f64 {
    1.0
}

fn default_category() -> String {
    OTHER_CATEGORY.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    #[serde(default)]
    pub id: String,
    pub list_id: String,
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub added_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryOrigin {
    Builtin,
    Custom,
}

/// A category as shown to the user: built-in and custom categories merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub sort_order: i64,
    pub origin: CategoryOrigin,
}

/// A user-created category as persisted and as carried in backups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomCategory {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

pub const CUSTOM_CATEGORY_ICON: &str = "🏷️";

impl From<CustomCategory> for Category {
    fn from(c: CustomCategory) -> Self {
        Self {
            id: c.id,
            name: c.name,
            icon: c.icon.unwrap_or_else(|| CUSTOM_CATEGORY_ICON.to_string()),
            sort_order: c.sort_order,
            origin: CategoryOrigin::Custom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub barcode: String,
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub last_used: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPreference {
    /// Normalized item name.
    pub name: String,
    pub category: String,
    pub learned_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewList {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub list_id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: Option<String>,
    pub category: String,
    pub barcode: Option<String>,
    pub notes: Option<String>,
}

impl NewItem {
    /// An item with quantity 1 and no unit, barcode or notes.
    #[must_use]
    pub fn named(list_id: &str, name: &str, category: &str) -> Self {
        Self {
            list_id: list_id.to_string(),
            name: name.to_string(),
            quantity: 1.0,
            unit: None,
            category: category.to_string(),
            barcode: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateItem {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub barcode: String,
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone)]
pub struct NewCustomCategory {
    pub name: String,
    pub icon: Option<String>,
}

// --- Backup / export types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub version: String,
    pub timestamp: i64,
    pub lists: Vec<ShoppingList>,
    pub items: Vec<ShoppingItem>,
    pub custom_categories: Vec<CustomCategory>,
    pub products: Vec<Product>,
    #[serde(default)]
    pub category_preferences: BTreeMap<String, String>,
    #[serde(default)]
    pub category_order: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListExport {
    pub version: String,
    pub exported_at: i64,
    pub list: ShoppingList,
    pub items: Vec<ShoppingItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_field_names)]
pub struct ImportSummary {
    pub merged: bool,
    pub lists_removed: usize,
    pub lists_restored: usize,
    pub items_restored: usize,
    pub categories_restored: usize,
    pub products_restored: usize,
    pub preferences_restored: usize,
    pub orphaned_items_skipped: usize,
    pub preferences_skipped: usize,
}

// --- Validation ---

/// Sanitize a list name and reject it if nothing is left.
pub fn validate_list_name(name: &str) -> Result<String> {
    let clean = sanitize_item_name(name);
    if clean.is_empty() {
        bail!("List name must not be empty");
    }
    Ok(clean)
}

/// Sanitize an item name and reject it if nothing is left.
pub fn validate_item_name(name: &str) -> Result<String> {
    let clean = sanitize_item_name(name);
    if clean.is_empty() {
        bail!("Item name must not be empty");
    }
    Ok(clean)
}

pub fn validate_quantity(quantity: f64) -> Result<f64> {
    if !quantity.is_finite() || quantity <= 0.0 {
        bail!("Quantity must be greater than 0 (got {quantity})");
    }
    Ok(quantity)
}

pub fn validate_category_name(name: &str) -> Result<String> {
    let clean = sanitize_item_name(name);
    if clean.is_empty() {
        bail!("Category name must not be empty");
    }
    Ok(clean)
}

/// Validate an item row restored from a backup or list export.
pub fn validate_restored_item(item: &ShoppingItem) -> Result<()> {
    validate_item_name(&item.name)?;
    validate_quantity(item.quantity)?;
    if item.category.trim().is_empty() {
        bail!("Item '{}' has an empty category", item.name);
    }
    Ok(())
}
