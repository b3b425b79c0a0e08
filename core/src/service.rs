use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::backup::{self, BackupError, ImportOptions, ValidationReport};
use crate::categories::resolve_category;
use crate::db::Database;
use crate::models::{
    BackupSnapshot, Category, CategoryPreference, CustomCategory, ImportSummary, ListExport,
    NewCustomCategory, NewItem, NewList, NewProduct, Product, ShoppingItem, ShoppingList,
    UpdateItem, validate_category_name, validate_item_name, validate_list_name,
    validate_quantity,
};
use crate::parse::parse_items;
use crate::share;

/// A barcode as handed over by a camera or decoder adapter.
#[derive(Debug, Clone)]
pub struct ScannedBarcode {
    pub barcode: String,
    /// Symbology reported by the decoder, e.g. `EAN_13`. Informational only.
    pub format: Option<String>,
}

impl ScannedBarcode {
    #[must_use]
    pub fn new(barcode: &str) -> Self {
        Self {
            barcode: barcode.trim().to_string(),
            format: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScanOutcome {
    /// The barcode was cached; an item was added to the list.
    Added {
        item: ShoppingItem,
        product: Product,
    },
    /// Unknown barcode. Nothing was added; the caller should ask for a name
    /// and category and call [`ShoppingService::add_scanned_product`].
    Unknown { barcode: String },
}

pub struct ShoppingService {
    db: Database,
}

impl ShoppingService {
    pub fn open(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    // --- Adding items ---

    /// Parse free text (typed, pasted or a voice transcript) into items and
    /// add them, each categorized through the learned preferences first.
    pub fn quick_add(&self, list_id: &str, text: &str) -> Result<Vec<ShoppingItem>> {
        self.db.get_list(list_id)?;
        let names = parse_items(text);
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let tx = self.db.transaction()?;
        let mut added = Vec::with_capacity(names.len());
        for name in names {
            let category = resolve_category(&self.db, &name)?;
            added.push(
                self.db
                    .insert_item(&NewItem::named(list_id, &name, &category))?,
            );
        }
        tx.commit()?;
        info!(list_id, count = added.len(), "quick add");
        Ok(added)
    }

    pub fn add_item(
        &self,
        list_id: &str,
        name: &str,
        quantity: f64,
        unit: Option<String>,
    ) -> Result<ShoppingItem> {
        let name = validate_item_name(name)?;
        let quantity = validate_quantity(quantity)?;
        let category = resolve_category(&self.db, &name)?;
        self.db.insert_item(&NewItem {
            quantity,
            unit,
            ..NewItem::named(list_id, &name, &category)
        })
    }

    /// Add a scanned product. A learned preference for the product's name
    /// overrides its cached category, and the cache is updated to match.
    pub fn scan_barcode(&self, list_id: &str, scanned: &ScannedBarcode) -> Result<ScanOutcome> {
        self.db.get_list(list_id)?;
        let Some(cached) = self.db.get_product_by_barcode(&scanned.barcode)? else {
            debug!(barcode = %scanned.barcode, format = ?scanned.format, "unknown barcode");
            return Ok(ScanOutcome::Unknown {
                barcode: scanned.barcode.clone(),
            });
        };

        let tx = self.db.transaction()?;
        let preferred = self.db.get_preferred_category(&cached.name)?;
        let product = match preferred {
            Some(category) if category != cached.category => {
                self.db.save_product(&NewProduct {
                    barcode: cached.barcode.clone(),
                    name: cached.name.clone(),
                    category,
                })?
            }
            _ => {
                self.db.update_product_last_used(&cached.barcode)?;
                self.db
                    .get_product_by_barcode(&cached.barcode)?
                    .unwrap_or(cached)
            }
        };
        let item = self.db.insert_item(&NewItem {
            barcode: Some(product.barcode.clone()),
            ..NewItem::named(list_id, &product.name, &product.category)
        })?;
        tx.commit()?;
        Ok(ScanOutcome::Added { item, product })
    }

    /// Manual entry after an unknown scan: cache the product and add it.
    /// Without an explicit category the name is categorized as usual.
    pub fn add_scanned_product(
        &self,
        list_id: &str,
        barcode: &str,
        name: &str,
        category: Option<&str>,
    ) -> Result<(ShoppingItem, Product)> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            bail!("Barcode must not be empty");
        }
        let name = validate_item_name(name)?;
        let category = match category {
            Some(id) => self.require_category(id)?.id,
            None => resolve_category(&self.db, &name)?,
        };

        let tx = self.db.transaction()?;
        let product = self.db.save_product(&NewProduct {
            barcode: barcode.to_string(),
            name: name.clone(),
            category: category.clone(),
        })?;
        let item = self.db.insert_item(&NewItem {
            barcode: Some(barcode.to_string()),
            ..NewItem::named(list_id, &name, &category)
        })?;
        tx.commit()?;
        Ok((item, product))
    }

    /// Move an item to another category, learn the choice, and apply it to
    /// every item with the same normalized name in every list.
    pub fn change_item_category(&self, item_id: &str, category: &str) -> Result<usize> {
        let category = self.require_category(category)?;
        let item = self.db.get_item(item_id)?;
        self.db.apply_category_preference(&item.name, &category.id)
    }

    // --- Lists ---

    pub fn create_list(&self, name: &str, color: Option<String>) -> Result<ShoppingList> {
        let name = validate_list_name(name)?;
        self.db.insert_list(&NewList { name, color })
    }

    pub fn get_list(&self, id: &str) -> Result<ShoppingList> {
        self.db.get_list(id)
    }

    /// Resolve a list by id or case-insensitive name.
    pub fn find_list(&self, id_or_name: &str) -> Result<Option<ShoppingList>> {
        self.db.find_list(id_or_name)
    }

    pub fn require_list(&self, id_or_name: &str) -> Result<ShoppingList> {
        self.db
            .find_list(id_or_name)?
            .with_context(|| format!("List not found: {id_or_name}"))
    }

    pub fn lists(&self, include_archived: bool) -> Result<Vec<ShoppingList>> {
        self.db.get_all_lists(include_archived)
    }

    pub fn rename_list(&self, id: &str, name: &str) -> Result<ShoppingList> {
        let name = validate_list_name(name)?;
        self.db.rename_list(id, &name)
    }

    pub fn set_list_archived(&self, id: &str, archived: bool) -> Result<ShoppingList> {
        self.db.set_list_archived(id, archived)
    }

    pub fn set_list_color(&self, id: &str, color: Option<&str>) -> Result<ShoppingList> {
        self.db.set_list_color(id, color)
    }

    pub fn delete_list(&self, id: &str) -> Result<bool> {
        self.db.delete_list(id)
    }

    /// Copy a list with all its items, named "<name> (copy)" unless given.
    pub fn duplicate_list(&self, id: &str, new_name: Option<&str>) -> Result<ShoppingList> {
        let name = match new_name {
            Some(name) => validate_list_name(name)?,
            None => format!("{} (copy)", self.db.get_list(id)?.name),
        };
        self.db.duplicate_list(id, &name)
    }

    // --- Items ---

    pub fn items(&self, list_id: &str) -> Result<Vec<ShoppingItem>> {
        self.db.get_items_for_list(list_id)
    }

    pub fn get_item(&self, id: &str) -> Result<ShoppingItem> {
        self.db.get_item(id)
    }

    pub fn find_item(&self, id: &str) -> Result<Option<ShoppingItem>> {
        self.db.find_item(id)
    }

    pub fn update_item(&self, id: &str, update: &UpdateItem) -> Result<ShoppingItem> {
        let update = UpdateItem {
            name: update.name.as_deref().map(validate_item_name).transpose()?,
            quantity: update.quantity.map(validate_quantity).transpose()?,
            unit: update.unit.clone(),
            notes: update.notes.clone(),
        };
        self.db.update_item(id, &update)
    }

    pub fn set_item_completed(&self, id: &str, completed: bool) -> Result<ShoppingItem> {
        self.db.set_item_completed(id, completed)
    }

    pub fn delete_item(&self, id: &str) -> Result<bool> {
        self.db.delete_item(id)
    }

    pub fn clear_completed(&self, list_id: &str) -> Result<usize> {
        self.db.clear_completed(list_id)
    }

    // --- Categories ---

    pub fn categories(&self) -> Result<Vec<Category>> {
        self.db.get_categories()
    }

    fn require_category(&self, id: &str) -> Result<Category> {
        self.db
            .get_category(id)?
            .with_context(|| format!("Unknown category: {id}"))
    }

    pub fn create_custom_category(&self, name: &str, icon: Option<String>) -> Result<CustomCategory> {
        let name = validate_category_name(name)?;
        self.db.insert_custom_category(&NewCustomCategory { name, icon })
    }

    pub fn delete_custom_category(&self, id: &str) -> Result<bool> {
        self.db.delete_custom_category(id)
    }

    pub fn category_order(&self) -> Result<Vec<String>> {
        self.db.get_category_order()
    }

    /// Store an explicit display order. Every id must name an existing
    /// category and appear once; unlisted categories sort after it.
    pub fn set_category_order(&self, order: &[String]) -> Result<()> {
        let known: HashSet<String> = self.categories()?.into_iter().map(|c| c.id).collect();
        let mut seen = HashSet::new();
        for id in order {
            if !known.contains(id) {
                bail!("Unknown category: {id}");
            }
            if !seen.insert(id.as_str()) {
                bail!("Category listed twice: {id}");
            }
        }
        self.db.set_category_order(order)
    }

    pub fn reset_category_order(&self) -> Result<()> {
        self.db.reset_category_order()
    }

    // --- Products ---

    pub fn products(&self) -> Result<Vec<Product>> {
        self.db.get_all_products()
    }

    pub fn get_product(&self, barcode: &str) -> Result<Option<Product>> {
        self.db.get_product_by_barcode(barcode.trim())
    }

    pub fn delete_product(&self, barcode: &str) -> Result<bool> {
        self.db.delete_product(barcode.trim())
    }

    pub fn clear_products(&self) -> Result<usize> {
        self.db.clear_products()
    }

    // --- Preferences ---

    pub fn preferences(&self) -> Result<Vec<CategoryPreference>> {
        self.db.get_all_preferences()
    }

    pub fn preferred_category(&self, item_name: &str) -> Result<Option<String>> {
        self.db.get_preferred_category(item_name)
    }

    pub fn forget_preference(&self, item_name: &str) -> Result<bool> {
        self.db.remove_preference(item_name)
    }

    // --- Backup, export and sharing ---

    pub fn export_backup(&self) -> Result<BackupSnapshot> {
        backup::export_backup(&self.db)
    }

    pub fn export_backup_json(&self) -> Result<String> {
        backup::export_backup_json(&self.db)
    }

    #[must_use]
    pub fn validate_backup(&self, candidate: &Value) -> ValidationReport {
        backup::validate_backup(candidate)
    }

    pub fn import_backup(
        &self,
        candidate: &Value,
        options: ImportOptions,
    ) -> Result<ImportSummary, BackupError> {
        backup::import_backup(&self.db, candidate, options)
    }

    pub fn import_backup_str(
        &self,
        text: &str,
        options: ImportOptions,
    ) -> Result<ImportSummary, BackupError> {
        backup::import_backup_str(&self.db, text, options)
    }

    pub fn export_list(&self, list_id: &str) -> Result<ListExport> {
        share::export_list(&self.db, list_id)
    }

    pub fn import_list(&self, candidate: &Value) -> Result<ShoppingList, BackupError> {
        share::import_list(&self.db, candidate)
    }

    pub fn share_text(&self, list_id: &str) -> Result<String> {
        let list = self.db.get_list(list_id)?;
        let items = self.db.get_items_for_list(list_id)?;
        let categories = self.db.get_categories()?;
        Ok(share::format_share_text(&list, &items, &categories))
    }
}
