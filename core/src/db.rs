use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::categories::{
    BUILTIN_CATEGORIES, PreferenceStore, builtin_categories, is_builtin_category,
    sort_categories,
};
use crate::models::{
    Category, CategoryPreference, CustomCategory, NewCustomCategory, NewItem, NewList,
    NewProduct, OTHER_CATEGORY, Product, ShoppingItem, ShoppingList, UpdateItem, normalize_name,
    now_millis,
};

const CATEGORY_ORDER_KEY: &str = "category_order";

const LIST_COLUMNS: &str = "id, name, created_at, updated_at, archived, color";
const ITEM_COLUMNS: &str = "id, list_id, name, quantity, unit, category, completed, added_at, completed_at, barcode, notes";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS lists (
                    id TEXT PRIMARY KEY NOT NULL,
                    name TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    archived INTEGER NOT NULL DEFAULT 0,
                    color TEXT
                );

                CREATE TABLE IF NOT EXISTS items (
                    id TEXT PRIMARY KEY NOT NULL,
                    list_id TEXT NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    name_key TEXT NOT NULL,
                    quantity REAL NOT NULL DEFAULT 1,
                    unit TEXT,
                    category TEXT NOT NULL,
                    completed INTEGER NOT NULL DEFAULT 0,
                    added_at INTEGER NOT NULL,
                    completed_at INTEGER,
                    barcode TEXT,
                    notes TEXT
                );

                CREATE TABLE IF NOT EXISTS custom_categories (
                    id TEXT PRIMARY KEY NOT NULL,
                    name TEXT NOT NULL,
                    icon TEXT,
                    sort_order INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS products (
                    barcode TEXT PRIMARY KEY NOT NULL,
                    name TEXT NOT NULL,
                    category TEXT NOT NULL,
                    last_used INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS category_preferences (
                    name_key TEXT PRIMARY KEY NOT NULL,
                    category TEXT NOT NULL,
                    learned_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS settings (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_items_list ON items(list_id);
                CREATE INDEX IF NOT EXISTS idx_items_name_key ON items(name_key);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    /// Begin a transaction on the shared connection. Helpers called while it
    /// is open run inside it; dropping it without `commit` rolls back.
    pub(crate) fn transaction(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    // --- Row mapping helpers ---

    fn list_from_row(row: &rusqlite::Row) -> rusqlite::Result<ShoppingList> {
        Ok(ShoppingList {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
            archived: row.get(4)?,
            color: row.get(5)?,
        })
    }

    fn item_from_row(row: &rusqlite::Row) -> rusqlite::Result<ShoppingItem> {
        Ok(ShoppingItem {
            id: row.get(0)?,
            list_id: row.get(1)?,
            name: row.get(2)?,
            quantity: row.get(3)?,
            unit: row.get(4)?,
            category: row.get(5)?,
            completed: row.get(6)?,
            added_at: row.get(7)?,
            completed_at: row.get(8)?,
            barcode: row.get(9)?,
            notes: row.get(10)?,
        })
    }

    fn product_from_row(row: &rusqlite::Row) -> rusqlite::Result<Product> {
        Ok(Product {
            barcode: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            last_used: row.get(3)?,
        })
    }

    fn custom_category_from_row(row: &rusqlite::Row) -> rusqlite::Result<CustomCategory> {
        Ok(CustomCategory {
            id: row.get(0)?,
            name: row.get(1)?,
            icon: row.get(2)?,
            sort_order: row.get(3)?,
        })
    }

    // --- Lists ---

    pub fn insert_list(&self, list: &NewList) -> Result<ShoppingList> {
        let now = now_millis();
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO lists (id, name, created_at, updated_at, archived, color)
             VALUES (?1, ?2, ?3, ?3, 0, ?4)",
            params![id, list.name, now, list.color],
        )?;
        debug!(list_id = %id, name = %list.name, "created list");
        self.get_list(&id)
    }

    pub fn get_list(&self, id: &str) -> Result<ShoppingList> {
        self.conn
            .query_row(
                &format!("SELECT {LIST_COLUMNS} FROM lists WHERE id = ?1"),
                params![id],
                Self::list_from_row,
            )
            .with_context(|| format!("List not found: {id}"))
    }

    /// Look a list up by id, falling back to a case-insensitive name match.
    pub fn find_list(&self, id_or_name: &str) -> Result<Option<ShoppingList>> {
        let by_id = self
            .conn
            .query_row(
                &format!("SELECT {LIST_COLUMNS} FROM lists WHERE id = ?1"),
                params![id_or_name],
                Self::list_from_row,
            )
            .optional()?;
        if by_id.is_some() {
            return Ok(by_id);
        }
        self.find_list_by_name(id_or_name)
    }

    /// Case-insensitive name match, oldest list first.
    pub fn find_list_by_name(&self, name: &str) -> Result<Option<ShoppingList>> {
        let wanted = normalize_name(name);
        Ok(self
            .get_all_lists(true)?
            .into_iter()
            .find(|l| normalize_name(&l.name) == wanted))
    }

    pub fn get_all_lists(&self, include_archived: bool) -> Result<Vec<ShoppingList>> {
        let sql = if include_archived {
            format!("SELECT {LIST_COLUMNS} FROM lists ORDER BY created_at, rowid")
        } else {
            format!("SELECT {LIST_COLUMNS} FROM lists WHERE archived = 0 ORDER BY created_at, rowid")
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let lists = stmt
            .query_map([], Self::list_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lists)
    }

    pub fn rename_list(&self, id: &str, name: &str) -> Result<ShoppingList> {
        self.update_list_column(id, "name", &name)
    }

    pub fn set_list_archived(&self, id: &str, archived: bool) -> Result<ShoppingList> {
        self.update_list_column(id, "archived", &archived)
    }

    pub fn set_list_color(&self, id: &str, color: Option<&str>) -> Result<ShoppingList> {
        self.update_list_column(id, "color", &color)
    }

    fn update_list_column(
        &self,
        id: &str,
        column: &str,
        value: &dyn rusqlite::ToSql,
    ) -> Result<ShoppingList> {
        let rows = self.conn.execute(
            &format!("UPDATE lists SET {column} = ?1, updated_at = ?2 WHERE id = ?3"),
            params![value, now_millis(), id],
        )?;
        if rows == 0 {
            bail!("List not found: {id}");
        }
        self.get_list(id)
    }

    fn touch_list(&self, id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE lists SET updated_at = ?1 WHERE id = ?2",
            params![now_millis(), id],
        )?;
        Ok(())
    }

    /// Delete a list and all of its items.
    pub fn delete_list(&self, id: &str) -> Result<bool> {
        let tx = self.transaction()?;
        let items = self
            .conn
            .execute("DELETE FROM items WHERE list_id = ?1", params![id])?;
        let rows = self
            .conn
            .execute("DELETE FROM lists WHERE id = ?1", params![id])?;
        tx.commit()?;
        if rows > 0 {
            debug!(list_id = %id, items, "deleted list");
        }
        Ok(rows > 0)
    }

    pub(crate) fn delete_all_lists(&self) -> Result<usize> {
        self.conn.execute("DELETE FROM items", [])?;
        Ok(self.conn.execute("DELETE FROM lists", [])?)
    }

    /// Copy a list and its items under a new name. Copied items start uncompleted.
    pub fn duplicate_list(&self, id: &str, new_name: &str) -> Result<ShoppingList> {
        let tx = self.transaction()?;
        let source = self.get_list(id)?;
        let copy = self.insert_list(&NewList {
            name: new_name.to_string(),
            color: source.color.clone(),
        })?;
        for item in self.get_items_for_list(id)? {
            self.insert_item(&NewItem {
                list_id: copy.id.clone(),
                name: item.name,
                quantity: item.quantity,
                unit: item.unit,
                category: item.category,
                barcode: item.barcode,
                notes: item.notes,
            })?;
        }
        tx.commit()?;
        Ok(copy)
    }

    // --- Items ---

    pub fn insert_item(&self, item: &NewItem) -> Result<ShoppingItem> {
        self.get_list(&item.list_id)?;
        let now = now_millis();
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO items (id, list_id, name, name_key, quantity, unit, category, completed, added_at, barcode, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?10)",
            params![
                id,
                item.list_id,
                item.name,
                normalize_name(&item.name),
                item.quantity,
                item.unit,
                item.category,
                now,
                item.barcode,
                item.notes,
            ],
        )?;
        self.touch_list(&item.list_id)?;
        debug!(item_id = %id, name = %item.name, category = %item.category, "added item");
        self.get_item(&id)
    }

    pub fn get_item(&self, id: &str) -> Result<ShoppingItem> {
        self.conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
                params![id],
                Self::item_from_row,
            )
            .with_context(|| format!("Item not found: {id}"))
    }

    pub fn find_item(&self, id: &str) -> Result<Option<ShoppingItem>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
                params![id],
                Self::item_from_row,
            )
            .optional()?)
    }

    pub fn get_items_for_list(&self, list_id: &str) -> Result<Vec<ShoppingItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE list_id = ?1 ORDER BY added_at, rowid"
        ))?;
        let items = stmt
            .query_map(params![list_id], Self::item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn get_items_by_name(&self, name: &str) -> Result<Vec<ShoppingItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE name_key = ?1 ORDER BY added_at, rowid"
        ))?;
        let items = stmt
            .query_map(params![normalize_name(name)], Self::item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn update_item(&self, id: &str, update: &UpdateItem) -> Result<ShoppingItem> {
        let existing = self.get_item(id)?;

        if let Some(ref name) = update.name {
            self.conn.execute(
                "UPDATE items SET name = ?1, name_key = ?2 WHERE id = ?3",
                params![name, normalize_name(name), id],
            )?;
        }
        if let Some(quantity) = update.quantity {
            self.conn.execute(
                "UPDATE items SET quantity = ?1 WHERE id = ?2",
                params![quantity, id],
            )?;
        }
        if let Some(ref unit) = update.unit {
            self.conn.execute(
                "UPDATE items SET unit = ?1 WHERE id = ?2",
                params![unit, id],
            )?;
        }
        if let Some(ref notes) = update.notes {
            self.conn.execute(
                "UPDATE items SET notes = ?1 WHERE id = ?2",
                params![notes, id],
            )?;
        }

        self.touch_list(&existing.list_id)?;
        self.get_item(id)
    }

    pub fn set_item_completed(&self, id: &str, completed: bool) -> Result<ShoppingItem> {
        self.set_item_completed_at(id, completed.then(now_millis))
    }

    /// Set `completed_at`; `completed` follows from whether it is present.
    pub fn set_item_completed_at(&self, id: &str, completed_at: Option<i64>) -> Result<ShoppingItem> {
        let existing = self.get_item(id)?;
        self.conn.execute(
            "UPDATE items SET completed = ?1, completed_at = ?2 WHERE id = ?3",
            params![completed_at.is_some(), completed_at, id],
        )?;
        self.touch_list(&existing.list_id)?;
        self.get_item(id)
    }

    pub fn delete_item(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Remove every completed item from a list.
    pub fn clear_completed(&self, list_id: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM items WHERE list_id = ?1 AND completed = 1",
            params![list_id],
        )?;
        if rows > 0 {
            self.touch_list(list_id)?;
        }
        Ok(rows)
    }

    /// Set the category of every item, in every list, whose normalized name matches.
    pub fn update_category_for_name(&self, name: &str, category: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE items SET category = ?1 WHERE name_key = ?2",
            params![category, normalize_name(name)],
        )?;
        Ok(rows)
    }

    /// Learn a preference and apply it to every matching item in one transaction.
    pub fn apply_category_preference(&self, name: &str, category: &str) -> Result<usize> {
        let tx = self.transaction()?;
        self.save_preference(name, category)?;
        let updated = self.update_category_for_name(name, category)?;
        tx.commit()?;
        info!(name = %normalize_name(name), category, updated, "applied category preference");
        Ok(updated)
    }

    // --- Categories ---

    pub fn get_custom_categories(&self) -> Result<Vec<CustomCategory>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, icon, sort_order FROM custom_categories ORDER BY sort_order, rowid",
        )?;
        let categories = stmt
            .query_map([], Self::custom_category_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Built-in and custom categories, sorted by the stored display order.
    pub fn get_categories(&self) -> Result<Vec<Category>> {
        let mut all = builtin_categories();
        all.extend(self.get_custom_categories()?.into_iter().map(Category::from));
        let order = self.get_category_order()?;
        Ok(sort_categories(all, &order))
    }

    pub fn get_category(&self, id: &str) -> Result<Option<Category>> {
        Ok(self.get_categories()?.into_iter().find(|c| c.id == id))
    }

    pub fn insert_custom_category(&self, category: &NewCustomCategory) -> Result<CustomCategory> {
        let builtin_max = BUILTIN_CATEGORIES
            .iter()
            .map(|(.., sort_order)| *sort_order)
            .max()
            .unwrap_or(0);
        let custom_max: Option<i64> = self.conn.query_row(
            "SELECT MAX(sort_order) FROM custom_categories",
            [],
            |row| row.get(0),
        )?;
        let created = CustomCategory {
            id: format!("custom-{}", Uuid::new_v4().simple()),
            name: category.name.clone(),
            icon: category.icon.clone(),
            sort_order: custom_max.unwrap_or(builtin_max).max(builtin_max) + 1,
        };
        self.upsert_custom_category(&created)?;
        Ok(created)
    }

    /// Insert or overwrite a custom category, keeping its id.
    pub fn upsert_custom_category(&self, category: &CustomCategory) -> Result<()> {
        if is_builtin_category(&category.id) {
            bail!(
                "Custom category id '{}' collides with a built-in category",
                category.id
            );
        }
        self.conn.execute(
            "INSERT INTO custom_categories (id, name, icon, sort_order) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, icon = excluded.icon, sort_order = excluded.sort_order",
            params![category.id, category.name, category.icon, category.sort_order],
        )?;
        Ok(())
    }

    /// Delete a custom category. Its items move to "other", preferences that
    /// pointed at it are dropped and it is removed from the display order.
    pub fn delete_custom_category(&self, id: &str) -> Result<bool> {
        if is_builtin_category(id) {
            bail!("Built-in category '{id}' cannot be deleted");
        }
        let tx = self.transaction()?;
        let moved = self.conn.execute(
            "UPDATE items SET category = ?1 WHERE category = ?2",
            params![OTHER_CATEGORY, id],
        )?;
        self.conn.execute(
            "DELETE FROM category_preferences WHERE category = ?1",
            params![id],
        )?;
        self.conn.execute(
            "UPDATE products SET category = ?1 WHERE category = ?2",
            params![OTHER_CATEGORY, id],
        )?;
        let rows = self
            .conn
            .execute("DELETE FROM custom_categories WHERE id = ?1", params![id])?;
        let order = self.get_category_order()?;
        if order.iter().any(|o| o == id) {
            let kept: Vec<String> = order.into_iter().filter(|o| o != id).collect();
            self.set_category_order(&kept)?;
        }
        tx.commit()?;
        if rows > 0 {
            debug!(category = %id, moved, "deleted custom category");
        }
        Ok(rows > 0)
    }

    pub(crate) fn delete_all_custom_categories(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM custom_categories", [])?)
    }

    /// Ids of every built-in and custom category.
    pub fn category_ids(&self) -> Result<HashSet<String>> {
        Ok(self.get_categories()?.into_iter().map(|c| c.id).collect())
    }

    /// Drop preferences that point at a category which no longer exists.
    pub(crate) fn prune_orphaned_preferences(&self) -> Result<usize> {
        let known = self.category_ids()?;
        let mut removed = 0;
        for pref in self.get_all_preferences()? {
            if !known.contains(&pref.category) {
                removed += self.conn.execute(
                    "DELETE FROM category_preferences WHERE name_key = ?1",
                    params![pref.name],
                )?;
            }
        }
        if removed > 0 {
            debug!(removed, "pruned preferences for missing categories");
        }
        Ok(removed)
    }

    /// The explicit display order, or an empty list for the default order.
    pub fn get_category_order(&self) -> Result<Vec<String>> {
        match self.get_setting(CATEGORY_ORDER_KEY)? {
            Some(raw) => serde_json::from_str(&raw).context("Stored category order is corrupt"),
            None => Ok(Vec::new()),
        }
    }

    pub fn set_category_order(&self, order: &[String]) -> Result<()> {
        if order.is_empty() {
            self.delete_setting(CATEGORY_ORDER_KEY)?;
            return Ok(());
        }
        self.set_setting(CATEGORY_ORDER_KEY, &serde_json::to_string(order)?)
    }

    pub fn reset_category_order(&self) -> Result<()> {
        self.delete_setting(CATEGORY_ORDER_KEY)?;
        Ok(())
    }

    // --- Products ---

    pub fn get_product_by_barcode(&self, barcode: &str) -> Result<Option<Product>> {
        let product = self
            .conn
            .query_row(
                "SELECT barcode, name, category, last_used FROM products WHERE barcode = ?1",
                params![barcode],
                Self::product_from_row,
            )
            .optional()?;
        Ok(product)
    }

    /// Insert or overwrite a product by barcode and refresh `last_used`.
    pub fn save_product(&self, product: &NewProduct) -> Result<Product> {
        self.restore_product(&Product {
            barcode: product.barcode.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            last_used: now_millis(),
        })?;
        self.get_product_by_barcode(&product.barcode)?
            .with_context(|| format!("Product not found after save: {}", product.barcode))
    }

    /// Upsert a product keeping the supplied `last_used`.
    pub fn restore_product(&self, product: &Product) -> Result<()> {
        self.conn.execute(
            "INSERT INTO products (barcode, name, category, last_used) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(barcode) DO UPDATE SET name = excluded.name, category = excluded.category, last_used = excluded.last_used",
            params![product.barcode, product.name, product.category, product.last_used],
        )?;
        Ok(())
    }

    pub fn update_product_last_used(&self, barcode: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE products SET last_used = ?1 WHERE barcode = ?2",
            params![now_millis(), barcode],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_product(&self, barcode: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM products WHERE barcode = ?1", params![barcode])?;
        Ok(rows > 0)
    }

    pub fn clear_products(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM products", [])?)
    }

    /// All cached products, most recently used first.
    pub fn get_all_products(&self) -> Result<Vec<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT barcode, name, category, last_used FROM products ORDER BY last_used DESC, barcode",
        )?;
        let products = stmt
            .query_map([], Self::product_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }

    // --- Preferences ---

    pub fn get_preferred_category(&self, item_name: &str) -> Result<Option<String>> {
        let category = self
            .conn
            .query_row(
                "SELECT category FROM category_preferences WHERE name_key = ?1",
                params![normalize_name(item_name)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(category)
    }

    pub fn save_preference(&self, item_name: &str, category: &str) -> Result<()> {
        let key = normalize_name(item_name);
        if key.is_empty() {
            bail!("Cannot learn a category for an empty item name");
        }
        self.conn.execute(
            "INSERT INTO category_preferences (name_key, category, learned_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name_key) DO UPDATE SET category = excluded.category, learned_at = excluded.learned_at",
            params![key, category, now_millis()],
        )?;
        Ok(())
    }

    pub fn remove_preference(&self, item_name: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM category_preferences WHERE name_key = ?1",
            params![normalize_name(item_name)],
        )?;
        Ok(rows > 0)
    }

    pub fn get_all_preferences(&self) -> Result<Vec<CategoryPreference>> {
        let mut stmt = self.conn.prepare(
            "SELECT name_key, category, learned_at FROM category_preferences ORDER BY name_key",
        )?;
        let prefs = stmt
            .query_map([], |row| {
                Ok(CategoryPreference {
                    name: row.get(0)?,
                    category: row.get(1)?,
                    learned_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prefs)
    }

    // --- Settings ---

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn delete_setting(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }
}

impl PreferenceStore for Database {
    fn preferred_category(&self, item_name: &str) -> Result<Option<String>> {
        self.get_preferred_category(item_name)
    }

    fn learn_preference(&self, item_name: &str, category_id: &str) -> Result<()> {
        self.save_preference(item_name, category_id)
    }

    fn forget_preference(&self, item_name: &str) -> Result<bool> {
        self.remove_preference(item_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryOrigin;

    fn sample_list(db: &Database, name: &str) -> ShoppingList {
        db.insert_list(&NewList {
            name: name.to_string(),
            color: None,
        })
        .unwrap()
    }

    fn add(db: &Database, list: &ShoppingList, name: &str, category: &str) -> ShoppingItem {
        db.insert_item(&NewItem::named(&list.id, name, category))
            .unwrap()
    }

    #[test]
    fn test_insert_and_get_list() {
        let db = Database::open_in_memory().unwrap();
        let list = db
            .insert_list(&NewList {
                name: "Groceries".to_string(),
                color: Some("#22aa44".to_string()),
            })
            .unwrap();

        assert_eq!(list.name, "Groceries");
        assert!(!list.archived);
        assert_eq!(list.color.as_deref(), Some("#22aa44"));
        assert_eq!(list.created_at, list.updated_at);

        let fetched = db.get_list(&list.id).unwrap();
        assert_eq!(fetched, list);
    }

    #[test]
    fn test_get_list_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_list("missing").is_err());
    }

    #[test]
    fn test_find_list_by_id_or_name() {
        let db = Database::open_in_memory().unwrap();
        let list = sample_list(&db, "Weekly Shop");

        assert_eq!(db.find_list(&list.id).unwrap().unwrap().id, list.id);
        assert_eq!(db.find_list("weekly shop").unwrap().unwrap().id, list.id);
        assert!(db.find_list("monthly").unwrap().is_none());
    }

    #[test]
    fn test_archived_lists_hidden_by_default() {
        let db = Database::open_in_memory().unwrap();
        let a = sample_list(&db, "A");
        sample_list(&db, "B");
        db.set_list_archived(&a.id, true).unwrap();

        assert_eq!(db.get_all_lists(false).unwrap().len(), 1);
        assert_eq!(db.get_all_lists(true).unwrap().len(), 2);
    }

    #[test]
    fn test_rename_and_recolor_list() {
        let db = Database::open_in_memory().unwrap();
        let list = sample_list(&db, "Old");
        let renamed = db.rename_list(&list.id, "New").unwrap();
        assert_eq!(renamed.name, "New");

        let colored = db.set_list_color(&list.id, Some("#fff000")).unwrap();
        assert_eq!(colored.color.as_deref(), Some("#fff000"));
        let cleared = db.set_list_color(&list.id, None).unwrap();
        assert!(cleared.color.is_none());

        assert!(db.rename_list("missing", "x").is_err());
    }

    #[test]
    fn test_delete_list_cascades_to_items() {
        let db = Database::open_in_memory().unwrap();
        let list = sample_list(&db, "Groceries");
        let other = sample_list(&db, "Hardware");
        let item = add(&db, &list, "Milk", "dairy");
        add(&db, &other, "Nails", "other");

        assert!(db.delete_list(&list.id).unwrap());
        assert!(db.get_item(&item.id).is_err());
        assert_eq!(db.get_items_for_list(&other.id).unwrap().len(), 1);
        assert!(!db.delete_list(&list.id).unwrap());
    }

    #[test]
    fn test_duplicate_list_resets_completion() {
        let db = Database::open_in_memory().unwrap();
        let list = sample_list(&db, "Groceries");
        let milk = add(&db, &list, "Milk", "dairy");
        add(&db, &list, "Bread", "bakery");
        db.set_item_completed(&milk.id, true).unwrap();

        let copy = db.duplicate_list(&list.id, "Groceries (copy)").unwrap();
        let items = db.get_items_for_list(&copy.id).unwrap();
        assert_eq!(copy.name, "Groceries (copy)");
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| !i.completed && i.completed_at.is_none()));
        assert_eq!(items[0].category, "dairy");

        assert!(db.duplicate_list("missing", "x").is_err());
        assert_eq!(db.get_all_lists(true).unwrap().len(), 2);
    }

    #[test]
    fn test_insert_item_defaults() {
        let db = Database::open_in_memory().unwrap();
        let list = sample_list(&db, "Groceries");
        let item = add(&db, &list, "Milk", "dairy");

        assert_eq!(item.list_id, list.id);
        assert!((item.quantity - 1.0).abs() < f64::EPSILON);
        assert!(!item.completed);
        assert!(item.completed_at.is_none());
    }

    #[test]
    fn test_find_item_miss_is_none() {
        let db = Database::open_in_memory().unwrap();
        let list = sample_list(&db, "Groceries");
        let item = add(&db, &list, "Milk", "dairy");

        assert_eq!(db.find_item(&item.id).unwrap().unwrap().name, "Milk");
        assert!(db.find_item("no-such-item").unwrap().is_none());
        assert!(db.get_item("no-such-item").is_err());
    }

    #[test]
    fn test_insert_item_requires_list() {
        let db = Database::open_in_memory().unwrap();
        assert!(
            db.insert_item(&NewItem::named("missing", "Milk", "dairy"))
                .is_err()
        );
    }

    #[test]
    fn test_completed_at_tracks_completed() {
        let db = Database::open_in_memory().unwrap();
        let list = sample_list(&db, "Groceries");
        let item = add(&db, &list, "Milk", "dairy");

        let done = db.set_item_completed(&item.id, true).unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());

        let undone = db.set_item_completed(&item.id, false).unwrap();
        assert!(!undone.completed);
        assert!(undone.completed_at.is_none());

        let restored = db.set_item_completed_at(&item.id, Some(42)).unwrap();
        assert!(restored.completed);
        assert_eq!(restored.completed_at, Some(42));
    }

    #[test]
    fn test_update_item_partial() {
        let db = Database::open_in_memory().unwrap();
        let list = sample_list(&db, "Groceries");
        let item = add(&db, &list, "Milk", "dairy");

        let updated = db
            .update_item(
                &item.id,
                &UpdateItem {
                    quantity: Some(2.0),
                    unit: Some(Some("L".to_string())),
                    ..UpdateItem::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Milk");
        assert!((updated.quantity - 2.0).abs() < f64::EPSILON);
        assert_eq!(updated.unit.as_deref(), Some("L"));

        let renamed = db
            .update_item(
                &item.id,
                &UpdateItem {
                    name: Some("Oat Milk".to_string()),
                    unit: Some(None),
                    ..UpdateItem::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "Oat Milk");
        assert!(renamed.unit.is_none());
        assert_eq!(db.get_items_by_name("oat milk").unwrap().len(), 1);
        assert!(db.get_items_by_name("milk").unwrap().is_empty());
    }

    #[test]
    fn test_clear_completed() {
        let db = Database::open_in_memory().unwrap();
        let list = sample_list(&db, "Groceries");
        let milk = add(&db, &list, "Milk", "dairy");
        add(&db, &list, "Bread", "bakery");
        db.set_item_completed(&milk.id, true).unwrap();

        assert_eq!(db.clear_completed(&list.id).unwrap(), 1);
        let items = db.get_items_for_list(&list.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Bread");
    }

    #[test]
    fn test_update_category_for_name_spans_lists() {
        let db = Database::open_in_memory().unwrap();
        let a = sample_list(&db, "A");
        let b = sample_list(&db, "B");
        let milk_a = add(&db, &a, "Milk", "dairy");
        let milk_b = add(&db, &b, "  MILK ", "dairy");
        let bread = add(&db, &b, "Bread", "bakery");

        assert_eq!(db.update_category_for_name("milk", "beverages").unwrap(), 2);
        assert_eq!(db.get_item(&milk_a.id).unwrap().category, "beverages");
        assert_eq!(db.get_item(&milk_b.id).unwrap().category, "beverages");
        assert_eq!(db.get_item(&bread.id).unwrap().category, "bakery");
    }

    #[test]
    fn test_apply_category_preference() {
        let db = Database::open_in_memory().unwrap();
        let a = sample_list(&db, "A");
        let b = sample_list(&db, "B");
        add(&db, &a, "Eggs", "dairy");
        add(&db, &b, "eggs", "dairy");

        assert_eq!(db.apply_category_preference("EGGS", "bakery").unwrap(), 2);
        assert_eq!(
            db.get_preferred_category("Eggs").unwrap().as_deref(),
            Some("bakery")
        );
        assert!(
            db.get_items_by_name("eggs")
                .unwrap()
                .iter()
                .all(|i| i.category == "bakery")
        );
    }

    #[test]
    fn test_preferences_are_normalized_upserts() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_preferred_category("milk").unwrap().is_none());

        db.save_preference("  Milk ", "dairy").unwrap();
        db.save_preference("MILK", "beverages").unwrap();

        let prefs = db.get_all_preferences().unwrap();
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs[0].name, "milk");
        assert_eq!(prefs[0].category, "beverages");

        assert!(db.remove_preference("milk").unwrap());
        assert!(!db.remove_preference("milk").unwrap());
        assert!(db.save_preference("   ", "dairy").is_err());
    }

    #[test]
    fn test_save_product_upserts_by_barcode() {
        let db = Database::open_in_memory().unwrap();
        db.save_product(&NewProduct {
            barcode: "X".to_string(),
            name: "Milk".to_string(),
            category: "dairy".to_string(),
        })
        .unwrap();
        let second = db
            .save_product(&NewProduct {
                barcode: "X".to_string(),
                name: "Y".to_string(),
                category: "beverages".to_string(),
            })
            .unwrap();

        let all = db.get_all_products().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Y");
        assert_eq!(all[0].category, "beverages");
        assert_eq!(second.barcode, "X");
    }

    #[test]
    fn test_product_lookup_miss_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_product_by_barcode("000").unwrap().is_none());
        assert!(!db.update_product_last_used("000").unwrap());
        assert!(!db.delete_product("000").unwrap());
    }

    #[test]
    fn test_product_last_used_delete_and_clear() {
        let db = Database::open_in_memory().unwrap();
        db.restore_product(&Product {
            barcode: "1".to_string(),
            name: "Old".to_string(),
            category: "other".to_string(),
            last_used: 5,
        })
        .unwrap();
        db.restore_product(&Product {
            barcode: "2".to_string(),
            name: "Other".to_string(),
            category: "other".to_string(),
            last_used: 6,
        })
        .unwrap();

        assert_eq!(db.get_all_products().unwrap()[0].barcode, "2");
        assert!(db.update_product_last_used("1").unwrap());
        assert!(db.get_product_by_barcode("1").unwrap().unwrap().last_used > 5);
        assert_eq!(db.get_all_products().unwrap()[0].barcode, "1");

        assert!(db.delete_product("1").unwrap());
        assert_eq!(db.clear_products().unwrap(), 1);
        assert!(db.get_all_products().unwrap().is_empty());
    }

    #[test]
    fn test_categories_merge_builtin_and_custom() {
        let db = Database::open_in_memory().unwrap();
        let custom = db
            .insert_custom_category(&NewCustomCategory {
                name: "Baby".to_string(),
                icon: Some("🍼".to_string()),
            })
            .unwrap();
        assert!(custom.id.starts_with("custom-"));
        assert_eq!(custom.sort_order, 10);

        let second = db
            .insert_custom_category(&NewCustomCategory {
                name: "Pets".to_string(),
                icon: None,
            })
            .unwrap();
        assert_eq!(second.sort_order, 11);

        let all = db.get_categories().unwrap();
        assert_eq!(all.len(), 12);
        assert_eq!(all[10].id, custom.id);
        assert_eq!(all[10].origin, CategoryOrigin::Custom);
        assert!(db.get_category(&second.id).unwrap().is_some());
    }

    #[test]
    fn test_custom_category_cannot_shadow_builtin() {
        let db = Database::open_in_memory().unwrap();
        let clash = CustomCategory {
            id: "dairy".to_string(),
            name: "Dairy 2".to_string(),
            icon: None,
            sort_order: 20,
        };
        assert!(db.upsert_custom_category(&clash).is_err());
        assert!(db.delete_custom_category("dairy").is_err());
    }

    #[test]
    fn test_delete_custom_category_moves_items_to_other() {
        let db = Database::open_in_memory().unwrap();
        let list = sample_list(&db, "Groceries");
        let custom = db
            .insert_custom_category(&NewCustomCategory {
                name: "Baby".to_string(),
                icon: None,
            })
            .unwrap();
        let item = add(&db, &list, "Diapers", &custom.id);
        db.save_preference("diapers", &custom.id).unwrap();
        db.set_category_order(&[custom.id.clone(), "dairy".to_string()])
            .unwrap();

        assert!(db.delete_custom_category(&custom.id).unwrap());
        assert_eq!(db.get_item(&item.id).unwrap().category, "other");
        assert!(db.get_preferred_category("diapers").unwrap().is_none());
        assert_eq!(db.get_category_order().unwrap(), vec!["dairy".to_string()]);
        assert_eq!(db.get_categories().unwrap().len(), 10);
    }

    #[test]
    fn test_category_order_roundtrip_and_reset() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_category_order().unwrap().is_empty());

        let order = vec!["household".to_string(), "produce".to_string()];
        db.set_category_order(&order).unwrap();
        assert_eq!(db.get_category_order().unwrap(), order);

        let cats = db.get_categories().unwrap();
        assert_eq!(cats[0].id, "household");
        assert_eq!(cats[1].id, "produce");
        assert_eq!(cats[2].id, "dairy");

        db.reset_category_order().unwrap();
        assert_eq!(db.get_categories().unwrap()[0].id, "produce");
    }

    #[test]
    fn test_transaction_rolls_back_on_drop() {
        let db = Database::open_in_memory().unwrap();
        {
            let _tx = db.transaction().unwrap();
            sample_list(&db, "Temporary");
        }
        assert!(db.get_all_lists(true).unwrap().is_empty());
    }

    #[test]
    fn test_preference_store_impl() {
        let db = Database::open_in_memory().unwrap();
        let store: &dyn PreferenceStore = &db;
        store.learn_preference("Tofu", "meat").unwrap();
        assert_eq!(
            store.preferred_category("tofu").unwrap().as_deref(),
            Some("meat")
        );
        assert!(store.forget_preference("TOFU").unwrap());
    }
}
