use std::collections::HashMap;

use anyhow::Result;

use crate::models::{Category, CategoryOrigin, OTHER_CATEGORY};

/// Built-in categories: `(id, name, icon, sort_order)`.
pub const BUILTIN_CATEGORIES: &[(&str, &str, &str, i64)] = &[
    ("produce", "Produce", "🥬", 0),
    ("dairy", "Dairy & Eggs", "🥛", 1),
    ("meat", "Meat & Seafood", "🥩", 2),
    ("bakery", "Bakery", "🍞", 3),
    ("frozen", "Frozen", "🧊", 4),
    ("pantry", "Pantry", "🥫", 5),
    ("beverages", "Beverages", "🥤", 6),
    ("snacks", "Snacks", "🍿", 7),
    ("household", "Household", "🧻", 8),
    (OTHER_CATEGORY, "Other", "📦", 9),
];

/// Keyword index used by [`categorize`].
///
/// Matching is a plain substring test against the lowercased item name and
/// the first category in this slice that matches wins, so the order of the
/// entries is significant. "ice cream" appears under both dairy and frozen
/// and resolves to dairy.
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "produce",
        &[
            "apple", "banana", "orange", "lemon", "lime", "grape", "berry", "berries",
            "lettuce", "spinach", "kale", "tomato", "potato", "onion", "garlic", "carrot",
            "celery", "cucumber", "pepper", "broccoli", "cauliflower", "zucchini", "mushroom",
            "avocado", "pear", "peach", "plum", "mango", "pineapple", "melon", "cabbage",
            "eggplant", "cilantro", "parsley", "basil", "ginger", "fruit", "vegetable",
            "salad",
        ],
    ),
    (
        "dairy",
        &[
            "milk", "cheese", "yogurt", "yoghurt", "butter", "cream", "eggs", "ice cream",
            "sour cream", "cottage", "mozzarella", "cheddar", "parmesan", "kefir",
        ],
    ),
    (
        "meat",
        &[
            "chicken", "beef", "pork", "steak", "bacon", "sausage", "turkey", "lamb",
            "salami", "prosciutto", "fish", "salmon", "tuna", "shrimp", "prawn", "mince",
            "meat",
        ],
    ),
    (
        "bakery",
        &[
            "bread", "bagel", "baguette", "croissant", "muffin", "bun", "tortilla", "pita",
            "cake", "donut", "doughnut", "pastry", "loaf",
        ],
    ),
    (
        "frozen",
        &[
            "frozen", "ice cream", "popsicle", "ice pop", "pizza", "fries", "waffle",
            "sorbet", "gelato",
        ],
    ),
    (
        "pantry",
        &[
            "rice", "pasta", "spaghetti", "noodle", "flour", "sugar", "salt", "olive oil",
            "vegetable oil", "cooking oil", "vinegar", "sauce", "cereal", "oats", "bean",
            "lentil", "canned", "soup", "honey", "jam", "peanut butter", "spice", "ketchup",
            "mustard", "mayo",
        ],
    ),
    (
        "beverages",
        &[
            "water", "juice", "soda", "coffee", "tea", "beer", "wine", "cola", "lemonade",
            "kombucha",
        ],
    ),
    (
        "snacks",
        &[
            "chips", "crisps", "cookie", "cracker", "chocolate", "candy", "popcorn",
            "pretzel", "nuts", "granola", "biscuit",
        ],
    ),
    (
        "household",
        &[
            "paper towel", "toilet paper", "tissue", "detergent", "soap", "shampoo",
            "toothpaste", "trash bag", "bin bag", "sponge", "bleach", "cleaner", "foil",
            "napkin", "batteries", "battery",
        ],
    ),
];

/// Resolve an item name to a category id.
///
/// A supplied preference always wins. Otherwise the first keyword-index
/// entry with a substring match is returned, falling back to `"other"`.
#[must_use]
pub fn categorize(item_name: &str, preferred_category: Option<&str>) -> String {
    if let Some(preferred) = preferred_category {
        return preferred.to_string();
    }
    let lower = item_name.to_lowercase();
    if lower.trim().is_empty() {
        return OTHER_CATEGORY.to_string();
    }
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map_or_else(|| OTHER_CATEGORY.to_string(), |(id, _)| (*id).to_string())
}

#[must_use]
pub fn is_builtin_category(id: &str) -> bool {
    BUILTIN_CATEGORIES.iter().any(|(builtin, ..)| *builtin == id)
}

#[must_use]
pub fn builtin_categories() -> Vec<Category> {
    BUILTIN_CATEGORIES
        .iter()
        .map(|(id, name, icon, sort_order)| Category {
            id: (*id).to_string(),
            name: (*name).to_string(),
            icon: (*icon).to_string(),
            sort_order: *sort_order,
            origin: CategoryOrigin::Builtin,
        })
        .collect()
}

/// Sort categories for display.
///
/// With an empty `order` the categories are sorted by `sort_order`. Otherwise
/// ids listed in `order` come first in that order, and everything else follows
/// in its default relative order.
#[must_use]
pub fn sort_categories(mut categories: Vec<Category>, order: &[String]) -> Vec<Category> {
    categories.sort_by_key(|c| c.sort_order);
    if order.is_empty() {
        return categories;
    }
    let mut position: HashMap<&str, usize> = HashMap::with_capacity(order.len());
    for (idx, id) in order.iter().enumerate() {
        position.entry(id.as_str()).or_insert(idx);
    }
    categories.sort_by_key(|c| position.get(c.id.as_str()).copied().unwrap_or(usize::MAX));
    categories
}

/// Store of learned name → category overrides, consulted before keyword matching.
pub trait PreferenceStore {
    fn preferred_category(&self, item_name: &str) -> Result<Option<String>>;
    fn learn_preference(&self, item_name: &str, category_id: &str) -> Result<()>;
    fn forget_preference(&self, item_name: &str) -> Result<bool>;
}

/// Categorize `item_name`, letting a learned preference override the keyword index.
pub fn resolve_category(store: &dyn PreferenceStore, item_name: &str) -> Result<String> {
    let preferred = store.preferred_category(item_name)?;
    Ok(categorize(item_name, preferred.as_deref()))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::models::normalize_name;

    #[derive(Default)]
    struct MemoryStore {
        prefs: RefCell<HashMap<String, String>>,
    }

    impl PreferenceStore for MemoryStore {
        fn preferred_category(&self, item_name: &str) -> Result<Option<String>> {
            Ok(self.prefs.borrow().get(&normalize_name(item_name)).cloned())
        }

        fn learn_preference(&self, item_name: &str, category_id: &str) -> Result<()> {
            self.prefs
                .borrow_mut()
                .insert(normalize_name(item_name), category_id.to_string());
            Ok(())
        }

        fn forget_preference(&self, item_name: &str) -> Result<bool> {
            Ok(self.prefs.borrow_mut().remove(&normalize_name(item_name)).is_some())
        }
    }

    fn ids(categories: &[Category]) -> Vec<&str> {
        categories.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_categorize_keywords() {
        assert_eq!(categorize("Milk", None), "dairy");
        assert_eq!(categorize("bread", None), "bakery");
        assert_eq!(categorize("Apples", None), "produce");
        assert_eq!(categorize("chicken thighs", None), "meat");
        assert_eq!(categorize("Toilet Paper", None), "household");
    }

    #[test]
    fn test_categorize_case_insensitive() {
        assert_eq!(categorize("milk", None), categorize("MILK", None));
        assert_eq!(categorize("MiLk", None), "dairy");
    }

    #[test]
    fn test_categorize_substring_match() {
        assert_eq!(categorize("Low-fat milk", None), "dairy");
    }

    #[test]
    fn test_categorize_unknown_and_empty() {
        assert_eq!(categorize("Unknown Item XYZ", None), "other");
        assert_eq!(categorize("", None), "other");
        assert_eq!(categorize("   ", None), "other");
        assert_eq!(categorize("123 !!", None), "other");
    }

    #[test]
    fn test_categorize_preference_wins() {
        assert_eq!(categorize("Eggs", None), "dairy");
        assert_eq!(categorize("Eggs", Some("bakery")), "bakery");
        assert_eq!(categorize("Unknown Item XYZ", Some("snacks")), "snacks");
    }

    #[test]
    fn test_categorize_index_order_breaks_ties() {
        // dairy is listed before frozen
        assert_eq!(categorize("Vanilla Ice Cream", None), "dairy");
        assert_eq!(categorize("frozen yogurt", None), "dairy");
        assert_eq!(categorize("frozen peas", None), "frozen");
    }

    #[test]
    fn test_keyword_index_only_names_builtin_categories() {
        for (id, keywords) in CATEGORY_KEYWORDS {
            assert!(is_builtin_category(id), "{id} is not a built-in category");
            assert!(keywords.iter().all(|k| *k == k.to_lowercase()));
        }
    }

    #[test]
    fn test_builtin_categories() {
        let cats = builtin_categories();
        assert_eq!(cats.len(), 10);
        assert!(cats.iter().all(|c| c.origin == CategoryOrigin::Builtin));
        assert!(is_builtin_category("other"));
        assert!(!is_builtin_category("custom-abc"));
    }

    #[test]
    fn test_sort_categories_default_order() {
        let mut cats = builtin_categories();
        cats.reverse();
        let sorted = sort_categories(cats, &[]);
        assert_eq!(sorted[0].id, "produce");
        assert_eq!(sorted[9].id, "other");
    }

    #[test]
    fn test_sort_categories_explicit_order_first() {
        let order = vec!["snacks".to_string(), "dairy".to_string()];
        let sorted = sort_categories(builtin_categories(), &order);
        assert_eq!(
            ids(&sorted),
            vec![
                "snacks", "dairy", "produce", "meat", "bakery", "frozen", "pantry",
                "beverages", "household", "other"
            ]
        );
    }

    #[test]
    fn test_sort_categories_ignores_unknown_ids() {
        let order = vec!["nope".to_string(), "other".to_string()];
        let sorted = sort_categories(builtin_categories(), &order);
        assert_eq!(sorted[0].id, "other");
        assert_eq!(sorted[1].id, "produce");
        assert_eq!(sorted.len(), 10);
    }

    #[test]
    fn test_resolve_category_uses_store() {
        let store = MemoryStore::default();
        assert_eq!(resolve_category(&store, "Eggs").unwrap(), "dairy");

        store.learn_preference("  EGGS ", "bakery").unwrap();
        assert_eq!(resolve_category(&store, "eggs").unwrap(), "bakery");

        assert!(store.forget_preference("Eggs").unwrap());
        assert_eq!(resolve_category(&store, "Eggs").unwrap(), "dairy");
    }
}
