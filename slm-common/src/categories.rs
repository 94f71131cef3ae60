//! Fixed product category ordering
//!
//! The table order is the aisle order used for shopping list placement. It is
//! compiled in and never reordered; everything that needs a sort key derives it
//! from the index of a category in [`PRODUCT_CATEGORIES`].

/// Sort weight of the first ordered category
const WEIGHT_BASE: i64 = 10_000;
/// Weight distance between neighbouring categories
const WEIGHT_STEP: i64 = 100;

/// Label of the catch-all category
pub const OTHER: &str = "Other";

/// A product category as offered to the assistant and the edit form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductCategory {
    pub emoji: &'static str,
    pub label: &'static str,
}

const fn category(emoji: &'static str, label: &'static str) -> ProductCategory {
    ProductCategory { emoji, label }
}

/// All categories in aisle order. "Other" comes first so that it is the
/// default selection in forms.
pub static PRODUCT_CATEGORIES: &[ProductCategory] = &[
    category("❓", OTHER),
    category("🥕", "Produce (Fruits & Vegetables)"),
    category("🥩", "Meat & Seafood"),
    category("🧀", "Deli"),
    category("🥚", "Dairy & Eggs"),
    category("🍞", "Bakery / Bread"),
    category("🧺", "Pantry / Dry Goods"),
    category("🥫", "Canned & Jarred"),
    category("🎂", "Baking Supplies"),
    category("🥣", "Breakfast (cereal, oatmeal, spreads)"),
    category("🍿", "Snacks"),
    category("🥤", "Beverages"),
    category("🧊", "Frozen Foods"),
    category("🧂", "Condiments & Sauces"),
    category("🌶️", "Spices & Seasonings"),
    category("🪣", "Household / Cleaning"),
    category("🧻", "Paper Goods (toilet paper, napkins, towels)"),
    category("🪥", "Personal Care / Health"),
    category("👶", "Baby"),
    category("🐾", "Pet"),
    category("🍷", "Alcohol"),
];

/// Read-only view over the category table
///
/// Cheap to copy; every instance refers to the same static table.
#[derive(Debug, Clone, Copy)]
pub struct CategoryOrdering {
    categories: &'static [ProductCategory],
}

impl CategoryOrdering {
    pub fn standard() -> Self {
        Self {
            categories: PRODUCT_CATEGORIES,
        }
    }

    /// Index of the first category whose label matches exactly
    pub fn position(&self, label: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.label == label)
    }

    /// Sort weight for a category label
    ///
    /// Unknown labels, the empty label and "Other" all weigh 0, placing them
    /// before every named category.
    pub fn weight(&self, label: &str) -> i64 {
        match self.position(label) {
            Some(idx) if label != OTHER => WEIGHT_BASE + idx as i64 * WEIGHT_STEP,
            _ => 0,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> {
        self.categories.iter().map(|c| c.label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ProductCategory> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for CategoryOrdering {
    fn default() -> Self {
        Self::standard()
    }
}
