//! Shopping categories for ingredient names.
//!
//! Classification is a case-insensitive substring match against a fixed keyword table.
//! Categories are tried in table order and the first hit wins, so `"ice cream"` lands in
//! dairy (via `"cream"`) before frozen is consulted. Keywords embedded in unrelated words
//! also match (`"boiled"` contains `"oil"`); that imprecision is accepted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Variants are declared alphabetically so the derived `Ord` sorts by category name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Beverages,
    Dairy,
    Frozen,
    Grains,
    Meat,
    Other,
    Pantry,
    Produce,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Beverages => "beverages",
            Category::Dairy => "dairy",
            Category::Frozen => "frozen",
            Category::Grains => "grains",
            Category::Meat => "meat",
            Category::Other => "other",
            Category::Pantry => "pantry",
            Category::Produce => "produce",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Produce, &[
        "apple", "banana", "orange", "tomato", "lettuce", "spinach", "carrot", "onion", "garlic",
        "potato", "broccoli", "peppers", "cucumber", "mushroom", "avocado", "lemon", "lime", "ginger",
    ]),
    (Category::Dairy, &[
        "milk", "cheese", "butter", "eggs", "yogurt", "cream", "parmesan", "mozzarella", "feta",
        "cheddar", "ricotta", "sour cream",
    ]),
    (Category::Meat, &[
        "chicken", "beef", "pork", "lamb", "bacon", "sausage", "turkey", "fish", "salmon", "shrimp",
        "meatballs", "ham",
    ]),
    (Category::Grains, &[
        "bread", "pasta", "rice", "flour", "oats", "cereal", "wheat", "barley", "couscous", "quinoa",
        "spaghetti", "noodles",
    ]),
    (Category::Pantry, &[
        "oil", "salt", "pepper", "sugar", "honey", "vinegar", "soy sauce", "sauce", "spices", "herbs",
        "beans", "lentils", "canned",
    ]),
    (Category::Frozen, &["frozen vegetables", "frozen fruits", "ice cream"]),
    (Category::Beverages, &["milk", "juice", "water", "coffee", "tea", "wine", "beer"]),
];

/// Shopping category for an ingredient name; [`Category::Other`] when nothing matches.
pub fn classify(name: &str) -> Category {
    let lower = name.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}
