//! Merges ingredient lines from several recipes into one categorized shopping list.
//!
//! Lines are keyed by lower-cased ingredient name. Quantities for the same key add up
//! after each recipe's servings multiplier is applied. Conflicting units are not
//! reconciled: the unit of the last contributing line (in caller order) is kept.

use crate::category::{classify, Category};
use crate::error::ConsolidateError;
use crate::ingredient::parse_ingredient;
use crate::models::Recipe;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub category: Category,
    #[serde(default)]
    pub checked: bool,
    /// Contributing recipe ids in first-contribution order, without repeats.
    pub source_recipe_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    /// Sorted by category name; items within a category keep first-seen order.
    pub items: Vec<ConsolidatedItem>,
    pub recipe_ids: Vec<String>,
    /// Owner, once the list is saved for someone.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl ShoppingList {
    pub fn total_items(&self) -> usize { self.items.len() }

    pub fn by_category(&self) -> BTreeMap<Category, Vec<&ConsolidatedItem>> {
        let mut groups: BTreeMap<Category, Vec<&ConsolidatedItem>> = BTreeMap::new();
        for item in &self.items {
            groups.entry(item.category).or_default().push(item);
        }
        groups
    }

    /// Flip the checked flag of the item called `name` (case-insensitive). Returns the new
    /// state, or `None` if no such item exists.
    pub fn toggle(&mut self, name: &str) -> Option<bool> {
        let key = name.trim().to_lowercase();
        let item = self.items.iter_mut().find(|i| i.name == key)?;
        item.checked = !item.checked;
        Some(item.checked)
    }

    pub fn clear_checked(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|i| !i.checked);
        before - self.items.len()
    }
}

fn round2(q: f64) -> f64 { (q * 100.0).round() / 100.0 }

/// Consolidate `(recipe, servings multiplier)` pairs, processed in the given order.
pub fn consolidate(selections: &[(&Recipe, f64)]) -> Result<ShoppingList, ConsolidateError> {
    for (recipe, multiplier) in selections {
        if !multiplier.is_finite() || *multiplier < 0.0 {
            return Err(ConsolidateError::InvalidMultiplier { recipe_id: recipe.id.clone(), multiplier: *multiplier });
        }
    }

    let mut items: Vec<ConsolidatedItem> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut recipe_ids: Vec<String> = Vec::with_capacity(selections.len());

    for (recipe, multiplier) in selections {
        recipe_ids.push(recipe.id.clone());
        for line in &recipe.ingredients {
            if line.trim().is_empty() {
                tracing::debug!(recipe_id = %recipe.id, "skipping blank ingredient line");
                continue;
            }
            let parsed = parse_ingredient(line);
            let key = parsed.name.to_lowercase();
            let slot = *slots.entry(key.clone()).or_insert_with(|| {
                items.push(ConsolidatedItem {
                    name: key,
                    quantity: 0.0,
                    unit: String::new(),
                    category: Category::Other,
                    checked: false,
                    source_recipe_ids: Vec::new(),
                });
                items.len() - 1
            });
            let item = &mut items[slot];
            item.quantity += parsed.quantity * multiplier;
            item.unit = parsed.unit;
            if !item.source_recipe_ids.contains(&recipe.id) {
                item.source_recipe_ids.push(recipe.id.clone());
            }
        }
    }

    for item in items.iter_mut() {
        item.category = classify(&item.name);
        item.quantity = round2(item.quantity);
    }
    // stable: first-seen order survives within a category
    items.sort_by_key(|i| i.category);

    Ok(ShoppingList { items, recipe_ids, user_id: None })
}

/// Consolidate `recipes` using per-recipe multipliers keyed by recipe id (default 1.0).
pub fn consolidate_with_multipliers(
    recipes: &[Recipe],
    multipliers: &HashMap<String, f64>,
) -> Result<ShoppingList, ConsolidateError> {
    let selections: Vec<(&Recipe, f64)> = recipes
        .iter()
        .map(|r| (r, multipliers.get(&r.id).copied().unwrap_or(1.0)))
        .collect();
    consolidate(&selections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: &str, lines: &[&str]) -> Recipe {
        Recipe::new(id, format!("Recipe {id}"), 2).unwrap().with_ingredients(lines.iter().copied())
    }

    #[test]
    fn merges_same_name_across_recipes() {
        let a = recipe("a", &["2 cups flour", "1 tsp salt"]);
        let b = recipe("b", &["1 cup Flour", "3 eggs"]);
        let list = consolidate(&[(&a, 1.0), (&b, 1.0)]).unwrap();

        let flour = list.items.iter().find(|i| i.name == "flour").unwrap();
        assert_eq!(flour.quantity, 3.0);
        assert_eq!(flour.unit, "cup");
        assert_eq!(flour.category, Category::Grains);
        assert_eq!(flour.source_recipe_ids, vec!["a".to_string(), "b".to_string()]);
        assert!(!flour.checked);
        assert_eq!(list.total_items(), 3);
        assert_eq!(list.recipe_ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn multiplier_scales_and_rounds() {
        let a = recipe("a", &["1 cup rice"]);
        let list = consolidate(&[(&a, 1.0 / 3.0)]).unwrap();
        assert_eq!(list.items[0].quantity, 0.33);
    }

    #[test]
    fn same_recipe_twice_doubles_quantity_but_lists_source_once() {
        let a = recipe("a", &["200 g pasta", "2 tomatoes"]);
        let single = consolidate(&[(&a, 1.0)]).unwrap();
        let double = consolidate(&[(&a, 1.0), (&a, 1.0)]).unwrap();
        for (one, two) in single.items.iter().zip(double.items.iter()) {
            assert_eq!(one.name, two.name);
            assert_eq!(two.quantity, one.quantity * 2.0);
            assert_eq!(two.source_recipe_ids, vec!["a".to_string()]);
        }
    }

    #[test]
    fn last_unit_wins() {
        let a = recipe("a", &["100 g butter"]);
        let b = recipe("b", &["2 tbsp butter"]);
        let list = consolidate(&[(&a, 1.0), (&b, 1.0)]).unwrap();
        assert_eq!(list.items[0].unit, "tbsp");
        assert_eq!(list.items[0].quantity, 102.0);

        let reversed = consolidate(&[(&b, 1.0), (&a, 1.0)]).unwrap();
        assert_eq!(reversed.items[0].unit, "g");
    }

    #[test]
    fn items_sorted_by_category_name() {
        let a = recipe("a", &["1 onion", "1 l milk", "2 chicken thighs", "orange juice", "xyz"]);
        let list = consolidate(&[(&a, 1.0)]).unwrap();
        let cats: Vec<&str> = list.items.iter().map(|i| i.category.as_str()).collect();
        assert_eq!(cats, vec!["dairy", "meat", "other", "produce", "produce"]);
        assert_eq!(list.items[3].name, "onion");
        assert_eq!(list.items[4].name, "orange juice");
    }

    #[test]
    fn rejects_negative_multiplier() {
        let a = recipe("a", &["1 cup rice"]);
        let err = consolidate(&[(&a, -1.0)]).unwrap_err();
        assert_eq!(err, ConsolidateError::InvalidMultiplier { recipe_id: "a".into(), multiplier: -1.0 });
        assert!(consolidate(&[(&a, f64::NAN)]).is_err());
    }

    #[test]
    fn blank_lines_are_skipped() {
        let a = recipe("a", &["", "   ", "1 cup rice"]);
        let list = consolidate(&[(&a, 1.0)]).unwrap();
        assert_eq!(list.total_items(), 1);
    }

    #[test]
    fn grouping_and_toggling() {
        let a = recipe("a", &["1 onion", "1 garlic", "1 l milk"]);
        let mut list = consolidate(&[(&a, 1.0)]).unwrap();
        let groups = list.by_category();
        assert_eq!(groups[&Category::Produce].len(), 2);
        assert_eq!(groups.keys().next(), Some(&Category::Dairy));

        assert_eq!(list.toggle("onion"), Some(true));
        assert_eq!(list.toggle("missing"), None);
        assert_eq!(list.clear_checked(), 1);
        assert!(list.items.iter().all(|i| i.name != "onion"));
    }

    #[test]
    fn multipliers_by_id_default_to_one() {
        let recipes = vec![recipe("a", &["1 cup rice"]), recipe("b", &["1 cup rice"])];
        let multipliers = HashMap::from([("b".to_string(), 2.0)]);
        let list = consolidate_with_multipliers(&recipes, &multipliers).unwrap();
        assert_eq!(list.items[0].quantity, 3.0);
    }
}
