//! Nutrition summaries derived from a recipe's raw nutrient map.

use crate::models::{NutrientValue, Recipe};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
}

impl Macros {
    fn scaled(&self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            protein_g: self.protein_g * factor,
            carbs_g: self.carbs_g * factor,
            fat_g: self.fat_g * factor,
            fiber_g: self.fiber_g * factor,
        }
    }

    fn add(&mut self, other: &Macros) {
        self.calories += other.calories;
        self.protein_g += other.protein_g;
        self.carbs_g += other.carbs_g;
        self.fat_g += other.fat_g;
        self.fiber_g += other.fiber_g;
    }

    fn rounded(&self) -> Self {
        Self {
            calories: round1(self.calories),
            protein_g: round1(self.protein_g),
            carbs_g: round1(self.carbs_g),
            fat_g: round1(self.fat_g),
            fiber_g: round1(self.fiber_g),
        }
    }
}

/// Share of calories from each macro, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroSplit {
    pub protein_pct: f64,
    pub carbs_pct: f64,
    pub fat_pct: f64,
}

impl MacroSplit {
    pub fn from_grams(protein_g: f64, carbs_g: f64, fat_g: f64) -> Self {
        let protein = protein_g * 4.0;
        let carbs = carbs_g * 4.0;
        let fat = fat_g * 9.0;
        let total = protein + carbs + fat;
        if total <= 0.0 {
            return Self::default();
        }
        Self {
            protein_pct: round1(protein / total * 100.0),
            carbs_pct: round1(carbs / total * 100.0),
            fat_pct: round1(fat / total * 100.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionSummary {
    pub per_recipe: Macros,
    pub per_serving: Macros,
    pub macros_percentage: MacroSplit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedNutrition {
    pub total_recipes: usize,
    pub per_recipe_avg: Macros,
    pub macros_percentage: MacroSplit,
}

fn round1(v: f64) -> f64 { (v * 10.0).round() / 10.0 }

/// Numeric value of a raw nutrient, e.g. `"18g"` -> 18.0. Unreadable values count as 0.
pub fn nutrient_amount(value: &NutrientValue) -> f64 {
    let amount = match value {
        NutrientValue::Number(n) => *n,
        NutrientValue::Text(s) => {
            let s = s.trim();
            let end = s
                .char_indices()
                .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
                .map(|(i, _)| i)
                .unwrap_or(s.len());
            s[..end].parse().unwrap_or(0.0)
        }
    };
    if amount.is_finite() && amount > 0.0 { amount } else { 0.0 }
}

fn totals(recipe: &Recipe) -> Macros {
    let get = |key: &str| recipe.nutrition.get(key).map(nutrient_amount).unwrap_or(0.0);
    Macros {
        calories: get("calories"),
        protein_g: get("protein"),
        carbs_g: get("carbs"),
        fat_g: get("fat"),
        fiber_g: get("fiber"),
    }
}

impl NutritionSummary {
    pub fn for_recipe(recipe: &Recipe) -> Self {
        let total = totals(recipe);
        let per_serving = total.scaled(1.0 / recipe.servings.max(1) as f64);
        Self {
            per_recipe: total.rounded(),
            per_serving: per_serving.rounded(),
            macros_percentage: MacroSplit::from_grams(per_serving.protein_g, per_serving.carbs_g, per_serving.fat_g),
        }
    }

    pub fn combined(recipes: &[Recipe]) -> CombinedNutrition {
        if recipes.is_empty() {
            return CombinedNutrition::default();
        }
        let mut sum = Macros::default();
        for recipe in recipes {
            sum.add(&totals(recipe));
        }
        let avg = sum.scaled(1.0 / recipes.len() as f64);
        CombinedNutrition {
            total_recipes: recipes.len(),
            per_recipe_avg: avg.rounded(),
            macros_percentage: MacroSplit::from_grams(avg.protein_g, avg.carbs_g, avg.fat_g),
        }
    }
}

/// Per-serving limits and dietary flags a recipe must satisfy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DietaryRequirements {
    pub max_calories: Option<f64>,
    pub min_protein: Option<f64>,
    pub max_carbs: Option<f64>,
    pub max_fat: Option<f64>,
    pub vegetarian: bool,
    pub vegan: bool,
    pub gluten_free: bool,
}

impl DietaryRequirements {
    pub fn meets(&self, recipe: &Recipe) -> bool {
        let serving = NutritionSummary::for_recipe(recipe).per_serving;
        if self.max_calories.is_some_and(|max| serving.calories > max) { return false; }
        if self.min_protein.is_some_and(|min| serving.protein_g < min) { return false; }
        if self.max_carbs.is_some_and(|max| serving.carbs_g > max) { return false; }
        if self.max_fat.is_some_and(|max| serving.fat_g > max) { return false; }

        let has = |tag: &str| recipe.dietary_tags.contains(tag);
        if self.vegetarian && !has("vegetarian") { return false; }
        if self.vegan && !has("vegan") { return false; }
        if self.gluten_free && !has("gluten-free") { return false; }
        true
    }
}
