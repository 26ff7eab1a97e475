use crate::error::RecipeError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use time::OffsetDateTime;

/// Raw nutrient value as it appears in the corpus, e.g. `350` or `"18g"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NutrientValue {
    Number(f64),
    Text(String),
}

/// A recipe as supplied by the corpus. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRecipe")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub cuisine: String,
    /// Raw ingredient lines, in recipe order.
    pub ingredients: Vec<String>,
    pub dietary_tags: BTreeSet<String>,
    pub difficulty: String,
    pub servings: u32,
    pub nutrition: BTreeMap<String, NutrientValue>,
}

#[derive(Deserialize)]
struct RawRecipe {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    cuisine: String,
    #[serde(default)]
    ingredients: Vec<String>,
    #[serde(default)]
    dietary_tags: BTreeSet<String>,
    #[serde(default)]
    difficulty: String,
    #[serde(default = "default_servings")]
    servings: u32,
    #[serde(default)]
    nutrition: BTreeMap<String, NutrientValue>,
}

fn default_servings() -> u32 { 1 }

impl TryFrom<RawRecipe> for Recipe {
    type Error = RecipeError;

    fn try_from(raw: RawRecipe) -> Result<Self, Self::Error> {
        let mut recipe = Recipe::new(raw.id, raw.name, raw.servings)?;
        recipe.cuisine = raw.cuisine;
        recipe.ingredients = raw.ingredients;
        recipe.dietary_tags = raw.dietary_tags;
        recipe.difficulty = raw.difficulty;
        recipe.nutrition = raw.nutrition;
        Ok(recipe)
    }
}

impl Recipe {
    /// Create a recipe with the required fields; everything else starts empty.
    pub fn new(id: impl Into<String>, name: impl Into<String>, servings: u32) -> Result<Self, RecipeError> {
        let id = id.into();
        let name = name.into();
        if id.trim().is_empty() {
            return Err(RecipeError::MissingField("id"));
        }
        if name.trim().is_empty() {
            return Err(RecipeError::MissingField("name"));
        }
        if servings == 0 {
            return Err(RecipeError::InvalidServings);
        }
        Ok(Self {
            id,
            name,
            cuisine: String::new(),
            ingredients: Vec::new(),
            dietary_tags: BTreeSet::new(),
            difficulty: String::new(),
            servings,
            nutrition: BTreeMap::new(),
        })
    }

    pub fn with_cuisine(mut self, cuisine: impl Into<String>) -> Self {
        self.cuisine = cuisine.into();
        self
    }

    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = difficulty.into();
        self
    }

    pub fn with_ingredients<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ingredients = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dietary_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_nutrient(mut self, nutrient: impl Into<String>, value: NutrientValue) -> Self {
        self.nutrition.insert(nutrient.into(), value);
        self
    }

    /// Text indexed for this recipe: name, ingredient lines, cuisine, then dietary tags.
    pub fn document_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.ingredients.len() + self.dietary_tags.len() + 2);
        parts.push(&self.name);
        parts.extend(self.ingredients.iter().map(String::as_str));
        parts.push(&self.cuisine);
        parts.extend(self.dietary_tags.iter().map(String::as_str));
        parts.join(" ")
    }
}

/// A single rating a user gave a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: String,
    pub recipe_id: String,
    pub rating: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,
    /// Cosine similarity to the query, in [0, 1].
    pub score: f32,
}
