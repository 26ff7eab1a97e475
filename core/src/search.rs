use crate::config::EngineConfig;
use crate::detect::{filter_by_confidence, ingredient_list, Detection};
use crate::error::SearchError;
use crate::index::{IndexSnapshot, SimilarityIndex};
use crate::models::{Recipe, ScoredRecipe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Metadata constraints applied after ranking. Unset fields impose nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    pub cuisine: Option<String>,
    pub difficulty: Option<String>,
    /// Recipe must carry at least one of these tags when non-empty.
    pub dietary_tags: BTreeSet<String>,
}

impl SearchFilters {
    pub fn cuisine(cuisine: impl Into<String>) -> Self {
        Self { cuisine: Some(cuisine.into()), ..Self::default() }
    }

    pub fn matches(&self, recipe: &Recipe) -> bool {
        if let Some(cuisine) = &self.cuisine {
            if &recipe.cuisine != cuisine { return false; }
        }
        if let Some(difficulty) = &self.difficulty {
            if &recipe.difficulty != difficulty { return false; }
        }
        if !self.dietary_tags.is_empty() && self.dietary_tags.is_disjoint(&recipe.dietary_tags) {
            return false;
        }
        true
    }
}

/// Ranked recipe search over a [`SimilarityIndex`].
///
/// Owned by whoever composes the application and shared by reference; `rebuild` swaps
/// the underlying index without blocking searches already in flight.
pub struct SearchEngine {
    index: SimilarityIndex,
    config: EngineConfig,
}

impl SearchEngine {
    pub fn new(config: EngineConfig) -> Self {
        let index = SimilarityIndex::new(config.max_terms, config.idf);
        Self { index, config }
    }

    pub fn with_corpus(config: EngineConfig, corpus: &[Recipe]) -> Self {
        let engine = Self::new(config);
        engine.rebuild(corpus);
        engine
    }

    /// Wrap an index loaded from disk.
    pub fn from_snapshot(config: EngineConfig, snapshot: IndexSnapshot) -> Self {
        let engine = Self::new(config);
        engine.index.publish(snapshot);
        engine
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn rebuild(&self, corpus: &[Recipe]) {
        self.index.build(corpus);
    }

    pub fn snapshot(&self) -> Arc<IndexSnapshot> { self.index.snapshot() }

    pub fn get(&self, id: &str) -> Option<Recipe> {
        self.index.snapshot().get(id).cloned()
    }

    pub fn len(&self) -> usize { self.index.snapshot().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Rank the corpus against `query` and return up to `limit` recipes passing `filters`.
    ///
    /// Filtered-out recipes are skipped without counting toward `limit`.
    pub fn search(&self, query: &str, limit: usize, filters: Option<&SearchFilters>) -> Result<Vec<ScoredRecipe>, SearchError> {
        if limit == 0 {
            return Err(SearchError::InvalidLimit);
        }
        let snapshot = self.index.snapshot();
        let mut results = Vec::with_capacity(limit.min(snapshot.len()));
        for (pos, score) in snapshot.rank(query) {
            if results.len() >= limit { break; }
            let recipe = snapshot.recipe_at(pos);
            if let Some(f) = filters {
                if !f.matches(recipe) { continue; }
            }
            results.push(ScoredRecipe { recipe: recipe.clone(), score });
        }
        Ok(results)
    }

    /// Search with the ingredient names joined into one query.
    pub fn search_by_ingredients<S: AsRef<str>>(&self, ingredients: &[S], limit: usize) -> Result<Vec<ScoredRecipe>, SearchError> {
        let query = ingredients.iter().map(AsRef::as_ref).collect::<Vec<&str>>().join(" ");
        self.search(&query, limit, None)
    }

    /// Search with what an image detector found, treated exactly like typed ingredients.
    pub fn search_by_detections(&self, detections: &[Detection], min_confidence: f32, limit: usize) -> Result<(Vec<String>, Vec<ScoredRecipe>), SearchError> {
        let ingredients = ingredient_list(&filter_by_confidence(detections, min_confidence));
        let results = self.search_by_ingredients(&ingredients, limit)?;
        Ok((ingredients, results))
    }
}
