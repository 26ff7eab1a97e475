//! Personalised recommendations by query expansion.
//!
//! The user's most recent highly rated recipes each seed a search on
//! `name + cuisine`; the union of those results, minus everything the user already
//! liked, is the recommendation set. Order is first insertion across the seed queries,
//! not an aggregate score.

use crate::error::SearchError;
use crate::models::{Interaction, Recipe};
use crate::search::SearchEngine;
use std::collections::HashSet;

pub struct InteractionRanker<'e> {
    engine: &'e SearchEngine,
}

impl<'e> InteractionRanker<'e> {
    pub fn new(engine: &'e SearchEngine) -> Self {
        Self { engine }
    }

    pub fn recommend(&self, user_id: &str, interactions: &[Interaction], limit: usize) -> Result<Vec<Recipe>, SearchError> {
        if limit == 0 {
            return Err(SearchError::InvalidLimit);
        }
        let config = self.engine.config();

        let mut history: Vec<&Interaction> = interactions.iter().filter(|i| i.user_id == user_id).collect();
        // most recent first; stable for equal timestamps
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut liked: Vec<&str> = Vec::new();
        let mut liked_set: HashSet<&str> = HashSet::new();
        for i in history.iter().filter(|i| i.rating >= config.liked_rating) {
            if liked_set.insert(i.recipe_id.as_str()) {
                liked.push(i.recipe_id.as_str());
            }
        }

        if liked.is_empty() || config.recent_liked == 0 {
            tracing::debug!(user_id, "no liked recipes, using fallback query");
            return self.fallback(limit);
        }

        let snapshot = self.engine.snapshot();
        let mut picked: Vec<String> = Vec::new();
        let mut picked_set: HashSet<String> = HashSet::new();
        for seed_id in liked.iter().take(config.recent_liked) {
            let Some(seed) = snapshot.get(seed_id) else {
                tracing::debug!(user_id, recipe_id = seed_id, "liked recipe not in corpus");
                continue;
            };
            let query = format!("{} {}", seed.name, seed.cuisine);
            let expanded = limit.saturating_mul(config.expansion_factor.max(1));
            for hit in self.engine.search(&query, expanded, None)? {
                let id = hit.recipe.id;
                if liked_set.contains(id.as_str()) || picked_set.contains(&id) { continue; }
                picked_set.insert(id.clone());
                picked.push(id);
            }
        }

        Ok(picked
            .iter()
            .take(limit)
            .filter_map(|id| snapshot.get(id).cloned())
            .collect())
    }

    fn fallback(&self, limit: usize) -> Result<Vec<Recipe>, SearchError> {
        let hits = self.engine.search(&self.engine.config().fallback_query, limit, None)?;
        Ok(hits.into_iter().map(|h| h.recipe).collect())
    }
}
