use crate::config::IdfMode;
use crate::models::Recipe;
use crate::tokenizer::{term_counts, tokenize};
use crate::TermId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// L2-normalized sparse term vector, entries sorted by term id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub entries: Vec<(TermId, f32)>,
}

impl SparseVector {
    fn from_weights(mut entries: Vec<(TermId, f32)>) -> Self {
        entries.sort_by_key(|(tid, _)| *tid);
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in entries.iter_mut() { *w /= norm; }
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Dot product; equals cosine similarity since both sides are unit length.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0f32;
        while i < self.entries.len() && j < other.entries.len() {
            let (a, wa) = self.entries[i];
            let (b, wb) = other.entries[j];
            match a.cmp(&b) {
                Ordering::Equal => {
                    sum += wa * wb;
                    i += 1;
                    j += 1;
                }
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }
        sum
    }
}

/// Vocabulary, IDF weights and one vector per recipe, in corpus order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermVectors {
    pub dictionary: HashMap<String, TermId>,
    pub idf: Vec<f32>,
    pub docs: Vec<SparseVector>,
}

impl TermVectors {
    pub fn fit(texts: &[String], max_terms: usize, idf_mode: IdfMode) -> Self {
        let num_docs = texts.len() as u32;
        let doc_counts: Vec<HashMap<String, u32>> = texts.iter().map(|t| term_counts(t)).collect();

        let mut corpus_tf: HashMap<&str, u32> = HashMap::new();
        let mut df: HashMap<&str, u32> = HashMap::new();
        for counts in &doc_counts {
            for (term, count) in counts {
                *corpus_tf.entry(term.as_str()).or_insert(0) += count;
                *df.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        // Keep the most frequent terms, ties alphabetically so builds are reproducible.
        let mut ranked: Vec<(&str, u32)> = corpus_tf.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_terms);

        let mut dictionary: HashMap<String, TermId> = HashMap::with_capacity(ranked.len());
        let mut idf: Vec<f32> = Vec::with_capacity(ranked.len());
        for (tid, (term, _)) in ranked.iter().enumerate() {
            dictionary.insert(term.to_string(), tid as TermId);
            idf.push(idf_mode.weight(num_docs, df[term]));
        }

        let docs = doc_counts.iter().map(|counts| weigh(counts, &dictionary, &idf)).collect();
        Self { dictionary, idf, docs }
    }

    /// Project free text into the fixed vocabulary. Unknown terms are dropped.
    pub fn vectorize(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for term in tokenize(text) {
            if self.dictionary.contains_key(&term) {
                *counts.entry(term).or_insert(0) += 1;
            }
        }
        weigh(&counts, &self.dictionary, &self.idf)
    }
}

fn weigh(counts: &HashMap<String, u32>, dictionary: &HashMap<String, TermId>, idf: &[f32]) -> SparseVector {
    let mut weights = Vec::with_capacity(counts.len());
    for (term, tf_raw) in counts {
        if let Some(&tid) = dictionary.get(term) {
            let tf = if *tf_raw > 0 { 1.0 + (*tf_raw as f32).ln() } else { 0.0 };
            let w = tf * idf[tid as usize];
            if w > 0.0 { weights.push((tid, w)); }
        }
    }
    SparseVector::from_weights(weights)
}

/// One fully built generation of the index. Never mutated after construction.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    recipes: Vec<Recipe>,
    positions: HashMap<String, usize>,
    vectors: TermVectors,
}

impl IndexSnapshot {
    /// Index `corpus`. A repeated recipe id keeps its first occurrence only.
    pub fn build(corpus: &[Recipe], max_terms: usize, idf_mode: IdfMode) -> Self {
        let mut seen = HashSet::new();
        let mut unique: Vec<Recipe> = Vec::with_capacity(corpus.len());
        for recipe in corpus {
            if !seen.insert(recipe.id.as_str()) {
                tracing::warn!(recipe_id = %recipe.id, "duplicate recipe id, keeping first occurrence");
                continue;
            }
            unique.push(recipe.clone());
        }
        let texts: Vec<String> = unique.iter().map(Recipe::document_text).collect();
        let vectors = TermVectors::fit(&texts, max_terms, idf_mode);
        Self::from_parts(unique, vectors)
    }

    /// Reassemble a snapshot from a corpus and the vectors built from it, position for
    /// position. Later recipes repeating an earlier id are dropped together with their vectors.
    pub fn from_parts(recipes: Vec<Recipe>, mut vectors: TermVectors) -> Self {
        let docs = std::mem::take(&mut vectors.docs);
        let mut kept = Vec::with_capacity(recipes.len());
        let mut kept_docs = Vec::with_capacity(docs.len());
        let mut positions = HashMap::with_capacity(recipes.len());
        for (recipe, doc) in recipes.into_iter().zip(docs) {
            if positions.contains_key(&recipe.id) {
                tracing::warn!(recipe_id = %recipe.id, "duplicate recipe id, keeping first occurrence");
                continue;
            }
            positions.insert(recipe.id.clone(), kept.len());
            kept.push(recipe);
            kept_docs.push(doc);
        }
        vectors.docs = kept_docs;
        Self { recipes: kept, positions, vectors }
    }

    pub fn recipes(&self) -> &[Recipe] { &self.recipes }

    pub fn vectors(&self) -> &TermVectors { &self.vectors }

    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.positions.get(id).map(|&pos| &self.recipes[pos])
    }

    pub fn len(&self) -> usize { self.recipes.len() }

    pub fn is_empty(&self) -> bool { self.recipes.is_empty() }

    pub fn num_terms(&self) -> usize { self.vectors.dictionary.len() }

    /// Score every recipe against `text`, best first; equal scores keep corpus order.
    pub fn rank(&self, text: &str) -> Vec<(usize, f32)> {
        if self.recipes.is_empty() {
            return Vec::new();
        }
        let q = self.vectors.vectorize(text);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .docs
            .iter()
            .enumerate()
            .map(|(pos, doc)| (pos, if q.is_empty() { 0.0 } else { doc.dot(&q).clamp(0.0, 1.0) }))
            .collect();
        // sort_by is stable
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored
    }

    pub fn query(&self, text: &str) -> Vec<(String, f32)> {
        self.rank(text)
            .into_iter()
            .map(|(pos, score)| (self.recipes[pos].id.clone(), score))
            .collect()
    }

    pub(crate) fn recipe_at(&self, pos: usize) -> &Recipe { &self.recipes[pos] }
}

/// Shared handle to the current [`IndexSnapshot`].
///
/// `build` assembles the next snapshot without holding the lock and then swaps it in,
/// so concurrent readers see either the previous generation or the new one.
pub struct SimilarityIndex {
    max_terms: usize,
    idf_mode: IdfMode,
    current: RwLock<Arc<IndexSnapshot>>,
}

impl SimilarityIndex {
    pub fn new(max_terms: usize, idf_mode: IdfMode) -> Self {
        Self { max_terms, idf_mode, current: RwLock::new(Arc::new(IndexSnapshot::default())) }
    }

    pub fn build(&self, corpus: &[Recipe]) {
        let snapshot = IndexSnapshot::build(corpus, self.max_terms, self.idf_mode);
        tracing::info!(num_docs = snapshot.len(), num_terms = snapshot.num_terms(), "built similarity index");
        self.publish(snapshot);
    }

    pub fn publish(&self, snapshot: IndexSnapshot) {
        *self.current.write() = Arc::new(snapshot);
    }

    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current.read().clone()
    }

    pub fn query(&self, text: &str) -> Vec<(String, f32)> {
        self.snapshot().query(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: &str, name: &str, ingredients: &[&str]) -> Recipe {
        Recipe::new(id, name, 2).unwrap().with_ingredients(ingredients.iter().copied())
    }

    #[test]
    fn unbuilt_index_returns_nothing() {
        let index = SimilarityIndex::new(1000, IdfMode::Smoothed);
        assert!(index.query("tomato").is_empty());
    }

    #[test]
    fn vocabulary_is_capped_by_frequency() {
        let texts = vec!["garlic garlic garlic basil".to_string(), "garlic basil thyme".to_string()];
        let vectors = TermVectors::fit(&texts, 2, IdfMode::Smoothed);
        assert_eq!(vectors.dictionary.len(), 2);
        assert!(vectors.dictionary.contains_key("garlic"));
        assert!(vectors.dictionary.contains_key("basil"));
        assert!(!vectors.dictionary.contains_key("thyme"));
    }

    #[test]
    fn document_vectors_are_unit_length() {
        let texts = vec!["rice beans rice".to_string(), "beans chili".to_string()];
        let vectors = TermVectors::fit(&texts, 100, IdfMode::Smoothed);
        for doc in &vectors.docs {
            let norm: f32 = doc.entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn out_of_vocabulary_query_scores_zero_in_corpus_order() {
        let index = SimilarityIndex::new(1000, IdfMode::Smoothed);
        index.build(&[recipe("a", "Pancakes", &["flour"]), recipe("b", "Omelette", &["eggs"])]);
        let ranked = index.query("zucchini");
        assert_eq!(ranked, vec![("a".to_string(), 0.0), ("b".to_string(), 0.0)]);
    }

    #[test]
    fn rebuild_replaces_snapshot() {
        let index = SimilarityIndex::new(1000, IdfMode::Smoothed);
        index.build(&[recipe("a", "Pancakes", &["flour"])]);
        let before = index.snapshot();
        index.build(&[recipe("b", "Omelette", &["eggs"])]);
        assert!(before.get("a").is_some());
        assert!(index.snapshot().get("a").is_none());
        assert_eq!(index.query("omelette")[0].0, "b");
    }

    #[test]
    fn duplicate_ids_are_indexed_once() {
        let first = recipe("a", "Green Curry", &["coconut milk"]);
        let repeat = recipe("a", "Green Curry Deluxe", &["coconut milk", "basil"]);
        let snapshot = IndexSnapshot::build(&[first.clone(), recipe("b", "Fried Rice", &["rice"]), repeat], 1000, IdfMode::Smoothed);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.vectors().docs.len(), 2);
        assert_eq!(snapshot.get("a"), Some(&first));
        let ids: Vec<String> = snapshot.query("green curry").into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn from_parts_drops_repeated_ids_with_their_vectors() {
        let texts = vec!["green curry".to_string(), "fried rice".to_string(), "green curry basil".to_string()];
        let vectors = TermVectors::fit(&texts, 1000, IdfMode::Smoothed);
        let third = vectors.docs[2].clone();
        let recipes = vec![
            recipe("a", "Green Curry", &[]),
            recipe("b", "Fried Rice", &[]),
            recipe("a", "Green Curry Basil", &[]),
        ];
        let snapshot = IndexSnapshot::from_parts(recipes, vectors);
        assert_eq!(snapshot.recipes().iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(snapshot.vectors().docs.len(), 2);
        assert!(!snapshot.vectors().docs.contains(&third));
    }

    #[test]
    fn readers_keep_their_snapshot_while_a_build_publishes() {
        let index = SimilarityIndex::new(1000, IdfMode::Smoothed);
        index.build(&[recipe("a", "Pancakes", &["flour"])]);
        let held = index.snapshot();

        std::thread::scope(|s| {
            s.spawn(|| index.build(&[recipe("b", "Omelette", &["eggs"]), recipe("c", "Frittata", &["eggs"])]));
            s.spawn(|| {
                for _ in 0..200 {
                    let snapshot = index.snapshot();
                    let ranked = snapshot.query("pancakes omelette");
                    // one generation or the other, never a mix
                    match ranked.len() {
                        1 => assert_eq!(ranked[0].0, "a"),
                        2 => assert_eq!(ranked[0].0, "b"),
                        n => panic!("partial snapshot with {n} recipes"),
                    }
                }
            });
        });

        assert_eq!(held.len(), 1);
        assert_eq!(held.query("pancakes")[0].0, "a");
        assert!(index.snapshot().get("a").is_none());
        assert_eq!(index.snapshot().len(), 2);
    }

    #[test]
    fn exact_match_scores_one() {
        let index = SimilarityIndex::new(1000, IdfMode::Smoothed);
        let pasta = recipe("a", "Garlic Pasta", &["spaghetti", "garlic"]);
        let text = pasta.document_text();
        index.build(&[pasta, recipe("b", "Fruit Salad", &["apple"])]);
        let ranked = index.query(&text);
        assert_eq!(ranked[0].0, "a");
        assert!((ranked[0].1 - 1.0).abs() < 1e-5);
    }
}
