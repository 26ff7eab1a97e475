//! Recipe search and shopping-list consolidation engine.
//!
//! The crate is organised leaves first:
//!
//! - [`tokenizer`]: shared text normalisation for documents and queries
//! - [`ingredient`] and [`category`]: ingredient-line parsing and aisle classification
//! - [`shopping`]: merges ingredient lines across recipes into one list
//! - [`index`]: TF-IDF vectors over the recipe corpus, published as immutable snapshots
//! - [`search`]: ranked search with metadata filters
//! - [`recommend`]: personalised recommendations from a user's rating history
//!
//! [`persist`] and [`store`] cover durable storage, [`detect`] the image detector seam
//! and [`nutrition`] per-recipe nutrition summaries.

pub mod config;
pub mod detect;
pub mod error;
pub mod index;
pub mod ingredient;
pub mod category;
pub mod models;
pub mod nutrition;
pub mod persist;
pub mod recommend;
pub mod search;
pub mod shopping;
pub mod store;
pub mod tokenizer;

pub use category::{classify, Category};
pub use config::{EngineConfig, IdfMode};
pub use error::{ConsolidateError, DetectError, RecipeError, SearchError, StoreError};
pub use index::{IndexSnapshot, SimilarityIndex};
pub use ingredient::{parse_ingredient, ParsedIngredient};
pub use models::{Interaction, NutrientValue, Recipe, ScoredRecipe};
pub use recommend::InteractionRanker;
pub use search::{SearchEngine, SearchFilters};
pub use shopping::{consolidate, consolidate_with_multipliers, ConsolidatedItem, ShoppingList};

pub type TermId = u32;
