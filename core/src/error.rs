use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("limit must be greater than zero")]
    InvalidLimit,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsolidateError {
    #[error("servings multiplier for recipe {recipe_id} must be a non-negative number, got {multiplier}")]
    InvalidMultiplier { recipe_id: String, multiplier: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecipeError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("servings must be at least 1")]
    InvalidServings,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("shopping list {0} not found")]
    ListNotFound(u64),
}

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("unsupported image payload: {0}")]
    UnsupportedImage(String),

    #[error("detector unavailable: {0}")]
    Unavailable(String),
}
