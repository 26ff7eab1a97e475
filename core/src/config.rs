use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// How inverse document frequency is computed when the index is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdfMode {
    /// ln(N / df); terms present in every recipe carry no weight.
    Plain,
    /// ln(1 + N / df); never zero, so a single-recipe corpus still ranks.
    #[default]
    Smoothed,
}

impl IdfMode {
    pub fn weight(self, num_docs: u32, df: u32) -> f32 {
        let n = num_docs.max(1) as f32;
        let df = df.max(1) as f32;
        match self {
            IdfMode::Plain => (n / df).ln(),
            IdfMode::Smoothed => (1.0 + n / df).ln(),
        }
    }
}

/// Tunables for index construction and recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Vocabulary cap applied at build time.
    pub max_terms: usize,
    pub idf: IdfMode,
    /// Query issued when a user has no usable rating history.
    pub fallback_query: String,
    /// Minimum rating that marks a recipe as liked.
    pub liked_rating: i32,
    /// How many of the most recent liked recipes seed recommendations.
    pub recent_liked: usize,
    /// Each seed query asks for `limit * expansion_factor` results.
    pub expansion_factor: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_terms: 1000,
            idf: IdfMode::Smoothed,
            fallback_query: "popular".to_string(),
            liked_rating: 4,
            recent_liked: 5,
            expansion_factor: 2,
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: EngineConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_terms == 0 {
            bail!("max_terms must be at least 1");
        }
        if self.recent_liked == 0 {
            bail!("recent_liked must be at least 1");
        }
        if self.expansion_factor == 0 {
            bail!("expansion_factor must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_terms": 50, "idf": "plain"}"#).unwrap();
        assert_eq!(config.max_terms, 50);
        assert_eq!(config.idf, IdfMode::Plain);
        assert_eq!(config.fallback_query, "popular");
        assert_eq!(config.recent_liked, 5);
    }

    #[test]
    fn zero_counts_are_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"recent_liked": 0}"#).unwrap();
        assert!(EngineConfig::from_file(&path).is_err());

        std::fs::write(&path, r#"{"expansion_factor": 0}"#).unwrap();
        assert!(EngineConfig::from_file(&path).is_err());

        std::fs::write(&path, r#"{"recent_liked": 3}"#).unwrap();
        assert_eq!(EngineConfig::from_file(&path).unwrap().recent_liked, 3);
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn plain_idf_is_zero_for_ubiquitous_terms() {
        assert_eq!(IdfMode::Plain.weight(4, 4), 0.0);
        assert!(IdfMode::Smoothed.weight(4, 4) > 0.0);
    }
}
