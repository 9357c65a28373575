//! Application configuration
//!
//! Loaded from an optional YAML file; every field has a default.
//!
//! ```yaml
//! ranker:
//!   threshold: 0.1
//!   extra_stop_words: [recipe]
//! popular:
//!   pool: 10
//!   count: 3
//! recommend:
//!   limit: 10
//! ```

use crate::error::{Error, Result};
use crate::search::{RankerConfig, RelevanceRanker, StopWords, DEFAULT_THRESHOLD};
use crate::social::DEFAULT_RECOMMEND_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerSettings {
    /// Scores must be strictly greater than this
    pub threshold: f64,
    /// Start from the English stop-word list
    pub english_stop_words: bool,
    pub extra_stop_words: Vec<String>,
}

impl Default for RankerSettings {
    fn default() -> Self {
        RankerSettings {
            threshold: DEFAULT_THRESHOLD,
            english_stop_words: true,
            extra_stop_words: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopularSettings {
    /// How many of the most liked recipes to draw from
    pub pool: usize,
    /// How many to show
    pub count: usize,
}

impl Default for PopularSettings {
    fn default() -> Self {
        PopularSettings { pool: 10, count: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendSettings {
    pub limit: usize,
}

impl Default for RecommendSettings {
    fn default() -> Self {
        RecommendSettings {
            limit: DEFAULT_RECOMMEND_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ranker: RankerSettings,
    pub popular: PopularSettings,
    pub recommend: RecommendSettings,
}

impl Config {
    /// Load and validate a YAML config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Config::default()),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty file parses as null
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.ranker.threshold;
        if !threshold.is_finite() || !(0.0..1.0).contains(&threshold) {
            return Err(Error::ConfigError(format!(
                "ranker.threshold must be in [0, 1), got {}",
                threshold
            )));
        }
        if self.popular.count > self.popular.pool {
            return Err(Error::ConfigError(format!(
                "popular.count ({}) exceeds popular.pool ({})",
                self.popular.count, self.popular.pool
            )));
        }
        Ok(())
    }

    pub fn ranker_config(&self) -> RankerConfig {
        let base = if self.ranker.english_stop_words {
            StopWords::english()
        } else {
            StopWords::none()
        };
        RankerConfig {
            threshold: self.ranker.threshold,
            stop_words: base.with_extra(&self.ranker.extra_stop_words),
        }
    }

    pub fn ranker(&self) -> RelevanceRanker {
        RelevanceRanker::new(self.ranker_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ranker.threshold, 0.1);
        assert_eq!(config.popular, PopularSettings { pool: 10, count: 3 });
        assert_eq!(config.recommend.limit, 10);
        assert_eq!(Config::from_yaml("").unwrap(), config);
    }

    #[test]
    fn test_partial_yaml() {
        let config = Config::from_yaml("ranker:\n  threshold: 0.25\n  extra_stop_words: [Recipe]\n")
            .unwrap();
        assert_eq!(config.ranker.threshold, 0.25);
        assert_eq!(config.popular.count, 3);

        let ranker = config.ranker_config();
        assert!(ranker.stop_words.contains("recipe"));
        assert!(ranker.stop_words.contains("the"));
    }

    #[test]
    fn test_without_english_list() {
        let config = Config::from_yaml("ranker:\n  english_stop_words: false\n").unwrap();
        assert!(config.ranker_config().stop_words.is_empty());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_yaml("ranker:\n  threshold: 1.5\n"),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            Config::from_yaml("popular:\n  pool: 2\n  count: 5\n"),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            Config::from_yaml("ranker: [oops"),
            Err(Error::Yaml(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mitho.yaml");
        std::fs::write(&path, "recommend:\n  limit: 4\n").unwrap();

        let config = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.recommend.limit, 4);
        assert_eq!(Config::load_or_default(None).unwrap(), Config::default());
    }
}
