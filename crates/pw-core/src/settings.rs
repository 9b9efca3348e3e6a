use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tokenizer::DEFAULT_UNIFYING_CHARS;

/// Matching options handed verbatim to the ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchOptions {
    pub unifying_chars: String,
    pub max_results: usize,
    pub exact_matches: usize,
    pub look_ahead: usize,
    pub fuzzy_cutoff: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            unifying_chars: DEFAULT_UNIFYING_CHARS.to_string(),
            max_results: 33,
            exact_matches: 2,
            look_ahead: 2,
            fuzzy_cutoff: 0.6,
        }
    }
}

/// Ranking weights handed verbatim to the ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Weights {
    pub prefix_matches: f64,
    pub edit_distance: f64,
    pub recency: f64,
    pub proximity: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            prefix_matches: 2.0,
            edit_distance: 1.5,
            recency: 1.0,
            proximity: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    /// SQLite location; `:memory:` keeps the index in process memory.
    pub location: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            location: ":memory:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    #[serde(rename = "match")]
    pub match_options: MatchOptions,
    pub weights: Weights,
    pub store: StoreSettings,
}

#[derive(Debug)]
pub struct SettingsError(toml::de::Error);

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid settings: {}", self.0)
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl Settings {
    /// Parse TOML settings. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        toml::from_str(content).map_err(SettingsError)
    }
}
