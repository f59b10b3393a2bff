use crate::matcher::{MatchAlgorithm, MatchOptions};
use crate::pipeline::PipelineOptions;
use crate::suggest::DEFAULT_SUGGEST_THRESHOLD;
use crate::transform::Transformer;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings read from ~/.whisper-vocab.toml; missing sections take defaults
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Word-correction matching
    pub matching: MatchingConfig,
    /// Vocabulary suggestions
    pub suggest: SuggestConfig,
    /// Per-user vocabulary storage
    pub store: StoreConfig,
    /// External grammar corrector
    pub grammar: GrammarConfig,
    /// Grammar → transformation pipeline
    pub pipeline: PipelineOptions,
    /// Logging
    pub telemetry: TelemetryConfig,
}

/// `[matching]` section
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MatchingConfig {
    /// Scoring function for fuzzy lookups
    pub algorithm: MatchAlgorithm,
    /// Highest accepted match distance (inclusive)
    pub threshold: f64,
    /// Shortest key or word taking part in fuzzy lookups
    pub min_key_length: usize,
    /// Largest length difference, relative to the longer word
    pub max_length_ratio: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let options = MatchOptions::default();
        Self {
            algorithm: MatchAlgorithm::default(),
            threshold: options.threshold,
            min_key_length: options.min_key_length,
            max_length_ratio: options.max_length_ratio,
        }
    }
}

impl MatchingConfig {
    /// Matching options for [`crate::matcher::FuzzyIndex`]
    pub const fn options(&self) -> MatchOptions {
        MatchOptions {
            threshold: self.threshold,
            min_key_length: self.min_key_length,
            max_length_ratio: self.max_length_ratio,
        }
    }

    /// Transformation engine configured from this section
    pub const fn transformer(&self) -> Transformer {
        Transformer::new(self.algorithm, self.options())
    }
}

/// `[suggest]` section
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SuggestConfig {
    /// Highest accepted suggestion distance
    pub threshold: f64,
    /// Default number of suggestions
    pub limit: usize,
    /// JSON array of vocabulary words
    pub vocab_path: String,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SUGGEST_THRESHOLD,
            limit: 5,
            vocab_path: "~/.whisper-vocab/vocab.json".to_owned(),
        }
    }
}

/// `[store]` section
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one JSON document per user
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "~/.whisper-vocab/users".to_owned(),
        }
    }
}

/// `[grammar]` section
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GrammarConfig {
    /// Program and arguments; empty disables grammar correction
    pub command: Vec<String>,
}

/// `[telemetry]` section
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Log to `log_path` instead of stderr
    pub enabled: bool,
    /// Log file, `~` expanded
    pub log_path: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: "~/.whisper-vocab/whisper-vocab.log".to_owned(),
        }
    }
}

const DEFAULT_CONFIG: &str = r#"[matching]
algorithm = "levenshtein"
threshold = 0.2
min_key_length = 2
max_length_ratio = 0.2

[suggest]
threshold = 0.3
limit = 5
vocab_path = "~/.whisper-vocab/vocab.json"

[store]
path = "~/.whisper-vocab/users"

[grammar]
# e.g. ["my-grammar-tool", "--json"]; the prompt is appended as last argument
command = []

[pipeline]
transform_on_grammar_failure = true

[telemetry]
enabled = false
log_path = "~/.whisper-vocab/whisper-vocab.log"
"#;

impl Config {
    /// Load config from ~/.whisper-vocab.toml
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default(&config_path).context("failed to create default config")?;
        }

        Self::load_from(&config_path)
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let config: Self = toml::from_str(&contents).context("failed to parse config TOML")?;

        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".whisper-vocab.toml"))
    }

    fn create_default(path: &Path) -> Result<()> {
        fs::write(path, DEFAULT_CONFIG).context("failed to write default config")?;
        Ok(())
    }

    /// Expand ~ in paths to home directory
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }
}
