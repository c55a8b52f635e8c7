//! Engine configuration. Loaded from a JSON file; every section has defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Data directory (model artifacts, student store)
    pub data_dir: PathBuf,
    /// Model artifact locations and training schedules
    pub models: ModelsConfig,
    /// External content generator
    pub content: ContentConfig,
    /// Progress analytics constants
    pub analytics: AnalyticsConfig,
    /// SQLite student store; relative paths resolve under `data_dir`
    pub store_path: PathBuf,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub style_model_path: PathBuf,
    pub difficulty_model_path: PathBuf,
    /// Seed for weight initialization, dropout masks and shuffling
    pub seed: u64,
    /// Adam step size
    pub learning_rate: f32,
    pub style_training: TrainingSchedule,
    pub difficulty_training: TrainingSchedule,
}

/// Fields missing from a config file take the [`Default`] schedule's values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSchedule {
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of the dataset (taken from the end) held out for validation
    pub validation_split: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// OpenAI-compatible API base, e.g. https://api.openai.com/v1
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub expected_minutes_per_module: f64,
    pub reference_interactions_per_hour: f64,
    pub thresholds: ProgressThresholds,
}

/// Completion-rate cut-offs used by the recommendation and risk rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressThresholds {
    pub average: f64,
    pub needs_improvement: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("adaptive-engine"))
            .unwrap_or_else(|| PathBuf::from(".adaptive-engine"));
        Self {
            data_dir,
            models: ModelsConfig::default(),
            content: ContentConfig::default(),
            analytics: AnalyticsConfig::default(),
            store_path: PathBuf::from("students.db"),
            log: LogConfig::default(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            style_model_path: PathBuf::from("models/learning-style.json"),
            difficulty_model_path: PathBuf::from("models/difficulty.json"),
            seed: 42,
            learning_rate: 0.001,
            style_training: TrainingSchedule::default(),
            difficulty_training: TrainingSchedule {
                epochs: 100,
                batch_size: 16,
                validation_split: 0.2,
            },
        }
    }
}

impl Default for TrainingSchedule {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            validation_split: 0.2,
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            expected_minutes_per_module: 120.0,
            reference_interactions_per_hour: 50.0,
            thresholds: ProgressThresholds::default(),
        }
    }
}

impl Default for ProgressThresholds {
    fn default() -> Self {
        Self {
            average: 0.5,
            needs_improvement: 0.3,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Load from JSON file if present; otherwise return default. A file that cannot be
    /// read or parsed also yields the default, with a warning.
    pub fn load(path: &Path) -> Self {
        let (config, problem) = Self::load_reporting(path);
        if let Some(problem) = problem {
            warn!(path = %path.display(), error = %problem, "config not usable; using defaults");
        }
        config
    }

    /// Same as [`EngineConfig::load`], but returns the fallback reason instead of logging
    /// it, for callers that set up logging from the loaded config.
    pub fn load_reporting(path: &Path) -> (Self, Option<String>) {
        if !path.exists() {
            return (Self::default(), None);
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|data| serde_json::from_str::<EngineConfig>(&data).map_err(|e| e.to_string()));
        match parsed {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Resolve a configured path against `data_dir` unless it is absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    pub fn style_model_path(&self) -> PathBuf {
        self.resolve(&self.models.style_model_path)
    }

    pub fn difficulty_model_path(&self) -> PathBuf {
        self.resolve(&self.models.difficulty_model_path)
    }

    pub fn store_path(&self) -> PathBuf {
        self.resolve(&self.store_path)
    }
}
