use rehearse_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default Ollama API base URL
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default Ollama model for partner turns
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Configuration as stored in TOML files (with optional fields for merging)
///
/// Engine sections (`[phases]`, `[scoring]`, ...) are kept as a raw table so
/// a project file can override a single threshold without restating the rest.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRehearseConfig {
    #[serde(default)]
    pub generator: RawGeneratorConfig,

    #[serde(default)]
    pub storage: RawStorageConfig,

    #[serde(flatten)]
    pub engine: toml::Table,
}

/// Generator section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawGeneratorConfig {
    pub kind: Option<GeneratorKind>,
    pub host: Option<String>,
    pub model: Option<String>,
}

/// Storage section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStorageConfig {
    pub data_dir: Option<PathBuf>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RehearseConfig {
    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(flatten)]
    pub engine: EngineConfig,
}

/// Which dialogue generator drives the partner side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    /// Local Ollama server
    Ollama,
    /// Scripted lines, no network
    #[default]
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratorConfig {
    pub kind: GeneratorKind,

    /// Ollama base URL
    pub host: String,

    /// Ollama model name
    pub model: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            kind: GeneratorKind::default(),
            host: DEFAULT_OLLAMA_HOST.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Directory holding one JSON file per session
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Platform data directory, or `.rehearse/data` when there is none
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("rehearse"))
        .unwrap_or_else(|| PathBuf::from(".rehearse/data"))
}
