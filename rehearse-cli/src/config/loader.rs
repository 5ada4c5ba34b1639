use super::types::{
    DEFAULT_OLLAMA_HOST, DEFAULT_OLLAMA_MODEL, GeneratorConfig, RawGeneratorConfig,
    RawRehearseConfig, RawStorageConfig, RehearseConfig, StorageConfig, default_data_dir,
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use rehearse_core::EngineConfig;
use std::path::{Path, PathBuf};

/// Env var that relocates the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "REHEARSE_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<RehearseConfig> {
        let mut raw = RawRehearseConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        Self::finalize(raw)
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "rehearse").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with REHEARSE_PROJECT_CONFIG_DIR (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        Self::project_config_path_from(std::env::var(PROJECT_CONFIG_DIR_ENV).ok())
    }

    fn project_config_path_from(dir: Option<String>) -> PathBuf {
        match dir {
            Some(dir) => PathBuf::from(dir).join("config.toml"),
            None => PathBuf::from(".rehearse/config.toml"),
        }
    }

    fn read_raw(path: &Path) -> Result<RawRehearseConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawRehearseConfig, overlay: RawRehearseConfig) -> RawRehearseConfig {
        let mut engine = base.engine;
        merge_tables(&mut engine, overlay.engine);

        RawRehearseConfig {
            generator: RawGeneratorConfig {
                kind: overlay.generator.kind.or(base.generator.kind),
                host: overlay.generator.host.or(base.generator.host),
                model: overlay.generator.model.or(base.generator.model),
            },
            storage: RawStorageConfig {
                data_dir: overlay.storage.data_dir.or(base.storage.data_dir),
            },
            engine,
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawRehearseConfig) -> Result<RehearseConfig> {
        let engine: EngineConfig = toml::Value::Table(raw.engine)
            .try_into()
            .context("Invalid engine configuration")?;
        engine
            .validate()
            .context("Invalid engine configuration")?;

        Ok(RehearseConfig {
            generator: GeneratorConfig {
                kind: raw.generator.kind.unwrap_or_default(),
                host: raw
                    .generator
                    .host
                    .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
                model: raw
                    .generator
                    .model
                    .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            },
            storage: StorageConfig {
                data_dir: raw.storage.data_dir.unwrap_or_else(default_data_dir),
            },
            engine,
        })
    }

    /// Load a single config file with defaults applied (for testing)
    #[cfg(test)]
    pub fn load_from_path(path: &Path) -> Result<RehearseConfig> {
        if path.exists() {
            Self::finalize(Self::read_raw(path)?)
        } else {
            Self::finalize(RawRehearseConfig::default())
        }
    }
}

/// Deep-merge `overlay` into `base`; nested tables merge key by key.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorKind;
    use rehearse_core::ConcurrencyPolicy;
    use rehearse_core::config::PhaseRule;
    use std::io::Write;
    use tempfile::TempDir;

    fn raw(toml_str: &str) -> RawRehearseConfig {
        toml::from_str(toml_str).unwrap()
    }

    // ==================== Load Tests ====================

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.toml");

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(config.generator.kind, GeneratorKind::Offline);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_load_from_valid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[generator]
kind = "ollama"
model = "phi3"

[storage]
data_dir = "/var/lib/rehearse"

[phases.practice]
min_exchanges = 3
max_exchanges = 6
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(config.generator.kind, GeneratorKind::Ollama);
        assert_eq!(config.generator.model, "phi3");
        assert_eq!(config.generator.host, DEFAULT_OLLAMA_HOST);
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/rehearse"));
        assert_eq!(config.engine.phases.practice, PhaseRule::new(3, 6));
        assert_eq!(config.engine.phases.intro, PhaseRule::new(1, 2));
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let result = ConfigLoader::load_from_path(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_rejects_mistyped_engine_value() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[concurrency]\npolicy = \"sometimes\"\n").unwrap();

        let result = ConfigLoader::load_from_path(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_rejects_advisor_level_outside_difficulty_range() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[advisor]\nmax_level = 8.0\n").unwrap();

        let err = ConfigLoader::load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("advisor levels"));
    }

    #[test]
    fn test_load_rejects_inverted_advisor_levels() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[advisor]\nmin_level = 4.0\nmax_level = 2.0\n").unwrap();

        assert!(ConfigLoader::load_from_path(&path).is_err());
    }

    // ==================== Merge Tests ====================

    #[test]
    fn test_merge_raw_overlay_overrides_base() {
        let base = raw(r#"
[generator]
kind = "ollama"
host = "http://base:11434"
model = "base-model"

[storage]
data_dir = "/base"
"#);
        let overlay = raw(r#"
[generator]
model = "overlay-model"

[storage]
data_dir = "/overlay"
"#);

        let merged = ConfigLoader::merge_raw(base, overlay);

        assert_eq!(merged.generator.kind, Some(GeneratorKind::Ollama));
        // overlay's None falls through to base value via .or()
        assert_eq!(merged.generator.host, Some("http://base:11434".to_string()));
        assert_eq!(merged.generator.model, Some("overlay-model".to_string()));
        assert_eq!(merged.storage.data_dir, Some(PathBuf::from("/overlay")));
    }

    #[test]
    fn test_merge_raw_engine_sections_merge_per_key() {
        let base = raw(r#"
[phases]
early_exit_score = 85

[phases.practice]
min_exchanges = 4
max_exchanges = 8

[concurrency]
policy = "queue"
"#);
        let overlay = raw(r#"
[phases.practice]
min_exchanges = 2
max_exchanges = 5
"#);

        let merged = ConfigLoader::merge_raw(base, overlay);
        let config = ConfigLoader::finalize(merged).unwrap();

        assert_eq!(config.engine.phases.practice, PhaseRule::new(2, 5));
        assert_eq!(config.engine.phases.early_exit_score, 85);
        assert_eq!(config.engine.concurrency.policy, ConcurrencyPolicy::Queue);
    }

    #[test]
    fn test_merge_raw_none_preserves_base() {
        let base = raw(r#"
[generator]
kind = "ollama"

[dialogue]
timeout_seconds = 5
"#);

        let merged = ConfigLoader::merge_raw(base, RawRehearseConfig::default());
        let config = ConfigLoader::finalize(merged).unwrap();

        assert_eq!(config.generator.kind, GeneratorKind::Ollama);
        assert_eq!(config.engine.dialogue.timeout_seconds, 5);
    }

    // ==================== Path Tests ====================

    #[test]
    fn test_user_config_path_returns_some() {
        let path = ConfigLoader::user_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("rehearse"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_project_config_path_default() {
        let path = ConfigLoader::project_config_path_from(None);
        assert_eq!(path, PathBuf::from(".rehearse/config.toml"));
    }

    #[test]
    fn test_project_config_path_override() {
        let path = ConfigLoader::project_config_path_from(Some("/tmp/e2e".to_string()));
        assert_eq!(path, PathBuf::from("/tmp/e2e/config.toml"));
    }
}
