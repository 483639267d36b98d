use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::llm::{ProviderType, RetryPolicy};

pub const CONFIG_FILE_NAME: &str = "catalog-agent.toml";
pub const DEFAULT_GOOGLE_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderType,
    pub model: String,
    pub api_base: Option<String>,
    /// Only read from the environment; never written back to disk.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub db_path: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub max_tool_rounds: usize,
    pub retry: RetryPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::Google,
            model: DEFAULT_GOOGLE_MODEL.to_string(),
            api_base: None,
            api_key: None,
            db_path: PathBuf::from("my_database.db"),
            log_dir: None,
            request_timeout_secs: 30,
            max_tool_rounds: 10,
            retry: RetryPolicy::default(),
        }
    }
}

/// Values given on the command line. They win over every other layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub model: Option<String>,
    pub provider: Option<String>,
}

impl AppConfig {
    /// Build the effective configuration: defaults, then the TOML file, then
    /// `.env` and the process environment, then command-line flags.
    pub fn load(overrides: &CliOverrides) -> Result<Self> {
        let dotenv_path = dotenvy::dotenv().ok();

        let explicit = overrides
            .config_path
            .clone()
            .or_else(|| std::env::var_os("CATALOG_AGENT_CONFIG").map(PathBuf::from));

        let mut config = match &explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(CONFIG_FILE_NAME).exists() => Self::from_file(Path::new(CONFIG_FILE_NAME))?,
            None => Self::default(),
        };

        if let Some(path) = dotenv_path {
            info!("Loaded environment from {}", path.display());
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply environment variables through `get` so tests can supply a fake environment.
    pub fn apply_env<F>(&mut self, get: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = get("CATALOG_PROVIDER") {
            self.set_provider(&provider)?;
        }
        if let Some(model) = get("CATALOG_MODEL") {
            self.model = model;
        }
        if let Some(base) = get("CATALOG_API_BASE") {
            self.api_base = Some(base);
        }
        if let Some(db) = get("CATALOG_DB_PATH") {
            self.db_path = PathBuf::from(db);
        }
        if let Some(key) = get(self.api_key_env_var()).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &CliOverrides) -> Result<()> {
        if let Some(provider) = &overrides.provider {
            self.set_provider(provider)?;
        }
        if let Some(model) = &overrides.model {
            self.model = model.clone();
        }
        if let Some(db) = &overrides.db_path {
            self.db_path = db.clone();
        }
        Ok(())
    }

    // Switching provider also swaps the default model if it was left untouched.
    fn set_provider(&mut self, raw: &str) -> Result<()> {
        let provider: ProviderType = raw.parse()?;
        if provider != self.provider {
            let untouched = self.model == default_model(self.provider);
            self.provider = provider;
            if untouched {
                self.model = default_model(provider).to_string();
            }
        }
        Ok(())
    }

    pub fn api_key_env_var(&self) -> &'static str {
        match self.provider {
            ProviderType::Google => "GOOGLE_API_KEY",
            ProviderType::OpenAI => "OPENAI_API_KEY",
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Where the log file goes. Falls back to the platform data directory.
    pub fn resolved_log_dir(&self) -> Option<PathBuf> {
        self.log_dir
            .clone()
            .or_else(|| dirs::data_local_dir().map(|d| d.join("catalog-agent")))
    }
}

fn default_model(provider: ProviderType) -> &'static str {
    match provider {
        ProviderType::Google => DEFAULT_GOOGLE_MODEL,
        ProviderType::OpenAI => DEFAULT_OPENAI_MODEL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_demo_store() {
        let config = AppConfig::default();
        assert_eq!(config.provider, ProviderType::Google);
        assert_eq!(config.model, DEFAULT_GOOGLE_MODEL);
        assert_eq!(config.db_path, PathBuf::from("my_database.db"));
        assert_eq!(config.max_tool_rounds, 10);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn toml_layer_fills_only_given_keys() {
        let config = AppConfig::from_toml(
            r#"
            db_path = "/var/lib/store/catalog.db"
            request_timeout_secs = 12

            [retry]
            max_retries = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/store/catalog.db"));
        assert_eq!(config.request_timeout_secs, 12);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_backoff_ms, 500);
        assert_eq!(config.model, DEFAULT_GOOGLE_MODEL);
    }

    #[test]
    fn toml_rejects_unknown_provider() {
        assert!(AppConfig::from_toml(r#"provider = "zai""#).is_err());
    }

    #[test]
    fn env_layer_reads_key_for_active_provider() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("GOOGLE_API_KEY", "g-key"),
                ("OPENAI_API_KEY", "o-key"),
                ("CATALOG_DB_PATH", "shop.db"),
            ]))
            .unwrap();
        assert_eq!(config.api_key(), Some("g-key"));
        assert_eq!(config.db_path, PathBuf::from("shop.db"));
    }

    #[test]
    fn switching_provider_swaps_default_model_and_key() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("CATALOG_PROVIDER", "openai"),
                ("GOOGLE_API_KEY", "g-key"),
                ("OPENAI_API_KEY", "o-key"),
            ]))
            .unwrap();
        assert_eq!(config.provider, ProviderType::OpenAI);
        assert_eq!(config.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.api_key(), Some("o-key"));
    }

    #[test]
    fn explicit_model_survives_provider_switch() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("CATALOG_MODEL", "custom-model")]))
            .unwrap();
        config
            .apply_overrides(&CliOverrides {
                provider: Some("openai".to_string()),
                ..CliOverrides::default()
            })
            .unwrap();
        assert_eq!(config.model, "custom-model");
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("GOOGLE_API_KEY", "  ")])).unwrap();
        assert!(config.api_key().is_none());
    }

    #[test]
    fn cli_overrides_win() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("CATALOG_DB_PATH", "env.db"), ("CATALOG_MODEL", "env-model")]))
            .unwrap();
        config
            .apply_overrides(&CliOverrides {
                db_path: Some(PathBuf::from("cli.db")),
                model: Some("cli-model".to_string()),
                ..CliOverrides::default()
            })
            .unwrap();
        assert_eq!(config.db_path, PathBuf::from("cli.db"));
        assert_eq!(config.model, "cli-model");
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "max_tool_rounds = 4\nprovider = \"openai\"\n").unwrap();
        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.max_tool_rounds, 4);
        assert_eq!(config.provider, ProviderType::OpenAI);
    }
}
