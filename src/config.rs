use crate::llm::SessionParams;
use crate::safety::SafetyPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-1.0-pro-001";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
const CONFIG_FILE: &str = "config.toml";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model name as used in the API path
    pub model: String,

    /// API root, without a trailing slash
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Per-request timeout; unset means wait indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Sampling parameters
    pub generation: GenerationConfig,

    /// Block threshold per harm category
    pub safety: SafetyPolicy,

    /// UI preferences
    pub ui: UiConfig,

    /// Directory holding the config file and the log
    #[serde(skip)]
    pub home: PathBuf,
}

/// Sampling parameters passed through to the model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Warn once a session rebuild replays more messages than this
    pub replay_warn_threshold: usize,
    /// chrono format string for message timestamps
    pub timestamp_format: String,
    /// Redraw interval in milliseconds
    pub tick_rate_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            top_k: 1,
            top_p: 1.0,
            max_output_tokens: 2048,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            replay_warn_threshold: 200,
            timestamp_format: "%H:%M:%S".to_string(),
            tick_rate_ms: 250,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: None,
            generation: GenerationConfig::default(),
            safety: SafetyPolicy::default(),
            ui: UiConfig::default(),
            home: home.join(".gemini-chat"),
        }
    }
}

/// API credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

impl Config {
    /// Default location of the gemini-chat directory
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".gemini-chat"))
    }

    /// Path of the config file inside `home`
    pub fn default_path(home: &Path) -> PathBuf {
        home.join(CONFIG_FILE)
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let home = Self::home_dir()?;
        fs::create_dir_all(&home).context("Failed to create .gemini-chat directory")?;

        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Self::default_path(&home);
                if default_path.exists() {
                    Self::load_from(&default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.home = home;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without touching the home directory
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Reject values the API would refuse anyway
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.model.trim().is_empty(), "model must not be empty");
        anyhow::ensure!(!self.base_url.trim().is_empty(), "base_url must not be empty");
        anyhow::ensure!(
            (0.0..=2.0).contains(&self.generation.temperature),
            "generation.temperature must be within 0.0..=2.0 (got {})",
            self.generation.temperature
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.generation.top_p),
            "generation.top_p must be within 0.0..=1.0 (got {})",
            self.generation.top_p
        );
        anyhow::ensure!(self.generation.top_k >= 1, "generation.top_k must be at least 1");
        anyhow::ensure!(
            self.generation.max_output_tokens >= 1,
            "generation.max_output_tokens must be at least 1"
        );
        Ok(())
    }

    /// Look up the API key through `lookup` (normally the process environment)
    pub fn api_key_with<F>(&self, lookup: F) -> Option<ApiKey>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        lookup(&self.api_key_env)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(ApiKey::new)
    }

    /// Read the API key from the process environment
    pub fn api_key(&self) -> Option<ApiKey> {
        self.api_key_with(|name| std::env::var(name).ok())
    }

    /// Parameters every session is created with
    pub fn session_params(&self) -> SessionParams {
        SessionParams {
            generation: self.generation,
            safety: self.safety,
        }
    }

    /// Log file location
    pub fn log_path(&self) -> PathBuf {
        self.home.join("gemini-chat.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::HarmBlockThreshold;
    use std::io::Write;

    #[test]
    fn defaults_follow_the_hosted_chat() {
        let config = Config::default();
        assert_eq!(config.model, "gemini-1.0-pro-001");
        assert_eq!(config.generation.temperature, 0.9);
        assert_eq!(config.generation.top_k, 1);
        assert_eq!(config.generation.top_p, 1.0);
        assert_eq!(config.generation.max_output_tokens, 2048);
        assert_eq!(config.safety, SafetyPolicy::uniform(HarmBlockThreshold::BlockMediumAndAbove));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "model = \"gemini-1.5-flash\"\n\n[generation]\ntemperature = 0.2\n\n[safety]\nhate_speech = \"BLOCK_ONLY_HIGH\""
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.generation.temperature, 0.2);
        assert_eq!(config.generation.max_output_tokens, 2048);
        assert_eq!(config.safety.hate_speech, HarmBlockThreshold::BlockOnlyHigh);
        assert_eq!(config.safety.harassment, HarmBlockThreshold::BlockMediumAndAbove);
        assert_eq!(config.ui.timestamp_format, "%H:%M:%S");
    }

    #[test]
    fn save_then_load_preserves_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.timeout_secs = Some(30);
        config.safety.dangerous_content = HarmBlockThreshold::BlockLowAndAbove;
        config.save(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.timeout_secs, Some(30));
        assert_eq!(loaded.safety, config.safety);
    }

    #[test]
    fn written_defaults_read_as_typed() {
        let rendered = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(rendered.contains("temperature = 0.9\n"), "{rendered}");
        assert!(rendered.contains("top_p = 1.0\n"), "{rendered}");
    }

    #[test]
    fn invalid_sampling_values_are_rejected() {
        let mut config = Config::default();
        config.generation.top_p = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generation.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn api_key_comes_from_the_named_variable() {
        let config = Config::default();
        let key = config.api_key_with(|name| {
            assert_eq!(name, "GEMINI_API_KEY");
            Some(" secret ".to_string())
        });
        assert_eq!(key.as_ref().map(ApiKey::expose), Some("secret"));
        assert_eq!(format!("{:?}", key.unwrap()), "ApiKey([REDACTED])");

        assert!(config.api_key_with(|_| Some("   ".to_string())).is_none());
        assert!(config.api_key_with(|_| None).is_none());
    }
}
