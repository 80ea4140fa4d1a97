use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shroud_pii::{AnonymizationEngine, DetectorConfig, GazetteerConfig, GazetteerRecognizer};
use shroud_session::SessionKey;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShroudConfig {
    #[serde(default)]
    pub detection: DetectorConfig,

    #[serde(default)]
    pub entities: GazetteerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_sessions_dir")]
    pub directory: String,

    /// Base64 AES-256 key; without one, sessions cannot be persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Highlight restored originals when reverting
    #[serde(default = "default_false")]
    pub highlight: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            directory: default_sessions_dir(),
            key: None,
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("directory", &self.directory)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ShroudConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("SHROUD_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("SHROUD_SESSIONS_DIR") {
            self.session.directory = val;
        }

        if let Ok(val) = std::env::var("SHROUD_SESSION_KEY") {
            self.session.key = Some(val);
        }

        if let Ok(val) = std::env::var("SHROUD_HIGHLIGHT") {
            if let Ok(enabled) = val.parse::<bool>() {
                self.output.highlight = enabled;
            }
        }
    }

    /// Session directory with `~` expanded
    pub fn sessions_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.session.directory).to_string())
    }

    pub fn session_key(&self) -> Result<Option<SessionKey>> {
        self.session
            .key
            .as_deref()
            .map(|encoded| SessionKey::from_base64(encoded).context("Invalid session key"))
            .transpose()
    }

    /// Engine for the configured patterns, with the gazetteer enabled when it
    /// has entries
    pub fn build_engine(&self) -> Result<AnonymizationEngine> {
        let engine = AnonymizationEngine::new(self.detection.clone())
            .context("Invalid detection configuration")?;

        if self.entities.entries.is_empty() {
            return Ok(engine);
        }

        let recognizer = GazetteerRecognizer::new(self.entities.clone())
            .context("Invalid entities configuration")?;
        Ok(engine.with_recognizer(Arc::new(recognizer)))
    }
}

fn default_sessions_dir() -> String {
    "~/.shroud/sessions".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_false() -> bool {
    false
}
