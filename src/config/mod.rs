
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Supports `${ENV_VAR}` expansion; the default reads `GOOGLE_API_KEY`
    /// from the process environment at load time.
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle minutes before a session (image and transcript) is dropped.
    #[serde(default = "default_session_timeout")]
    pub timeout_minutes: u64,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8642
}
fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_api_key() -> String {
    "${GOOGLE_API_KEY}".to_string()
}
fn default_session_timeout() -> u64 {
    30
}
fn default_max_sessions() -> usize {
    100
}
fn default_max_image_bytes() -> usize {
    8 * 1024 * 1024
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: default_api_base(),
            api_key: default_api_key(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: default_session_timeout(),
            max_sessions: default_max_sessions(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Nutrify configuration

[server]
# Address and port for the web UI.
bind = "127.0.0.1"
port = 8642

[gemini]
# Model used for image analysis, meal suggestions and chat.
model = "gemini-1.5-flash"
api_base = "https://generativelanguage.googleapis.com/v1beta"
# "${GOOGLE_API_KEY}" is expanded from the environment at startup.
api_key = "${GOOGLE_API_KEY}"

[session]
# Idle minutes before a session's image and transcript are dropped.
timeout_minutes = 30
max_sessions = 100
max_image_bytes = 8388608

[logging]
# trace | debug | info | warn | error
level = "info"
"#;

impl Config {
    /// Loads the config file, creating a commented template on first run.
    /// `override_path` comes from `--config` / `NUTRIFY_CONFIG`.
    pub fn load(override_path: Option<&str>) -> Result<Self> {
        let path = match override_path {
            Some(p) => PathBuf::from(p),
            None => Self::config_path()?,
        };

        if !path.exists() {
            let config = Config::default().expanded();
            Self::save_template(&path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        let config = config.expanded();
        config.validate().context("Configuration validation failed")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gemini.model.trim().is_empty() {
            anyhow::bail!("gemini.model cannot be empty");
        }
        if self.session.max_sessions == 0 {
            anyhow::bail!("session.max_sessions must be at least 1");
        }
        if self.session.max_image_bytes == 0 {
            anyhow::bail!("session.max_image_bytes must be at least 1");
        }
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;

        Ok(base.home_dir().join(".nutrify").join("config.toml"))
    }

    fn save_template(path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
        eprintln!("Created default config at {}", path.display());

        Ok(())
    }

    /// Expands `${ENV_VAR}` references in the API key.
    fn expanded(mut self) -> Self {
        self.gemini.api_key = expand_env(&self.gemini.api_key);
        self
    }
}

fn expand_env(s: &str) -> String {
    if let Some(var_name) = s.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        std::env::var(var_name).unwrap_or_else(|_| s.to_string())
    } else {
        s.to_string()
    }
}
