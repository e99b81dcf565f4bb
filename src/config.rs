use crate::types::LanguageCode;
use anyhow::{Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_BOT_TOKEN: &str = "BOT_TOKEN";
const ENV_BOT_PASSWORD: &str = "BOT_PASSWORD";

/// Contents of `config.toml`.
#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    /// Bot API token; `BOT_TOKEN` overrides it.
    #[serde(default)]
    pub tg_bot_token: String,
    /// Admin panel password; `BOT_PASSWORD` overrides it.
    #[serde(default)]
    pub admin_password: String,
    /// Language of every bot text.
    #[serde(default)]
    pub bot_lang: LanguageCode,
    /// SQLite file name next to the config file.
    #[serde(default = "default_db_name")]
    pub db_name: String,
    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub log_level: Option<String>,
    /// `[web]` section.
    #[serde(default)]
    pub web: WebConfig,
}

/// Contact intake HTTP server settings.
#[derive(Clone, Deserialize, Debug)]
pub struct WebConfig {
    /// Start the server at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Listen address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Prefix for every route, e.g. `/api`.
    #[serde(default)]
    pub root_path: String,
    /// Serve HTTPS with the cert and key below.
    #[serde(default)]
    pub ssl_enabled: bool,
    /// PEM certificate chain.
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub ssl_cert_path: Option<String>,
    /// PEM private key.
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub ssl_key_path: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
            root_path: String::new(),
            ssl_enabled: false,
            ssl_cert_path: None,
            ssl_key_path: None,
        }
    }
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

fn default_db_name() -> String {
    "bot.db".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
const fn default_port() -> u16 {
    3000
}
const fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Read the file, apply env overrides, then validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse without overrides or validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `BOT_TOKEN` and `BOT_PASSWORD` win over the file.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(ENV_BOT_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.tg_bot_token = token.trim().to_string();
        }
        if let Some(password) = lookup(ENV_BOT_PASSWORD).filter(|v| !v.is_empty()) {
            self.admin_password = password;
        }
    }

    /// Reject configs the bot cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.tg_bot_token.trim().is_empty() {
            bail!("tg_bot_token is empty (set it in the config or via {ENV_BOT_TOKEN})");
        }
        if self.admin_password.is_empty() {
            bail!("admin_password is empty (set it in the config or via {ENV_BOT_PASSWORD})");
        }
        if self.web.ssl_enabled
            && (self.web.ssl_cert_path.is_none() || self.web.ssl_key_path.is_none())
        {
            bail!("web.ssl_enabled requires web.ssl_cert_path and web.ssl_key_path");
        }
        Ok(())
    }

    /// Database file, relative to the config file's directory.
    pub fn get_db_path(&self, config_path: &Path) -> PathBuf {
        let parent = config_path.parent().unwrap_or_else(|| Path::new("."));
        parent.join(&self.db_name)
    }
}
