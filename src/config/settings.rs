use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::fields::{Field, ASSET_NAME_ID_DELIMITER};

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

const ENV_PREFIX: &str = "SENTRY2V1";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub preferences: ConfigStore,
    #[serde(default)]
    pub sentry: SentryConfig,
    #[serde(default)]
    pub versionone: VersionOneConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// `section.key` values taken from the environment at load time.
    #[serde(skip)]
    env_overrides: BTreeMap<String, String>,
}

/// Raw values of the declared fields, keyed by `Field::key`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ConfigStore {
    values: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SentryConfig {
    /// Raw `Cookie` header copied from a logged-in browser session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VersionOneConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl ConfigStore {
    pub fn get_raw_value(&self, field: Field) -> Option<&str> {
        self.values
            .get(field.key())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Asset fields resolve to the oid half of their `name |@| oid` pair.
    pub fn get_value(&self, field: Field) -> Option<&str> {
        let raw = self.get_raw_value(field)?;
        if field.is_asset() {
            return raw.split(ASSET_NAME_ID_DELIMITER).nth(1);
        }
        Some(raw)
    }

    pub fn set_value(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field.key().to_string(), value.into());
    }

    /// Declared fields that have no raw value yet.
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| self.get_raw_value(*field).is_none())
            .collect()
    }

    pub fn v1_base_url(&self) -> Option<&str> {
        self.get_value(Field::V1BaseUrl)
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Reads the TOML file (optional) and applies `SENTRY2V1_<SECTION>__<KEY>`
    /// environment overrides on top of it.
    pub fn load_from(path: &Path) -> Result<Self> {
        let env = ::config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__");
        Self::load_layered(path, env)
    }

    fn load_layered(path: &Path, env: ::config::Environment) -> Result<Self> {
        use ::config::Source;

        let env_overrides: BTreeMap<String, String> = env
            .collect()
            .context("Failed to read environment overrides")?
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();

        let layered = ::config::Config::builder()
            .add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut settings: Settings = layered
            .try_deserialize()
            .context("Failed to parse config file")?;
        settings.env_overrides = env_overrides;

        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Writes the settings. A value that still equals its environment
    /// override keeps whatever the file held before, so overrides are never
    /// persisted unless they were changed after loading.
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let mut document = toml::Value::try_from(self).context("Failed to serialize config")?;
        if !self.env_overrides.is_empty() {
            let stored: toml::Table = std::fs::read_to_string(config_path)
                .ok()
                .and_then(|content| toml::from_str(&content).ok())
                .unwrap_or_default();
            for (key, env_value) in &self.env_overrides {
                restore_stored_value(&mut document, &stored, key, env_value);
            }
        }

        let config_str = toml::to_string_pretty(&document).context("Failed to serialize config")?;

        std::fs::write(config_path, config_str).context("Failed to write config file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(config_path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(config_path, perms)?;
        }

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".sentry2v1"))
    }
}

fn restore_stored_value(document: &mut toml::Value, stored: &toml::Table, key: &str, env_value: &str) {
    let Some((section, name)) = key.split_once('.') else {
        return;
    };
    let Some(table) = document.get_mut(section).and_then(toml::Value::as_table_mut) else {
        return;
    };
    let unchanged = table.get(name).map(toml_text).as_deref() == Some(env_value);
    if !unchanged {
        return;
    }

    match stored.get(section).and_then(|previous| previous.get(name)) {
        Some(previous) => {
            table.insert(name.to_string(), previous.clone());
        }
        None => {
            table.remove(name);
        }
    }
}

fn toml_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Keeps the first and last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", head, tail)
}
