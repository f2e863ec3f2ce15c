//! Global configuration loader for replydict.
//!
//! Reads `config.toml` from the data directory (`~/.replydict/` by default)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed, then applies environment overrides.

use std::path::{Path, PathBuf};

use replydict_types::config::GlobalConfig;

const CONFIG_FILE: &str = "config.toml";

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "REPLYDICT_DATA_DIR";
/// Overrides `mongo.uri`.
pub const MONGO_URI_ENV: &str = "REPLYDICT_MONGO_URI";
/// Overrides `mongo.database`.
pub const MONGO_DB_ENV: &str = "REPLYDICT_MONGO_DB";
/// Overrides `postgres.url`.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Resolve the data directory: `$REPLYDICT_DATA_DIR`, else `~/.replydict`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".replydict")
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, starts from [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and uses the default.
/// - Environment overrides are applied last in every case.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config = read_config_file(data_dir).await;
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

async fn read_config_file(data_dir: &Path) -> GlobalConfig {
    let path = data_dir.join(CONFIG_FILE);

    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file; built-in settings apply");
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "config file unreadable; built-in settings apply");
            return GlobalConfig::default();
        }
    };

    toml::from_str(&text).unwrap_or_else(|err: toml::de::Error| {
        tracing::warn!(path = %path.display(), error = %err.message(), "config file rejected; built-in settings apply");
        GlobalConfig::default()
    })
}

/// Replace connection settings with values found through `lookup`.
///
/// Empty values are ignored.
pub fn apply_env_overrides(
    mut config: GlobalConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> GlobalConfig {
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(uri) = get(MONGO_URI_ENV) {
        config.mongo.uri = uri;
    }
    if let Some(database) = get(MONGO_DB_ENV) {
        config.mongo.database = database;
    }
    if let Some(url) = get(DATABASE_URL_ENV) {
        config.postgres.url = url;
    }
    config
}
