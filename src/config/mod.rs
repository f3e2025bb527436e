//! Configuration loading.
//!
//! JSON5 config with `${ENV_VAR}` substitution. Path resolution priority:
//! `ROLLCALL_CONFIG_PATH` > `ROLLCALL_STATE_DIR/rollcall.json5` >
//! `~/.rollcall/rollcall.json5`, falling back to the `.json` extension when
//! the `.json5` file doesn't exist.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::channels::discord::DISCORD_DEFAULT_API_BASE_URL;
use crate::channels::discord_gateway::DEFAULT_DISCORD_GATEWAY_URL;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Failed to read config file {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Missing environment variable: {var}")]
    MissingEnvVar { var: String },

    #[error("Missing required setting: {field}")]
    MissingField { field: &'static str },
}

/// Top-level configuration. Every section has production defaults so an
/// absent config file still yields a usable structure (the Discord ids
/// are validated separately at startup).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub discord: DiscordConfig,
    pub http: HttpConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscordConfig {
    /// Bot token. Falls back to the `TOKEN` env var.
    pub token: Option<String>,
    /// Application (client) ID. Falls back to the `CLIENT_ID` env var.
    pub client_id: Option<String>,
    /// The one guild commands are accepted from.
    pub guild_id: String,
    /// The one channel within the guild commands are accepted from.
    pub channel_id: String,
    pub gateway_url: String,
    pub api_base_url: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            client_id: None,
            guild_id: String::new(),
            channel_id: String::new(),
            gateway_url: DEFAULT_DISCORD_GATEWAY_URL.to_string(),
            api_base_url: DISCORD_DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

/// Fully-resolved Discord settings, produced once at startup after env
/// fallbacks and presence checks.
#[derive(Debug, Clone)]
pub struct ResolvedDiscord {
    pub token: String,
    pub client_id: String,
    pub guild_id: String,
    pub channel_id: String,
    pub gateway_url: String,
    pub api_base_url: String,
}

impl DiscordConfig {
    /// Apply env fallbacks and require the fields the bot cannot run
    /// without.
    pub fn resolve(&self) -> Result<ResolvedDiscord, ConfigError> {
        let token = non_empty(self.token.clone())
            .or_else(|| env::var("TOKEN").ok())
            .ok_or(ConfigError::MissingField {
                field: "discord.token (or TOKEN env var)",
            })?;
        let client_id = non_empty(self.client_id.clone())
            .or_else(|| env::var("CLIENT_ID").ok())
            .ok_or(ConfigError::MissingField {
                field: "discord.clientId (or CLIENT_ID env var)",
            })?;
        if self.guild_id.is_empty() {
            return Err(ConfigError::MissingField {
                field: "discord.guildId",
            });
        }
        if self.channel_id.is_empty() {
            return Err(ConfigError::MissingField {
                field: "discord.channelId",
            });
        }

        Ok(ResolvedDiscord {
            token,
            client_id,
            guild_id: self.guild_id.clone(),
            channel_id: self.channel_id.clone(),
            gateway_url: self.gateway_url.clone(),
            api_base_url: self.api_base_url.clone(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpConfig {
    /// Liveness server port.
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl HttpConfig {
    /// The `PORT` env var (hosting platform convention) wins over config.
    pub fn resolved_port(&self) -> u16 {
        env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(self.port)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Attendance file path. Defaults to `<state dir>/attendance.json`.
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn attendance_path(&self, state_dir: &Path) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| state_dir.join("attendance.json"))
    }
}

/// Get the state directory.
/// Priority: `ROLLCALL_STATE_DIR` > `~/.rollcall`.
pub fn resolve_state_dir() -> PathBuf {
    if let Ok(dir) = env::var("ROLLCALL_STATE_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rollcall")
}

/// Get the config file path.
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = env::var("ROLLCALL_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    let base = resolve_state_dir();
    let json5 = base.join("rollcall.json5");
    if json5.exists() {
        return json5;
    }
    base.join("rollcall.json")
}

/// Load and parse the configuration file.
/// Returns the default config if the file doesn't exist.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load config from an explicit path.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let substituted = substitute_env_vars(&content)?;

    json5::from_str(&substituted).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static pattern"));

/// Replace `${VAR}` references with environment variable values. A
/// referenced variable that is not set is an error, not an empty string.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing: Option<String> = None;
    let result = ENV_VAR_PATTERN.replace_all(content, |caps: &regex::Captures| {
        match env::var(&caps[1]) {
            Ok(value) => value,
            Err(_) => {
                if missing.is_none() {
                    missing = Some(caps[1].to_string());
                }
                String::new()
            }
        }
    });

    match missing {
        Some(var) => Err(ConfigError::MissingEnvVar { var }),
        None => Ok(result.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("rollcall.json5");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.json5")).unwrap();
        assert_eq!(cfg.http.port, 3000);
        assert_eq!(cfg.discord.api_base_url, DISCORD_DEFAULT_API_BASE_URL);
        assert_eq!(cfg.discord.gateway_url, DEFAULT_DISCORD_GATEWAY_URL);
    }

    #[test]
    fn test_parse_json5_with_comments() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{
                // attendance bot settings
                discord: { guildId: "g1", channelId: "c1" },
                http: { port: 8080 },
            }"#,
        );
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.discord.guild_id, "g1");
        assert_eq!(cfg.discord.channel_id, "c1");
        assert_eq!(cfg.http.port, 8080);
    }

    #[test]
    fn test_malformed_config_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "{ discord: ");
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("rollcall.json5"));
    }

    #[test]
    fn test_env_var_substitution() {
        env::set_var("ROLLCALL_TEST_GUILD", "guild-from-env");
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{ discord: { guildId: "${ROLLCALL_TEST_GUILD}", channelId: "c1" } }"#,
        );
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.discord.guild_id, "guild-from-env");
        env::remove_var("ROLLCALL_TEST_GUILD");
    }

    #[test]
    fn test_missing_env_var_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{ discord: { token: "${ROLLCALL_TEST_UNSET_VAR}" } }"#,
        );
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar { .. }));
    }

    #[test]
    fn test_resolve_requires_guild_and_channel() {
        let cfg = DiscordConfig {
            token: Some("t".to_string()),
            client_id: Some("c".to_string()),
            ..Default::default()
        };
        let err = cfg.resolve().unwrap_err();
        assert!(err.to_string().contains("guildId"));
    }

    #[test]
    fn test_resolve_with_all_fields() {
        let cfg = DiscordConfig {
            token: Some("t".to_string()),
            client_id: Some("42".to_string()),
            guild_id: "g1".to_string(),
            channel_id: "c1".to_string(),
            ..Default::default()
        };
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.token, "t");
        assert_eq!(resolved.client_id, "42");
    }

    #[test]
    fn test_attendance_path_default_and_override() {
        let storage = StorageConfig::default();
        assert_eq!(
            storage.attendance_path(Path::new("/state")),
            PathBuf::from("/state/attendance.json")
        );

        let storage = StorageConfig {
            path: Some(PathBuf::from("/elsewhere/data.json")),
        };
        assert_eq!(
            storage.attendance_path(Path::new("/state")),
            PathBuf::from("/elsewhere/data.json")
        );
    }
}
