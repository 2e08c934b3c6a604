//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/maildigest/config.toml` by default. Every value is optional;
//! environment variables take precedence over the file (see
//! [`crate::settings`]).
//!
//! Credential values (`client_id`, `tenant_id`, `api_key`) support secret
//! references:
//! - `pass::path/in/store`: resolved via `pass show`
//! - `env::VAR_NAME`: resolved from the environment
//! - plain text: used as-is

use std::path::{Path, PathBuf};

use maildigest_core::{EmailFormat, ReplyLinkMode, WindowTimezone};
use serde::{Deserialize, Serialize};

/// Configuration for the maildigest client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Microsoft identity platform settings.
    pub azure: AzureSettings,

    /// OpenAI settings.
    pub openai: OpenAiSettings,

    /// Sender, recipient and digest layout.
    pub mail: MailSettings,

    /// Token cache location.
    pub cache: CacheSettings,

    /// Morning/afternoon window boundaries.
    pub window: WindowSettings,

    /// Lock and log locations.
    pub runner: RunnerSettings,
}

/// Azure app registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureSettings {
    /// Application (client) ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// Directory (tenant) ID (supports `pass::` and `env::` prefixes).
    pub tenant_id: Option<String>,

    /// Identity platform host, e.g. for sovereign clouds.
    pub authority_host: Option<String>,

    /// Graph API base URL.
    pub graph_base: Option<String>,

    /// HTTP timeout in seconds.
    pub timeout: Option<u64>,
}

/// OpenAI API access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    /// API key (supports `pass::` and `env::` prefixes).
    pub api_key: Option<String>,

    /// Model name.
    pub model: Option<String>,

    /// API base URL (Azure OpenAI or a proxy).
    pub base_url: Option<String>,

    /// HTTP timeout in seconds.
    pub timeout: Option<u64>,
}

/// Digest addressing and layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// Mailbox owner; its local part is the last-resort profile name.
    pub from_email: Option<String>,

    /// Digest recipient.
    pub to_email: Option<String>,

    /// Reply button link style.
    pub reply_link_mode: Option<ReplyLinkMode>,

    /// HTML layout.
    pub email_format: Option<EmailFormat>,
}

/// Where OAuth tokens are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Directory holding `msal_token_cache_<profile>.bin`.
    pub dir: Option<PathBuf>,

    /// Explicit token file, overriding the per-profile name.
    pub file: Option<PathBuf>,
}

/// Window boundary settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub split_hour: Option<u32>,
    pub close_hour: Option<u32>,
    pub timezone: Option<WindowTimezone>,
}

/// Runner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Directory for the run lock.
    pub state_dir: Option<PathBuf>,

    /// Directory for `cron_<window>.log`.
    pub log_dir: Option<PathBuf>,

    /// Whether `run` takes the per-profile lock.
    pub lock: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            state_dir: None,
            log_dir: None,
            lock: true,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("maildigest")
    }

    /// Returns the default state directory (run locks).
    pub fn default_state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join("maildigest")
    }
}

/// Persists the Azure identifiers under `[azure]`, keeping the rest of the
/// file (comments and formatting included) intact.
pub fn save_azure_ids(path: &Path, client_id: &str, tenant_id: &str) -> Result<(), String> {
    let content = if path.exists() {
        std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| format!("could not parse {} for writing: {}", path.display(), e))?;

    if !doc.contains_key("azure") {
        doc["azure"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let azure = doc["azure"]
        .as_table_mut()
        .ok_or_else(|| "[azure] in config.toml is not a table".to_string())?;
    azure["client_id"] = toml_edit::value(client_id);
    azure["tenant_id"] = toml_edit::value(tenant_id);

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("could not create config directory {}: {}", parent.display(), e))?;
    }

    std::fs::write(path, doc.to_string()).map_err(|e| format!("could not save {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert!(config.azure.client_id.is_none());
        assert!(config.runner.lock);
        assert!(config.window.timezone.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml_content = r#"
[azure]
client_id = "env::AZURE_CLIENT_ID"
tenant_id = "common"

[openai]
api_key = "pass::openai/api-key"
model = "gpt-4.1"

[mail]
to_email = "me@example.com"
reply_link_mode = "gmail"
email_format = "windows"

[cache]
dir = "/etc/secrets"

[window]
split_hour = 8
close_hour = 15
timezone = "local"

[runner]
log_dir = "/var/log/maildigest"
lock = false
"#;
        let config: ClientConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.azure.client_id.as_deref(), Some("env::AZURE_CLIENT_ID"));
        assert_eq!(config.openai.model.as_deref(), Some("gpt-4.1"));
        assert_eq!(config.mail.reply_link_mode, Some(ReplyLinkMode::Gmail));
        assert_eq!(config.mail.email_format, Some(EmailFormat::Windows));
        assert_eq!(config.cache.dir, Some(PathBuf::from("/etc/secrets")));
        assert_eq!(config.window.split_hour, Some(8));
        assert_eq!(config.window.timezone, Some(WindowTimezone::Local));
        assert!(!config.runner.lock);
    }

    #[test]
    fn unknown_link_mode_is_rejected() {
        let result: Result<ClientConfig, _> = toml::from_str("[mail]\nreply_link_mode = \"carrier_pigeon\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn save_azure_ids_preserves_existing_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "# my settings\n[mail]\nto_email = \"me@example.com\"\n").unwrap();

        save_azure_ids(&path, "client-123", "tenant-456").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# my settings"));
        let reloaded: ClientConfig = toml::from_str(&content).unwrap();
        assert_eq!(reloaded.azure.client_id.as_deref(), Some("client-123"));
        assert_eq!(reloaded.azure.tenant_id.as_deref(), Some("tenant-456"));
        assert_eq!(reloaded.mail.to_email.as_deref(), Some("me@example.com"));
    }

    #[test]
    fn save_azure_ids_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/config.toml");
        save_azure_ids(&path, "c", "t").unwrap();
        let reloaded = ClientConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.azure.tenant_id.as_deref(), Some("t"));
    }
}
