//! Effective settings: command line, then environment, then `config.toml`,
//! then defaults.
//!
//! Everything the providers and the runner need is resolved here once and
//! handed down as explicit configuration.

use std::path::PathBuf;
use std::time::Duration;

use maildigest_core::profile::{LEGACY_PROFILE_ENV, USER_PROFILE_ENV};
use maildigest_core::{
    DigestWindow, EmailFormat, ReplyLinkMode, UserProfile, WindowHours, WindowTimezone,
};
use maildigest_providers::microsoft::MicrosoftConfig;
use maildigest_providers::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiConfig};
use maildigest_providers::{CredentialStore, FileCredentialStore};
use maildigest_runner::{Delivery, RunConfig};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::secret;

/// Secret files directory on the hosting platform.
pub const HOSTED_CACHE_DIR: &str = "/etc/secrets";

/// Reads a process environment variable, treating blank values as unset.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// An empty environment.
#[cfg(test)]
pub(crate) fn no_env(_key: &str) -> Option<String> {
    None
}

/// Resolves the active profile: `--profile`, `USER_PROFILE`, `MSAL_PROFILE`,
/// then the local part of `FROM_EMAIL`.
pub fn resolve_profile<F>(flag: Option<&str>, config: &ClientConfig, env: &F) -> Option<UserProfile>
where
    F: Fn(&str) -> Option<String>,
{
    let explicit = flag.map(str::to_string).or_else(|| env(USER_PROFILE_ENV));
    let legacy = env(LEGACY_PROFILE_ENV);
    let from_email = env("FROM_EMAIL").or_else(|| config.mail.from_email.clone());
    UserProfile::resolve(explicit.as_deref(), legacy.as_deref(), from_email.as_deref())
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub profile: Option<UserProfile>,
    pub hosted: bool,

    pub azure_client_id: Option<String>,
    pub azure_tenant_id: Option<String>,
    pub authority_host: Option<String>,
    pub graph_base: Option<String>,
    pub azure_timeout: Duration,

    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub openai_timeout: Duration,

    pub from_email: Option<String>,
    pub to_email: Option<String>,
    pub link_mode: ReplyLinkMode,
    pub email_format: EmailFormat,

    pub cache_dir: PathBuf,
    pub cache_file: Option<PathBuf>,
    pub token_base64: Option<String>,

    pub hours: WindowHours,
    pub timezone: WindowTimezone,

    pub state_dir: PathBuf,
    pub log_dir: PathBuf,
    pub use_lock: bool,
}

impl Settings {
    /// Resolves settings against the process environment.
    pub fn from_process(config: &ClientConfig, profile_flag: Option<&str>, hosted: bool) -> ClientResult<Self> {
        Self::resolve(config, profile_flag, hosted, &process_env)
    }

    /// Resolves settings with `env` as the environment.
    pub fn resolve<F>(config: &ClientConfig, profile_flag: Option<&str>, hosted: bool, env: &F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hosted = hosted || env("RENDER").is_some();
        let profile = resolve_profile(profile_flag, config, env);

        let configured = |value: &Option<String>, what: &str| {
            secret::resolve_optional(value.as_deref())
                .map_err(|e| ClientError::Config(format!("failed to resolve {}: {}", what, e)))
        };

        let azure_client_id = match env("AZURE_CLIENT_ID") {
            Some(v) => Some(v),
            None => configured(&config.azure.client_id, "azure.client_id")?,
        };
        let azure_tenant_id = match env("AZURE_TENANT_ID") {
            Some(v) => Some(v),
            None => configured(&config.azure.tenant_id, "azure.tenant_id")?,
        };
        let openai_api_key = match env("OPENAI_API_KEY") {
            Some(v) => Some(v),
            None => configured(&config.openai.api_key, "openai.api_key")?,
        };

        let cache_dir = env("MSAL_CACHE_DIR")
            .map(PathBuf::from)
            .or_else(|| config.cache.dir.clone())
            .unwrap_or_else(|| {
                if hosted {
                    PathBuf::from(HOSTED_CACHE_DIR)
                } else {
                    PathBuf::from(".")
                }
            });

        let hours = WindowHours {
            split_hour: config.window.split_hour.unwrap_or(WindowHours::default().split_hour),
            close_hour: config.window.close_hour.unwrap_or(WindowHours::default().close_hour),
        };

        Ok(Self {
            profile,
            hosted,
            azure_client_id,
            azure_tenant_id,
            authority_host: config.azure.authority_host.clone(),
            graph_base: config.azure.graph_base.clone(),
            azure_timeout: Duration::from_secs(
                config.azure.timeout.unwrap_or(MicrosoftConfig::DEFAULT_TIMEOUT_SECS),
            ),
            openai_api_key,
            openai_model: env("OPENAI_MODEL")
                .or_else(|| config.openai.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai_base_url: env("OPENAI_BASE_URL")
                .or_else(|| config.openai.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            openai_timeout: Duration::from_secs(
                config.openai.timeout.unwrap_or(OpenAiConfig::DEFAULT_TIMEOUT_SECS),
            ),
            from_email: env("FROM_EMAIL").or_else(|| config.mail.from_email.clone()),
            to_email: env("TO_EMAIL").or_else(|| config.mail.to_email.clone()),
            link_mode: env("REPLY_LINK_MODE")
                .and_then(|v| v.parse().ok())
                .or(config.mail.reply_link_mode)
                .unwrap_or_default(),
            email_format: env("EMAIL_FORMAT")
                .and_then(|v| v.parse().ok())
                .or(config.mail.email_format)
                .unwrap_or_default(),
            cache_dir,
            cache_file: env("MSAL_CACHE_FILE")
                .map(PathBuf::from)
                .or_else(|| config.cache.file.clone()),
            token_base64: env("MSAL_TOKEN_CACHE_BASE64"),
            hours,
            timezone: config.window.timezone.unwrap_or_default(),
            state_dir: config
                .runner
                .state_dir
                .clone()
                .unwrap_or_else(ClientConfig::default_state_dir),
            log_dir: config.runner.log_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
            use_lock: config.runner.lock,
        })
    }

    /// Microsoft identity and Graph configuration.
    pub fn microsoft_config(&self) -> ClientResult<MicrosoftConfig> {
        let (Some(client_id), Some(tenant_id)) = (&self.azure_client_id, &self.azure_tenant_id) else {
            return Err(ClientError::Config(
                "Missing AZURE_TENANT_ID or AZURE_CLIENT_ID in environment".to_string(),
            ));
        };

        let mut config = MicrosoftConfig::new(client_id, tenant_id)
            .with_timeout(self.azure_timeout)
            .with_interactive(!self.hosted)
            .with_open_browser(!self.hosted);
        if let Some(ref host) = self.authority_host {
            config = config.with_authority_host(host);
        }
        if let Some(ref base) = self.graph_base {
            config = config.with_graph_base(base);
        }
        Ok(config)
    }

    /// OpenAI summarizer configuration.
    pub fn openai_config(&self) -> ClientResult<OpenAiConfig> {
        let api_key = self
            .openai_api_key
            .as_deref()
            .ok_or_else(|| ClientError::Config("Missing OPENAI_API_KEY".to_string()))?;
        Ok(OpenAiConfig::new(api_key)
            .with_model(&self.openai_model)
            .with_base_url(&self.openai_base_url)
            .with_timeout(self.openai_timeout))
    }

    /// Token store for this profile. Read-only when hosted.
    pub fn credential_store(&self) -> FileCredentialStore {
        FileCredentialStore::new(&self.cache_dir)
            .with_file_override(self.cache_file.clone())
            .with_base64_fallback(self.token_base64.clone())
            .read_only(self.hosted)
    }

    /// Where this profile's token lives.
    pub fn token_location(&self) -> PathBuf {
        self.credential_store().location(self.profile.as_ref())
    }

    /// Run configuration for `window`.
    pub fn run_config(&self, window: DigestWindow, delivery: Delivery, no_lock: bool) -> RunConfig {
        let mut config = RunConfig::new(window)
            .with_profile(self.profile.clone())
            .with_hours(self.hours)
            .with_timezone(self.timezone)
            .with_email_format(self.email_format)
            .with_link_mode(self.link_mode)
            .with_delivery(delivery)
            .with_state_dir(&self.state_dir)
            .with_lock(self.use_lock && !no_lock);
        if let Some(ref to) = self.to_email {
            config = config.with_recipient(to);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn resolve(config: &ClientConfig, flag: Option<&str>, hosted: bool, pairs: &[(&str, &str)]) -> Settings {
        Settings::resolve(config, flag, hosted, &env_of(pairs)).unwrap()
    }

    #[test]
    fn profile_precedence() {
        let config = ClientConfig::default();
        let env = env_of(&[("USER_PROFILE", "amr"), ("MSAL_PROFILE", "legacy"), ("FROM_EMAIL", "jane.doe@example.com")]);
        assert_eq!(resolve_profile(Some("cli"), &config, &env).unwrap().name(), "cli");
        assert_eq!(resolve_profile(None, &config, &env).unwrap().name(), "amr");

        let env = env_of(&[("MSAL_PROFILE", "legacy"), ("FROM_EMAIL", "jane.doe@example.com")]);
        assert_eq!(resolve_profile(None, &config, &env).unwrap().name(), "legacy");

        let env = env_of(&[("FROM_EMAIL", "jane.doe@example.com")]);
        assert_eq!(resolve_profile(None, &config, &env).unwrap().name(), "jane.doe");

        assert!(resolve_profile(None, &config, &env_of(&[])).is_none());
    }

    #[test]
    fn hosted_cache_location() {
        let settings = resolve(
            &ClientConfig::default(),
            None,
            false,
            &[("RENDER", "true"), ("MSAL_CACHE_DIR", "/etc/secrets"), ("USER_PROFILE", "jawad")],
        );
        assert!(settings.hosted);
        assert_eq!(settings.token_location(), Path::new("/etc/secrets/msal_token_cache_jawad.bin"));
    }

    #[test]
    fn hosted_defaults_to_secret_files_dir() {
        let settings = resolve(&ClientConfig::default(), Some("amr"), true, &[]);
        assert_eq!(settings.cache_dir, PathBuf::from(HOSTED_CACHE_DIR));

        let local = resolve(&ClientConfig::default(), Some("amr"), false, &[]);
        assert_eq!(local.cache_dir, PathBuf::from("."));
        assert!(!local.hosted);
    }

    #[test]
    fn explicit_cache_file_wins() {
        let settings = resolve(
            &ClientConfig::default(),
            Some("amr"),
            false,
            &[("MSAL_CACHE_FILE", "/tmp/token.bin")],
        );
        assert_eq!(settings.token_location(), PathBuf::from("/tmp/token.bin"));
    }

    #[test]
    fn environment_beats_config_file() {
        let mut config = ClientConfig::default();
        config.mail.to_email = Some("file@example.com".to_string());
        config.mail.reply_link_mode = Some(ReplyLinkMode::Gmail);
        config.openai.model = Some("gpt-4.1".to_string());

        let settings = resolve(&config, None, false, &[("TO_EMAIL", "env@example.com")]);
        assert_eq!(settings.to_email.as_deref(), Some("env@example.com"));
        assert_eq!(settings.link_mode, ReplyLinkMode::Gmail);
        assert_eq!(settings.openai_model, "gpt-4.1");

        let settings = resolve(&config, None, false, &[("REPLY_LINK_MODE", "outlook_live"), ("OPENAI_MODEL", "o3")]);
        assert_eq!(settings.link_mode, ReplyLinkMode::OutlookLive);
        assert_eq!(settings.openai_model, "o3");
    }

    #[test]
    fn defaults() {
        let settings = resolve(&ClientConfig::default(), None, false, &[]);
        assert_eq!(settings.link_mode, ReplyLinkMode::OutlookOffice);
        assert_eq!(settings.email_format, EmailFormat::Modern);
        assert_eq!(settings.openai_model, "gpt-5");
        assert_eq!(settings.openai_timeout, Duration::from_secs(60));
        assert_eq!(settings.azure_timeout, Duration::from_secs(60));
        assert_eq!(settings.hours, WindowHours::default());
        assert!(settings.use_lock);
    }

    #[test]
    fn azure_ids_are_required() {
        let settings = resolve(&ClientConfig::default(), None, false, &[("AZURE_CLIENT_ID", "c")]);
        let err = settings.microsoft_config().unwrap_err();
        assert!(err.to_string().contains("Missing AZURE_TENANT_ID or AZURE_CLIENT_ID"));

        let settings = resolve(
            &ClientConfig::default(),
            None,
            true,
            &[("AZURE_CLIENT_ID", "c"), ("AZURE_TENANT_ID", "t")],
        );
        let ms = settings.microsoft_config().unwrap();
        assert_eq!(ms.client_id, "c");
        assert!(!ms.interactive);
    }

    #[test]
    fn config_secret_references_are_resolved() {
        unsafe {
            std::env::set_var("_MD_SETTINGS_TEST_KEY", "sk-from-env");
        }
        let mut config = ClientConfig::default();
        config.openai.api_key = Some("env::_MD_SETTINGS_TEST_KEY".to_string());

        let settings = resolve(&config, None, false, &[]);
        assert_eq!(settings.openai_config().unwrap().api_key, "sk-from-env");

        unsafe {
            std::env::remove_var("_MD_SETTINGS_TEST_KEY");
        }
    }

    #[test]
    fn missing_openai_key() {
        let settings = resolve(&ClientConfig::default(), None, false, &[]);
        assert!(settings.openai_config().is_err());
    }

    #[test]
    fn run_config_carries_settings() {
        let mut config = ClientConfig::default();
        config.window.split_hour = Some(8);
        let settings = resolve(&config, Some("amr"), false, &[("TO_EMAIL", "me@example.com"), ("EMAIL_FORMAT", "windows")]);

        let run = settings.run_config(DigestWindow::Morning, Delivery::Send, true);
        assert_eq!(run.recipient(), Some("me@example.com"));
        assert_eq!(run.hours.split_hour, 8);
        assert_eq!(run.email_format, EmailFormat::Windows);
        assert_eq!(run.profile.as_ref().map(|p| p.name()), Some("amr"));
        assert!(!run.use_lock);
    }
}
