//! OAuth token cache.
//!
//! Tokens are stored per profile as JSON in
//! `<cache_dir>/msal_token_cache_<profile>.bin`. On hosted deployments the
//! cache directory is a read-only secret mount, and a base64 copy of the
//! file may be supplied through the environment instead.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use maildigest_core::UserProfile;
use maildigest_core::profile::token_cache_file_name;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::CredentialStore;

/// Seconds subtracted from the server-reported lifetime so tokens are
/// refreshed before they actually expire.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Information about an OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires (already shortened by the margin).
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When the tokens were last refreshed.
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    /// Creates a new token info from OAuth response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self::issued_at(Utc::now(), access_token, refresh_token, expires_in_secs, scopes)
    }

    /// Like [`TokenInfo::new`] with an explicit issue time.
    pub fn issued_at(
        now: DateTime<Utc>,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(|secs| expiry(now, secs)),
            scopes,
            last_refresh: now,
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    /// Returns true if the token has all `required` scopes (case-insensitive).
    pub fn has_scopes(&self, required: &[&str]) -> bool {
        required
            .iter()
            .all(|scope| self.scopes.iter().any(|s| s.eq_ignore_ascii_case(scope)))
    }

    /// Applies a refresh response. The old refresh token is kept when the
    /// server does not rotate it.
    pub fn apply_refresh(
        &mut self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) {
        let now = Utc::now();
        self.access_token = access_token.into();
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.expires_at = expires_in_secs.map(|secs| expiry(now, secs));
        self.last_refresh = now;
    }

    /// Returns the time until the token expires, if known.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.map(|expires_at| expires_at - Utc::now())
    }
}

fn expiry(now: DateTime<Utc>, expires_in_secs: i64) -> DateTime<Utc> {
    now + Duration::seconds(expires_in_secs) - Duration::seconds(EXPIRY_MARGIN_SECS)
}

/// File-backed [`CredentialStore`].
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
    file_override: Option<PathBuf>,
    base64_fallback: Option<String>,
    read_only: bool,
}

impl FileCredentialStore {
    /// Creates a writable store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file_override: None,
            base64_fallback: None,
            read_only: false,
        }
    }

    /// Uses `path` for every profile instead of the per-profile file name.
    pub fn with_file_override(mut self, path: Option<PathBuf>) -> Self {
        self.file_override = path;
        self
    }

    /// Sets a base64-encoded cache consulted when the file is absent.
    pub fn with_base64_fallback(mut self, blob: Option<String>) -> Self {
        self.base64_fallback = blob.filter(|b| !b.trim().is_empty());
        self
    }

    /// Marks the store read-only; `store` then keeps tokens in memory only.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load_fallback(&self) -> ProviderResult<Option<TokenInfo>> {
        let Some(ref blob) = self.base64_fallback else {
            return Ok(None);
        };
        let bytes = STANDARD.decode(blob.trim()).map_err(|e| {
            ProviderError::configuration(format!("token cache in environment is not valid base64: {e}"))
                .with_source(e)
        })?;
        let token = serde_json::from_slice(&bytes).map_err(|e| {
            ProviderError::configuration(format!("failed to parse token cache from environment: {e}"))
        })?;
        info!("loaded token cache from environment");
        Ok(Some(token))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, profile: Option<&UserProfile>) -> ProviderResult<Option<TokenInfo>> {
        let path = self.location(profile);
        if !path.exists() {
            debug!("no token file at {:?}", path);
            return self.load_fallback();
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file {}: {e}", path.display()))
        })?;

        let token: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!("failed to parse token file {}: {e}", path.display()))
        })?;

        debug!("loaded tokens from {:?}", path);
        Ok(Some(token))
    }

    fn store(&self, profile: Option<&UserProfile>, token: &TokenInfo) -> ProviderResult<()> {
        let path = self.location(profile);
        if self.read_only {
            debug!("token store is read-only, not writing {:?}", path);
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {e}"))
            })?;
        }

        // Write to a temp file first, then rename for atomicity
        let temp_path = path.with_extension("bin.tmp");
        let content = serde_json::to_string_pretty(token)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {e}")))?;

        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {e}"))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)) {
                warn!("failed to restrict token file permissions: {e}");
            }
        }

        fs::rename(&temp_path, &path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename token file: {e}"))
        })?;

        info!("saved tokens to {:?}", path);
        Ok(())
    }

    fn location(&self, profile: Option<&UserProfile>) -> PathBuf {
        match self.file_override {
            Some(ref path) => path.clone(),
            None => self.dir.join(token_cache_file_name(profile)),
        }
    }
}

/// Reads a token cache file and returns it base64-encoded, for upload to a
/// hosting platform's secret store.
pub fn encode_cache_file(path: &Path) -> ProviderResult<String> {
    let bytes = fs::read(path).map_err(|e| {
        ProviderError::configuration(format!("failed to read token file {}: {e}", path.display()))
            .with_source(e)
    })?;
    Ok(STANDARD.encode(bytes))
}
