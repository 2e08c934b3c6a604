//! Access-token acquisition for Graph.
//!
//! [`GraphAuthenticator`] decides how to obtain a usable token:
//! 1. a cached, unexpired token is used as is
//! 2. an expired token with a refresh token is refreshed and stored
//! 3. otherwise the device-code sign-in runs, if interactive
//!
//! Non-interactive (hosted) runs fail at step 3 with a message naming the
//! token file that has to be provided.

use maildigest_core::UserProfile;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::CredentialStore;
use crate::tokens::TokenInfo;

use super::config::MicrosoftConfig;
use super::oauth::DeviceCodeClient;

/// Obtains and caches Graph access tokens for one profile.
pub struct GraphAuthenticator {
    profile: Option<UserProfile>,
    store: Box<dyn CredentialStore>,
    oauth: DeviceCodeClient,
    interactive: bool,
    current: Mutex<Option<TokenInfo>>,
}

impl std::fmt::Debug for GraphAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphAuthenticator")
            .field("profile", &self.profile)
            .field("location", &self.store.location(self.profile.as_ref()))
            .field("interactive", &self.interactive)
            .finish()
    }
}

impl GraphAuthenticator {
    pub fn new(
        config: MicrosoftConfig,
        profile: Option<UserProfile>,
        store: Box<dyn CredentialStore>,
    ) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;
        let interactive = config.interactive;
        Ok(Self {
            profile,
            store,
            oauth: DeviceCodeClient::new(config)?,
            interactive,
            current: Mutex::new(None),
        })
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Where the token for this profile is stored.
    pub fn token_location(&self) -> std::path::PathBuf {
        self.store.location(self.profile.as_ref())
    }

    /// Returns a valid access token, refreshing or signing in as needed.
    pub async fn access_token(&self) -> ProviderResult<String> {
        let mut current = self.current.lock().await;

        if current.is_none() {
            *current = self.store.load(self.profile.as_ref())?;
        }

        if let Some(ref token) = *current
            && !token.is_expired()
        {
            debug!("using cached access token");
            return Ok(token.access_token.clone());
        }

        if let Some(ref mut token) = *current
            && let Some(refresh_token) = token.refresh_token.clone()
        {
            debug!("refreshing expired access token");
            match self.oauth.refresh(&refresh_token).await {
                Ok(response) => {
                    token.apply_refresh(response.access_token, response.refresh_token, response.expires_in);
                    self.store.store(self.profile.as_ref(), token)?;
                    return Ok(token.access_token.clone());
                }
                Err(e) if self.interactive => {
                    warn!("token refresh failed, falling back to sign-in: {}", e);
                }
                Err(e) => return Err(self.remediation(Some(e.message()))),
            }
        }

        if !self.interactive {
            return Err(self.remediation(None));
        }

        let token = self.sign_in_locked().await?;
        let access = token.access_token.clone();
        *current = Some(token);
        Ok(access)
    }

    /// Runs the device-code sign-in unconditionally and stores the token.
    pub async fn sign_in(&self) -> ProviderResult<TokenInfo> {
        let mut current = self.current.lock().await;
        let token = self.sign_in_locked().await?;
        *current = Some(token.clone());
        Ok(token)
    }

    async fn sign_in_locked(&self) -> ProviderResult<TokenInfo> {
        info!(profile = self.profile.as_ref().map(|p| p.name()).unwrap_or("default"), "starting device-code sign-in");
        let token = self.oauth.sign_in().await?;
        self.store.store(self.profile.as_ref(), &token)?;
        Ok(token)
    }

    fn remediation(&self, cause: Option<&str>) -> ProviderError {
        let location = self.token_location();
        let file = location
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| location.display().to_string());
        let mut message = format!(
            "No valid token found. Please upload {file} to the secret files directory, \
             or set MSAL_TOKEN_CACHE_BASE64 (see `maildigest token export`)"
        );
        if let Some(cause) = cause {
            message.push_str(&format!(": {cause}"));
        }
        ProviderError::authentication(message).with_provider("microsoft")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    use crate::error::ProviderErrorCode;
    use crate::tokens::FileCredentialStore;

    fn hosted(dir: &TempDir, profile: &str) -> GraphAuthenticator {
        let config = MicrosoftConfig::new("client", "tenant").with_interactive(false);
        let store = FileCredentialStore::new(dir.path()).read_only(true);
        GraphAuthenticator::new(config, UserProfile::new(profile), Box::new(store)).unwrap()
    }

    #[tokio::test]
    async fn uses_cached_token() {
        let dir = TempDir::new().unwrap();
        let writer = FileCredentialStore::new(dir.path());
        let profile = UserProfile::new("amr");
        writer
            .store(profile.as_ref(), &TokenInfo::new("cached", None, Some(3600), vec![]))
            .unwrap();

        let auth = hosted(&dir, "amr");
        assert_eq!(auth.access_token().await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn hosted_without_token_names_expected_file() {
        let dir = TempDir::new().unwrap();
        let auth = hosted(&dir, "jawad");

        let err = auth.access_token().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(err.message().contains("msal_token_cache_jawad.bin"), "{}", err);
    }

    #[tokio::test]
    async fn hosted_with_expired_token_and_no_refresh_fails() {
        let dir = TempDir::new().unwrap();
        let mut token = TokenInfo::new("old", None, Some(3600), vec![]);
        token.expires_at = Some(Utc::now() - Duration::minutes(5));
        FileCredentialStore::new(dir.path())
            .store(UserProfile::new("amr").as_ref(), &token)
            .unwrap();

        let auth = hosted(&dir, "amr");
        assert!(auth.access_token().await.is_err());
    }

    #[test]
    fn rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let config = MicrosoftConfig::new("", "tenant");
        let store = FileCredentialStore::new(dir.path());
        let err = GraphAuthenticator::new(config, None, Box::new(store)).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[test]
    fn token_location_follows_store() {
        let dir = TempDir::new().unwrap();
        let auth = hosted(&dir, "amr");
        assert_eq!(
            auth.token_location(),
            PathBuf::from(dir.path()).join("msal_token_cache_amr.bin")
        );
    }
}
