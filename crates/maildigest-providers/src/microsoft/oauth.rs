//! OAuth 2.0 device authorization grant (RFC 8628) against Entra ID.
//!
//! # Flow Overview
//!
//! 1. POST the client id and scopes to the tenant's `devicecode` endpoint
//! 2. Show the user the verification URL and code
//! 3. Poll the token endpoint at the server-provided interval until the
//!    user completes sign-in, declines, or the code expires
//!
//! Refresh uses the standard `refresh_token` grant on the same endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::tokens::TokenInfo;

use super::config::MicrosoftConfig;

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Seconds added to the polling interval on `slow_down`.
const SLOW_DOWN_STEP_SECS: u64 = 5;

/// Device authorization response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceAuthorization {
    /// Device code for polling.
    pub device_code: String,
    /// User code to display to the user.
    pub user_code: String,
    /// Verification URI where the user enters the code.
    pub verification_uri: String,
    /// Lifetime of the device code in seconds.
    pub expires_in: u64,
    /// Polling interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Ready-to-print instructions from the server.
    #[serde(default)]
    pub message: Option<String>,
}

const fn default_interval() -> u64 {
    5
}

impl DeviceAuthorization {
    /// The instructions shown to the user.
    pub fn prompt(&self) -> String {
        match self.message {
            Some(ref message) if !message.trim().is_empty() => message.clone(),
            _ => format!(
                "To sign in, use a web browser to open the page {} and enter the code {} to authenticate.",
                self.verification_uri, self.user_code
            ),
        }
    }
}

/// Successful token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Converts to a [`TokenInfo`], falling back to `requested` scopes when
    /// the server does not echo them.
    pub fn into_token_info(self, requested: &[String]) -> TokenInfo {
        let scopes = match self.scope {
            Some(ref s) if !s.trim().is_empty() => s.split_whitespace().map(String::from).collect(),
            _ => requested.to_vec(),
        };
        TokenInfo::new(self.access_token, self.refresh_token, self.expires_in, scopes)
    }
}

/// Error body returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// What one poll of the token endpoint produced.
#[derive(Debug)]
pub enum PollOutcome {
    /// Sign-in completed.
    Token(TokenResponse),
    /// User has not finished yet; keep polling.
    Pending,
    /// Polling too fast; increase the interval.
    SlowDown,
}

/// Maps a token endpoint error to a poll outcome or a terminal error.
pub fn classify_poll_error(error: &TokenErrorResponse) -> ProviderResult<PollOutcome> {
    let detail = error
        .error_description
        .as_deref()
        .map(|d| d.lines().next().unwrap_or(d).to_string())
        .unwrap_or_default();

    match error.error.as_str() {
        "authorization_pending" => Ok(PollOutcome::Pending),
        "slow_down" => Ok(PollOutcome::SlowDown),
        "access_denied" | "authorization_declined" => Err(ProviderError::access_denied(
            "sign-in was declined by the user",
        )),
        "expired_token" | "code_expired" => Err(ProviderError::device_flow_expired(
            "the device code expired before sign-in completed",
        )),
        "invalid_grant" => Err(ProviderError::authentication(format!(
            "grant rejected: {detail}"
        ))),
        other => Err(ProviderError::authentication(format!(
            "token request failed ({other}): {detail}"
        ))),
    }
}

/// OAuth client for the device-code and refresh grants.
#[derive(Debug)]
pub struct DeviceCodeClient {
    config: MicrosoftConfig,
    http_client: reqwest::Client,
}

impl DeviceCodeClient {
    pub fn new(config: MicrosoftConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {e}")).with_source(e)
            })?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Runs the full device-code sign-in and returns the granted token.
    ///
    /// The verification instructions are printed to stdout and the
    /// verification page is opened in a browser when possible.
    pub async fn sign_in(&self) -> ProviderResult<TokenInfo> {
        let auth = self.request_device_code().await?;

        println!("{}", auth.prompt());
        if self.config.open_browser
            && let Err(e) = open::that(&auth.verification_uri)
        {
            warn!("failed to open browser: {}", e);
        }

        let response = self.wait_for_token(&auth).await?;
        info!("device sign-in completed");
        Ok(response.into_token_info(&self.config.scopes))
    }

    /// Requests a device code for the configured scopes.
    pub async fn request_device_code(&self) -> ProviderResult<DeviceAuthorization> {
        let scope = self.config.scope_string();
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http_client
            .post(self.config.device_code_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("device code request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| format!("{}: {}", e.error, e.error_description.unwrap_or_default()))
                .unwrap_or(body);
            return Err(ProviderError::authentication(format!(
                "failed to create device flow ({status}): {detail}"
            )));
        }

        let auth: DeviceAuthorization = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid device code response: {e}"))
        })?;
        debug!(expires_in = auth.expires_in, interval = auth.interval, "received device code");
        Ok(auth)
    }

    /// Polls until the user finishes, declines, or the code expires.
    pub async fn wait_for_token(&self, auth: &DeviceAuthorization) -> ProviderResult<TokenResponse> {
        let deadline = Instant::now() + Duration::from_secs(auth.expires_in);
        let mut interval = Duration::from_secs(auth.interval.max(1));

        loop {
            if Instant::now() + interval > deadline {
                return Err(ProviderError::device_flow_expired(
                    "the device code expired before sign-in completed",
                ));
            }
            tokio::time::sleep(interval).await;

            match self.poll_once(&auth.device_code).await? {
                PollOutcome::Token(token) => return Ok(token),
                PollOutcome::Pending => debug!("authorization pending"),
                PollOutcome::SlowDown => {
                    interval += Duration::from_secs(SLOW_DOWN_STEP_SECS);
                    debug!(interval_secs = interval.as_secs(), "slowing down polling");
                }
            }
        }
    }

    /// Polls the token endpoint once.
    pub async fn poll_once(&self, device_code: &str) -> ProviderResult<PollOutcome> {
        let params = [
            ("grant_type", DEVICE_CODE_GRANT),
            ("client_id", self.config.client_id.as_str()),
            ("device_code", device_code),
        ];
        self.token_request(&params).await
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<TokenResponse> {
        let scope = self.config.scope_string();
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
        ];

        match self.token_request(&params).await {
            Ok(PollOutcome::Token(token)) => {
                info!("successfully refreshed access token");
                Ok(token)
            }
            Ok(_) => Err(ProviderError::invalid_response(
                "unexpected pending response to refresh request",
            )),
            Err(e) => Err(ProviderError::authentication(format!("token refresh failed: {}", e.message()))),
        }
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> ProviderResult<PollOutcome> {
        let response = self
            .http_client
            .post(self.config.token_url())
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {e}")))?;

        if status.is_success() {
            let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
                ProviderError::invalid_response(format!("invalid token response: {e}"))
            })?;
            return Ok(PollOutcome::Token(token));
        }

        match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(error) => classify_poll_error(&error),
            Err(_) => Err(ProviderError::server(format!(
                "token endpoint error ({status}): {body}"
            ))),
        }
    }
}
