//! Microsoft identity and Graph configuration.

use std::time::Duration;

use url::Url;

/// Default Entra ID authority host.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Default Graph API base URL.
pub const DEFAULT_GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Delegated scopes the digest needs. `offline_access` yields a refresh token.
pub const DEFAULT_SCOPES: [&str; 4] = ["User.Read", "Mail.Read", "Mail.Send", "offline_access"];

/// Configuration for the Microsoft mail provider.
#[derive(Debug, Clone)]
pub struct MicrosoftConfig {
    /// Application (client) id of the public client registration.
    pub client_id: String,

    /// Directory (tenant) id, or `common`/`organizations`.
    pub tenant_id: String,

    /// Identity authority host.
    pub authority_host: String,

    /// Graph API base URL.
    pub graph_base: String,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Request timeout.
    pub timeout: Duration,

    /// Page size requested when listing messages.
    pub page_size: u32,

    /// Whether the device-code sign-in may run when no usable token exists.
    pub interactive: bool,

    /// Whether to try opening the verification page in a browser.
    pub open_browser: bool,
}

impl MicrosoftConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Default `$top` for message listing.
    pub const DEFAULT_PAGE_SIZE: u32 = 500;

    pub fn new(client_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            tenant_id: tenant_id.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            graph_base: DEFAULT_GRAPH_BASE.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            page_size: Self::DEFAULT_PAGE_SIZE,
            interactive: true,
            open_browser: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_open_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into();
        self
    }

    pub fn with_graph_base(mut self, base: impl Into<String>) -> Self {
        self.graph_base = base.into();
        self
    }

    /// Device authorization endpoint for the tenant.
    pub fn device_code_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/devicecode",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Token endpoint for the tenant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Space-separated scope string.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.client_id.trim().is_empty() {
            return Err("client_id is required (AZURE_CLIENT_ID)".to_string());
        }
        if self.tenant_id.trim().is_empty() {
            return Err("tenant_id is required (AZURE_TENANT_ID)".to_string());
        }
        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }
        for (name, value) in [("authority_host", &self.authority_host), ("graph_base", &self.graph_base)] {
            Url::parse(value).map_err(|e| format!("invalid {name} '{value}': {e}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MicrosoftConfig::new("client", "tenant");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.page_size, 500);
        assert!(config.interactive);
        assert_eq!(config.scope_string(), "User.Read Mail.Read Mail.Send offline_access");
    }

    #[test]
    fn endpoints_include_tenant() {
        let config = MicrosoftConfig::new("client", "contoso.onmicrosoft.com");
        assert_eq!(
            config.device_code_url(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/devicecode"
        );
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );

        let config = config.with_authority_host("http://localhost:9000/");
        assert_eq!(
            config.token_url(),
            "http://localhost:9000/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
    }

    #[test]
    fn validation() {
        assert!(MicrosoftConfig::new("client", "tenant").validate().is_ok());
        assert!(MicrosoftConfig::new("", "tenant").validate().is_err());
        assert!(MicrosoftConfig::new("client", " ").validate().is_err());
        assert!(
            MicrosoftConfig::new("client", "tenant")
                .with_graph_base("not a url")
                .validate()
                .is_err()
        );
    }
}
