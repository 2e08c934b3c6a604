//! [`MailProvider`] implementation backed by Microsoft Graph.

use std::time::Duration;

use maildigest_core::TimeWindow;
use tracing::{debug, info};

use crate::error::ProviderResult;
use crate::provider::{BoxFuture, MailProvider, OutgoingMessage};
use crate::raw_message::RawMessage;

use super::auth::GraphAuthenticator;
use super::client::GraphClient;
use super::config::MicrosoftConfig;

/// Microsoft 365 / Outlook.com mailbox.
#[derive(Debug)]
pub struct MicrosoftMailProvider {
    auth: GraphAuthenticator,
    graph_base: String,
    page_size: u32,
    timeout: Duration,
}

impl MicrosoftMailProvider {
    pub fn new(config: &MicrosoftConfig, auth: GraphAuthenticator) -> Self {
        Self {
            auth,
            graph_base: config.graph_base.clone(),
            page_size: config.page_size,
            timeout: config.timeout,
        }
    }

    pub fn authenticator(&self) -> &GraphAuthenticator {
        &self.auth
    }

    async fn graph(&self) -> ProviderResult<GraphClient> {
        let token = self.auth.access_token().await?;
        GraphClient::new(&self.graph_base, token, self.timeout)
    }
}

impl MailProvider for MicrosoftMailProvider {
    fn name(&self) -> &str {
        "microsoft"
    }

    fn authenticate(&self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move {
            self.auth
                .access_token()
                .await
                .map_err(|e| e.with_provider("microsoft"))?;
            debug!(location = %self.auth.token_location().display(), "authenticated");
            Ok(())
        })
    }

    fn fetch_messages(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawMessage>>> {
        Box::pin(async move {
            let graph = self.graph().await?;
            let messages = graph
                .list_inbox_messages(&window, self.page_size)
                .await
                .map_err(|e| e.with_provider("microsoft"))?;
            info!(count = messages.len(), %window, "fetched messages");
            Ok(messages)
        })
    }

    fn send_digest(&self, message: OutgoingMessage) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move {
            let graph = self.graph().await?;
            graph
                .send_mail(&message)
                .await
                .map_err(|e| e.with_provider("microsoft"))?;
            info!(to = %message.to, subject = %message.subject, "digest sent");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maildigest_core::UserProfile;
    use tempfile::TempDir;

    use crate::error::ProviderErrorCode;
    use crate::tokens::FileCredentialStore;

    #[tokio::test]
    async fn authenticate_reports_missing_token_when_hosted() {
        let dir = TempDir::new().unwrap();
        let config = MicrosoftConfig::new("client", "tenant").with_interactive(false);
        let store = FileCredentialStore::new(dir.path()).read_only(true);
        let auth = GraphAuthenticator::new(config.clone(), UserProfile::new("amr"), Box::new(store)).unwrap();
        let provider = MicrosoftMailProvider::new(&config, auth);

        assert_eq!(provider.name(), "microsoft");
        let err = provider.authenticate().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.provider(), Some("microsoft"));
    }
}
