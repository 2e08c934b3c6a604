//! `maildigest auth`: interactive Microsoft sign-in.

use std::path::Path;

use maildigest_providers::CredentialStore;
use maildigest_providers::microsoft::GraphAuthenticator;
use tracing::{info, warn};

use crate::config::{ClientConfig, save_azure_ids};
use crate::error::ClientResult;
use crate::settings::Settings;

/// Runs the device-code flow and stores the token for the profile.
///
/// An existing token that is still valid, or can be refreshed, is kept
/// unless `force` is set. Azure identifiers that came from the environment
/// are written to `config.toml` so later runs find them.
pub async fn auth(settings: &Settings, config: &ClientConfig, config_path: &Path, force: bool) -> ClientResult<()> {
    let microsoft = settings
        .microsoft_config()?
        .with_interactive(true)
        .with_open_browser(true);
    let store = settings.credential_store().read_only(false);

    if !force
        && let Some(token) = store.load(settings.profile.as_ref())?
        && (!token.is_expired() || token.refresh_token.is_some())
    {
        println!("Already authenticated ({}).", store.location(settings.profile.as_ref()).display());
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    let authenticator = GraphAuthenticator::new(microsoft.clone(), settings.profile.clone(), Box::new(store))?;

    println!("Starting Microsoft sign-in...");
    println!();
    authenticator.sign_in().await?;

    info!(profile = settings.profile.as_ref().map(|p| p.name()).unwrap_or("default"), "sign-in successful");
    println!();
    println!("Authentication successful!");
    println!("Token saved to {}", authenticator.token_location().display());

    if needs_persisting(config) {
        match save_azure_ids(config_path, &microsoft.client_id, &microsoft.tenant_id) {
            Ok(()) => println!("Azure identifiers saved to {}", config_path.display()),
            Err(e) => warn!("could not save Azure identifiers: {}", e),
        }
    }

    Ok(())
}

fn needs_persisting(config: &ClientConfig) -> bool {
    config.azure.client_id.is_none() || config.azure.tenant_id.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use maildigest_providers::{FileCredentialStore, TokenInfo};
    use crate::settings::no_env;

    #[test]
    fn persists_only_missing_ids() {
        let mut config = ClientConfig::default();
        assert!(needs_persisting(&config));
        config.azure.client_id = Some("c".into());
        assert!(needs_persisting(&config));
        config.azure.tenant_id = Some("env::AZURE_TENANT_ID".into());
        assert!(!needs_persisting(&config));
    }

    #[tokio::test]
    async fn existing_token_is_kept_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClientConfig::default();
        config.azure.client_id = Some("client".into());
        config.azure.tenant_id = Some("tenant".into());
        config.cache.dir = Some(dir.path().to_path_buf());
        let settings = Settings::resolve(&config, Some("amr"), false, &no_env).unwrap();

        FileCredentialStore::new(dir.path())
            .store(settings.profile.as_ref(), &TokenInfo::new("valid", None, Some(3600), vec![]))
            .unwrap();

        let config_path = dir.path().join("config.toml");
        auth(&settings, &config, &config_path, false).await.unwrap();
        assert!(!config_path.exists());
    }
}
