//! Microsoft identity and Graph mail provider.
//!
//! # Authentication Flow
//!
//! 1. Load the profile's token from the [`CredentialStore`](crate::CredentialStore)
//! 2. Refresh it with the refresh token when expired
//! 3. Otherwise run the device-code flow: print the verification URL and
//!    code, open the browser, poll until the user signs in
//! 4. Persist the new token
//!
//! Hosted runs are non-interactive and stop at step 3 with an error.
//!
//! # Example
//!
//! ```ignore
//! use maildigest_providers::microsoft::{GraphAuthenticator, MicrosoftConfig, MicrosoftMailProvider};
//! use maildigest_providers::FileCredentialStore;
//!
//! let config = MicrosoftConfig::new(client_id, tenant_id);
//! let store = FileCredentialStore::new(cache_dir);
//! let auth = GraphAuthenticator::new(config.clone(), profile, Box::new(store))?;
//! let provider = MicrosoftMailProvider::new(&config, auth);
//! provider.authenticate().await?;
//! ```

mod auth;
mod client;
mod config;
mod oauth;
mod provider;

pub use auth::GraphAuthenticator;
pub use client::{GraphClient, MESSAGE_FIELDS, graph_timestamp, message_query};
pub use config::{DEFAULT_SCOPES, MicrosoftConfig};
pub use oauth::{DeviceAuthorization, DeviceCodeClient, PollOutcome, TokenResponse};
pub use provider::MicrosoftMailProvider;
