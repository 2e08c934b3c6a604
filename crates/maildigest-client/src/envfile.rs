//! `.env` and `.env.<profile>` loading.
//!
//! `.env` is loaded first without overriding variables already set in the
//! process. The profile file is loaded next and overrides them, so a
//! profile can change `TO_EMAIL`, `OPENAI_API_KEY` and so on.

use std::path::{Path, PathBuf};

use maildigest_core::UserProfile;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

/// Outcome of loading a profile's env file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEnv {
    /// The file was found and applied.
    Loaded(PathBuf),
    /// No such file; the base `.env` stays in effect.
    Missing(PathBuf),
}

/// `<dir>/.env.<profile>`.
pub fn profile_env_path(dir: &Path, profile: &UserProfile) -> PathBuf {
    dir.join(format!(".env.{}", profile.name()))
}

/// Loads `<dir>/.env` if present. Existing variables win.
pub fn load_base(dir: &Path) -> ClientResult<Option<PathBuf>> {
    let path = dir.join(".env");
    if !path.is_file() {
        return Ok(None);
    }
    dotenvy::from_path(&path)
        .map_err(|e| ClientError::Config(format!("failed to load {}: {}", path.display(), e)))?;
    debug!(path = %path.display(), "loaded env file");
    Ok(Some(path))
}

/// Loads `<dir>/.env.<profile>`, overriding existing variables.
pub fn load_profile(dir: &Path, profile: &UserProfile) -> ClientResult<ProfileEnv> {
    let path = profile_env_path(dir, profile);
    if !path.is_file() {
        warn!(
            profile = profile.name(),
            path = %path.display(),
            "profile env file not found, using base .env"
        );
        return Ok(ProfileEnv::Missing(path));
    }
    dotenvy::from_path_override(&path)
        .map_err(|e| ClientError::Config(format!("failed to load {}: {}", path.display(), e)))?;
    debug!(profile = profile.name(), path = %path.display(), "loaded profile env file");
    Ok(ProfileEnv::Loaded(path))
}
