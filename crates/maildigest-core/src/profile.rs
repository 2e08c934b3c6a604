//! User profiles.
//!
//! A profile names one mailbox owner. Its sanitized form is embedded in
//! file names (token caches, run locks, exported secrets), so only
//! characters safe on every filesystem survive.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.\-]+").expect("Invalid profile regex"));

/// Environment variable holding the primary profile name.
pub const USER_PROFILE_ENV: &str = "USER_PROFILE";

/// Legacy environment variable consulted when `USER_PROFILE` is unset.
pub const LEGACY_PROFILE_ENV: &str = "MSAL_PROFILE";

/// Errors produced when parsing a profile name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("profile name must not be empty")]
    Empty,
}

/// A named user profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(String);

impl UserProfile {
    /// Creates a profile from a name, trimming surrounding whitespace.
    ///
    /// Returns `None` for empty names.
    pub fn new(name: impl AsRef<str>) -> Option<Self> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            None
        } else {
            Some(Self(name.to_string()))
        }
    }

    /// Resolves the active profile from the usual sources, in order:
    /// an explicit name, `USER_PROFILE`/`MSAL_PROFILE` values, then the
    /// local part of the sender address. A profile derived from the address
    /// is stored in its safe form, so `.env.<profile>` uses that name too.
    pub fn resolve(
        explicit: Option<&str>,
        legacy: Option<&str>,
        from_email: Option<&str>,
    ) -> Option<Self> {
        explicit
            .and_then(Self::new)
            .or_else(|| legacy.and_then(Self::new))
            .or_else(|| {
                from_email
                    .and_then(|addr| addr.split('@').next())
                    .map(safe_name)
                    .and_then(Self::new)
            })
    }

    /// Returns the profile name as given.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns the name with runs of unsafe characters replaced by `_`.
    pub fn safe_name(&self) -> String {
        safe_name(&self.0)
    }
}

impl fmt::Display for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserProfile {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or(ProfileError::Empty)
    }
}

/// Replaces every run of characters outside `[A-Za-z0-9_.-]` with `_`.
pub fn safe_name(name: &str) -> String {
    UNSAFE_CHARS.replace_all(name, "_").into_owned()
}

/// Returns the token cache file name for an optional profile.
pub fn token_cache_file_name(profile: Option<&UserProfile>) -> String {
    match profile {
        Some(p) => format!("msal_token_cache_{}.bin", p.safe_name()),
        None => "msal_token_cache.bin".to_string(),
    }
}

/// Returns the file name used when exporting a token for a hosted deployment.
pub fn exported_token_file_name(profile: &UserProfile) -> String {
    format!("render_token_{}.txt", profile.safe_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_name_collapses_runs() {
        assert_eq!(safe_name("amr"), "amr");
        assert_eq!(safe_name("jane doe"), "jane_doe");
        assert_eq!(safe_name("a/b\\c"), "a_b_c");
        assert_eq!(safe_name("x  @@ y"), "x_y");
        assert_eq!(safe_name("first.last-2_x"), "first.last-2_x");
    }

    #[test]
    fn empty_names_are_rejected() {
        assert!(UserProfile::new("").is_none());
        assert!(UserProfile::new("   ").is_none());
        assert_eq!(UserProfile::new(" amr ").unwrap().name(), "amr");
        assert_eq!("".parse::<UserProfile>(), Err(ProfileError::Empty));
        assert_eq!("jawad".parse::<UserProfile>().unwrap().to_string(), "jawad");
    }

    #[test]
    fn resolution_order() {
        let p = UserProfile::resolve(Some("amr"), Some("legacy"), Some("bob@example.com"));
        assert_eq!(p.unwrap().name(), "amr");

        let p = UserProfile::resolve(None, Some("legacy"), Some("bob@example.com"));
        assert_eq!(p.unwrap().name(), "legacy");

        let p = UserProfile::resolve(Some(""), None, Some("bob@example.com"));
        assert_eq!(p.unwrap().name(), "bob");

        assert!(UserProfile::resolve(None, None, None).is_none());
    }

    #[test]
    fn address_derived_profile_is_sanitized() {
        let p = UserProfile::resolve(None, None, Some("jane doe+news@example.com")).unwrap();
        assert_eq!(p.name(), "jane_doe_news");

        let p = UserProfile::resolve(Some("jane doe"), None, None).unwrap();
        assert_eq!(p.name(), "jane doe");
        assert_eq!(p.safe_name(), "jane_doe");
    }

    #[test]
    fn token_file_names() {
        let p = UserProfile::new("jane doe").unwrap();
        assert_eq!(token_cache_file_name(Some(&p)), "msal_token_cache_jane_doe.bin");
        assert_eq!(token_cache_file_name(None), "msal_token_cache.bin");
        assert_eq!(exported_token_file_name(&p), "render_token_jane_doe.txt");
    }
}
