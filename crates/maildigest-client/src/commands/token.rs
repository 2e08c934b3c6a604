//! `maildigest token`: token cache export for hosted deployments.

use std::fs;
use std::path::{Path, PathBuf};

use maildigest_core::UserProfile;
use maildigest_core::profile::exported_token_file_name;
use maildigest_providers::encode_cache_file;

use crate::error::{ClientError, ClientResult};
use crate::settings::Settings;

/// Profile name used in the export file name when none is configured.
const DEFAULT_EXPORT_PROFILE: &str = "default";

/// Prints the token cache as `MSAL_TOKEN_CACHE_BASE64=...` and writes the
/// value to `render_token_<profile>.txt` in `output_dir`.
pub fn export(settings: &Settings, output_dir: &Path) -> ClientResult<()> {
    let location = settings.token_location();
    let (encoded, written) = export_to(&location, settings.profile.as_ref(), output_dir)?;

    println!("Copy this value into the MSAL_TOKEN_CACHE_BASE64 environment variable:");
    println!();
    println!("MSAL_TOKEN_CACHE_BASE64={}", encoded);
    println!();
    println!("Saved to {}", written.display());
    println!(
        "Alternatively upload {} as a secret file.",
        location.file_name().map(|f| f.to_string_lossy()).unwrap_or_default()
    );
    Ok(())
}

/// Encodes the cache at `location` and writes it next to `output_dir`.
pub fn export_to(
    location: &Path,
    profile: Option<&UserProfile>,
    output_dir: &Path,
) -> ClientResult<(String, PathBuf)> {
    if !location.is_file() {
        return Err(ClientError::Config(format!(
            "Token cache file {} not found. Run `maildigest auth` first.",
            location.display()
        )));
    }

    let encoded = encode_cache_file(location)?;
    let file_name = match profile {
        Some(p) => exported_token_file_name(p),
        None => format!("render_token_{}.txt", DEFAULT_EXPORT_PROFILE),
    };

    fs::create_dir_all(output_dir)?;
    let written = output_dir.join(file_name);
    fs::write(&written, &encoded)?;
    Ok((encoded, written))
}

/// Prints where the token for the profile is stored.
pub fn path(settings: &Settings) -> ClientResult<()> {
    let location = settings.token_location();
    let state = if location.is_file() { "present" } else { "missing" };
    println!("token: {} ({})", location.display(), state);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn export_writes_profile_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("msal_token_cache_amr.bin");
        fs::write(&cache, "{\"access_token\":\"a\"}").unwrap();

        let profile = UserProfile::new("amr");
        let out = dir.path().join("out");
        let (encoded, written) = export_to(&cache, profile.as_ref(), &out).unwrap();

        assert_eq!(written, out.join("render_token_amr.txt"));
        assert_eq!(fs::read_to_string(&written).unwrap(), encoded);
        assert_eq!(STANDARD.decode(&encoded).unwrap(), b"{\"access_token\":\"a\"}");
    }

    #[test]
    fn export_without_profile_uses_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("msal_token_cache.bin");
        fs::write(&cache, "{}").unwrap();

        let (_, written) = export_to(&cache, None, dir.path()).unwrap();
        assert!(written.ends_with("render_token_default.txt"));
    }

    #[test]
    fn export_missing_cache_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = export_to(&dir.path().join("nope.bin"), None, dir.path()).unwrap_err();
        assert!(err.to_string().contains("maildigest auth"));
    }
}
