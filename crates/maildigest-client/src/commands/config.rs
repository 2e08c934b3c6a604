//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::settings::Settings;

/// Dump the configuration file contents as parsed.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Checks that everything a `run` needs is configured.
pub fn validate(settings: &Settings) -> ClientResult<()> {
    let problems = problems(settings);
    if problems.is_empty() {
        println!("Configuration is valid.");
        println!("  profile: {}", settings.profile.as_ref().map(|p| p.name()).unwrap_or("default"));
        println!("  token:   {}", settings.token_location().display());
        return Ok(());
    }

    for problem in &problems {
        eprintln!("  - {}", problem);
    }
    Err(ClientError::Config(format!("{} problem(s) found", problems.len())))
}

fn problems(settings: &Settings) -> Vec<String> {
    let mut problems = Vec::new();
    if let Err(e) = settings.microsoft_config().and_then(|c| {
        c.validate().map_err(ClientError::Config)
    }) {
        problems.push(e.to_string());
    }
    if let Err(e) = settings.openai_config() {
        problems.push(e.to_string());
    }
    if settings.to_email.is_none() {
        problems.push("Missing TO_EMAIL (digest recipient)".to_string());
    }
    if let Err(e) = settings.hours.validate() {
        problems.push(e.to_string());
    }
    problems
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::no_env;

    #[test]
    fn empty_configuration_reports_everything() {
        let settings = Settings::resolve(&ClientConfig::default(), None, false, &no_env).unwrap();
        let found = problems(&settings);
        assert_eq!(found.len(), 3);
        assert!(found[0].contains("AZURE_TENANT_ID"));
        assert!(found[1].contains("OPENAI_API_KEY"));
        assert!(found[2].contains("TO_EMAIL"));
    }

    #[test]
    fn complete_configuration_is_valid() {
        let mut config = ClientConfig::default();
        config.azure.client_id = Some("client".into());
        config.azure.tenant_id = Some("tenant".into());
        config.openai.api_key = Some("sk-test".into());
        config.mail.to_email = Some("me@example.com".into());
        let settings = Settings::resolve(&config, None, false, &no_env).unwrap();
        assert!(problems(&settings).is_empty());
    }

    #[test]
    fn bad_window_hours_reported() {
        let mut config = ClientConfig::default();
        config.window.split_hour = Some(20);
        let settings = Settings::resolve(&config, None, false, &no_env).unwrap();
        assert!(problems(&settings).iter().any(|p| p.contains("20")));
    }
}
