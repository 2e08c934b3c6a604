//! maildigest CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use maildigest_client::cli::{Cli, Command, ConfigAction, RunArgs, TokenAction};
use maildigest_client::commands;
use maildigest_client::config::ClientConfig;
use maildigest_client::envfile;
use maildigest_client::error::{ClientError, ClientResult};
use maildigest_client::settings::{Settings, process_env, resolve_profile};
use maildigest_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Some(format) = cli.log_format {
        tracing_config = tracing_config.with_format(format);
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            e.exit_code()
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = if cli.config.is_some() {
        ClientConfig::load_from(&config_path).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().map_err(ClientError::Config)?
    };

    // .env first, then .env.<profile> once the profile is known.
    let cwd = std::env::current_dir()?;
    envfile::load_base(&cwd)?;
    if let Some(profile) = resolve_profile(cli.profile_flag(), &config, &process_env) {
        envfile::load_profile(&cwd, &profile)?;
    }

    let hosted = matches!(cli.command, Some(Command::Run(ref args)) if args.hosted);
    let settings = Settings::from_process(&config, cli.profile_flag(), hosted)?;
    debug!(
        profile = settings.profile.as_ref().map(|p| p.name()).unwrap_or("default"),
        hosted = settings.hosted,
        "settings resolved"
    );

    match cli.command {
        None => commands::run::run(&settings, &RunArgs::default()).await,
        Some(Command::Run(ref args)) => commands::run::run(&settings, args).await,
        Some(Command::Invoke {
            ref window,
            ref log_dir,
            ..
        }) => {
            let flags = commands::invoke::ChildFlags::from_cli(&cli);
            commands::invoke::invoke(&settings, window.as_deref(), log_dir.clone(), &flags).await
        }
        Some(Command::Auth { force, .. }) => {
            commands::auth::auth(&settings, &config, &config_path, force).await
        }
        Some(Command::Token { ref action }) => match action {
            TokenAction::Export { output_dir, .. } => commands::token::export(&settings, output_dir),
            TokenAction::Path { .. } => commands::token::path(&settings),
        },
        Some(Command::Config { ref action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&settings),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}
