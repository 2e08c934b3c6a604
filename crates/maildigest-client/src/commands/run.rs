//! `maildigest run`: build and send one digest.

use std::path::Path;

use maildigest_core::DigestWindow;
use maildigest_providers::microsoft::{GraphAuthenticator, MicrosoftMailProvider};
use maildigest_providers::openai::OpenAiSummarizer;
use maildigest_runner::{Delivery, DigestRun, RunOutcome};
use tracing::info;

use crate::cli::RunArgs;
use crate::error::ClientResult;
use crate::settings::Settings;

/// Runs the digest pipeline with the Microsoft and OpenAI backends.
pub async fn run(settings: &Settings, args: &RunArgs) -> ClientResult<()> {
    let window = DigestWindow::from_label(args.window.as_deref());
    let delivery = if args.dry_run {
        Delivery::DryRun
    } else {
        Delivery::Send
    };

    let microsoft = settings.microsoft_config()?;
    let summarizer = OpenAiSummarizer::new(settings.openai_config()?)?;
    let auth = GraphAuthenticator::new(
        microsoft.clone(),
        settings.profile.clone(),
        Box::new(settings.credential_store()),
    )?;

    info!(
        profile = settings.profile.as_ref().map(|p| p.name()).unwrap_or("default"),
        token = %auth.token_location().display(),
        hosted = settings.hosted,
        model = summarizer.model(),
        "configured digest run"
    );

    let mail = MicrosoftMailProvider::new(&microsoft, auth);
    let config = settings.run_config(window, delivery, args.no_lock);
    let digest = DigestRun::new(config, Box::new(mail), Box::new(summarizer));

    let outcome = digest.execute().await?;
    report(outcome, args.output.as_deref())
}

fn report(outcome: RunOutcome, output: Option<&Path>) -> ClientResult<()> {
    match outcome {
        RunOutcome::NoThreads => println!("📭 No recent threads found."),
        RunOutcome::Sent { subject, threads } => {
            println!("✅ Digest sent: {subject} ({threads} threads)");
        }
        RunOutcome::Rendered { html, subject, .. } => match output {
            Some(path) => {
                std::fs::write(path, html)?;
                println!("Rendered {subject} to {}", path.display());
            }
            None => println!("{html}"),
        },
    }
    Ok(())
}
