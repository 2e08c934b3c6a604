//! The digest run: fetch, group, summarize, render, send.

use chrono::{DateTime, Utc};
use maildigest_core::{DigestEntry, DigestRenderer, digest_subject};
use maildigest_providers::{MailProvider, OutgoingMessage, Summarizer, group_into_threads};
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::config::{Delivery, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runlock::RunLock;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing arrived in the window; no email was sent.
    NoThreads,
    /// The digest was sent.
    Sent { subject: String, threads: usize },
    /// Dry run: the digest was rendered but not sent.
    Rendered {
        subject: String,
        threads: usize,
        html: String,
    },
}

/// One digest run over explicit collaborators.
pub struct DigestRun {
    config: RunConfig,
    mail: Box<dyn MailProvider>,
    summarizer: Box<dyn Summarizer>,
}

impl std::fmt::Debug for DigestRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestRun")
            .field("config", &self.config)
            .field("mail", &self.mail.name())
            .field("summarizer", &self.summarizer.name())
            .finish()
    }
}

impl DigestRun {
    pub fn new(
        config: RunConfig,
        mail: Box<dyn MailProvider>,
        summarizer: Box<dyn Summarizer>,
    ) -> Self {
        Self {
            config,
            mail,
            summarizer,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs the digest for the current time.
    pub async fn execute(&self) -> RunnerResult<RunOutcome> {
        self.execute_at(Utc::now()).await
    }

    /// Runs the digest as if the current time were `now`.
    pub async fn execute_at(&self, now: DateTime<Utc>) -> RunnerResult<RunOutcome> {
        let span = info_span!(
            "digest_run",
            run_id = %Uuid::new_v4(),
            profile = self.config.profile.as_ref().map(|p| p.name()).unwrap_or("-"),
            window = %self.config.window,
        );
        self.execute_inner(now).instrument(span).await
    }

    async fn execute_inner(&self, now: DateTime<Utc>) -> RunnerResult<RunOutcome> {
        self.config.validate()?;
        let _lock = if self.config.use_lock {
            Some(RunLock::for_profile(&self.config.state_dir, self.config.profile.as_ref())?)
        } else {
            None
        };

        let window = self.config.time_window(now)?;
        info!(%window, "starting digest run");

        self.mail.authenticate().await?;
        let messages = self.mail.fetch_messages(window).await?;
        let threads = group_into_threads(&messages);
        debug!(messages = messages.len(), threads = threads.len(), "grouped messages");

        if threads.is_empty() {
            info!("no recent threads, nothing to send");
            return Ok(RunOutcome::NoThreads);
        }

        let mut entries = Vec::with_capacity(threads.len());
        for (i, thread) in threads.iter().enumerate() {
            debug!(index = i + 1, total = threads.len(), subject = %thread.subject, "summarizing thread");
            let summary = self.summarizer.summarize(thread).await?;
            entries.push(DigestEntry::new(thread, summary));
        }

        let date = self.config.digest_date(now);
        let subject = digest_subject(self.config.window, date);
        let html = DigestRenderer::new(self.config.email_format, self.config.link_mode).render(&entries, date);

        match self.config.delivery {
            Delivery::DryRun => {
                info!(%subject, threads = entries.len(), "dry run, digest not sent");
                Ok(RunOutcome::Rendered {
                    subject,
                    threads: entries.len(),
                    html,
                })
            }
            Delivery::Send => {
                let to = self
                    .config
                    .recipient()
                    .ok_or_else(|| RunnerError::config("Missing TO_EMAIL (digest recipient)"))?;
                self.mail
                    .send_digest(OutgoingMessage::new(to, subject.clone(), html))
                    .await?;
                info!(%subject, threads = entries.len(), "digest email sent");
                Ok(RunOutcome::Sent {
                    subject,
                    threads: entries.len(),
                })
            }
        }
    }
}
