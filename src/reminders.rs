use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

use crate::verification::{ReminderOutcome, VerificationScheme};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub fulfilled: usize,
    pub rejected: usize,
}

/// Periodically asks a `VerificationScheme` to remind every unverified
/// member. Each sweep is independent: failures are logged and forgotten,
/// and the next sweep runs `check_period` after the previous one ended.
pub struct ReminderSweeper {
    scheme: Arc<dyn VerificationScheme>,
    challenge_url: Url,
    check_period: Duration,
}

impl ReminderSweeper {
    pub fn new(
        scheme: Arc<dyn VerificationScheme>,
        challenge_url: Url,
        check_period: Duration,
    ) -> Self {
        Self {
            scheme,
            challenge_url,
            check_period,
        }
    }

    pub fn challenge_url(&self) -> &Url {
        &self.challenge_url
    }

    /// Run a single sweep. Never fails; rejected outcomes are logged once
    /// each.
    #[tracing::instrument(name = "Reminder sweep", skip(self), fields(challenge_url = %self.challenge_url))]
    pub async fn run_sweep(&self) -> SweepReport {
        let outcomes = self.scheme.remind_unverified(&self.challenge_url).await;

        let mut report = SweepReport::default();
        for outcome in outcomes {
            match outcome {
                ReminderOutcome::Fulfilled { .. } => report.fulfilled += 1,
                ReminderOutcome::Rejected { member_id, reason } => {
                    report.rejected += 1;
                    tracing::warn!(
                        member_id = ?member_id,
                        error.cause_chain = ?reason,
                        "Failed to send a verification reminder.",
                    );
                }
            }
        }
        tracing::info!(
            fulfilled = report.fulfilled,
            rejected = report.rejected,
            "Reminder sweep finished"
        );
        report
    }

    /// Spawn the sweep loop. The first sweep starts right away.
    pub fn start(self) -> SweeperHandle {
        let (cancel, mut cancelled) = watch::channel(false);
        let task = tokio::spawn(async move {
            loop {
                if *cancelled.borrow() {
                    break;
                }
                self.run_sweep().await;

                tokio::select! {
                    _ = tokio::time::sleep(self.check_period) => {}
                    Ok(()) = cancelled.changed() => {}
                }
            }
            tracing::info!("Reminder sweeper stopped");
        });
        SweeperHandle { cancel, task }
    }
}

/// Controls a running sweep loop. Dropping the handle detaches the loop,
/// which then runs until the process exits.
pub struct SweeperHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Ask the loop to stop. A sweep already in flight finishes first; no
    /// further sweep is started.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait for the loop to wind down.
    pub async fn stop(self) {
        self.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error.cause_chain = ?e, "Reminder sweeper task failed");
        }
    }
}
