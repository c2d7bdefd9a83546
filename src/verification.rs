use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;
use uuid::Uuid;

use crate::domain::UnverifiedMember;
use crate::email_client::EmailClient;
use crate::member_store::MemberStore;
use crate::templates;

/// How a single reminder attempt settled.
#[derive(Debug)]
pub enum ReminderOutcome {
    Fulfilled {
        member_id: Uuid,
    },
    /// `member_id` is `None` when the failure happened before a member
    /// could be identified (store unreachable, unreadable row).
    Rejected {
        member_id: Option<Uuid>,
        reason: anyhow::Error,
    },
}

impl ReminderOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Sends verification reminders to every member who still needs one.
///
/// Implementations never fail as a whole: every problem is reported as a
/// rejected outcome.
#[async_trait]
pub trait VerificationScheme: Send + Sync {
    async fn remind_unverified(&self, challenge_url: &Url) -> Vec<ReminderOutcome>;
}

/// Email-based verification: members prove ownership of their address by
/// following a tokenized link.
pub struct EmailVerification {
    store: Arc<dyn MemberStore>,
    email_client: Arc<EmailClient>,
    reminder_interval: chrono::Duration,
    max_concurrency: usize,
}

impl EmailVerification {
    pub fn new(
        store: Arc<dyn MemberStore>,
        email_client: Arc<EmailClient>,
        reminder_interval: chrono::Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            store,
            email_client,
            reminder_interval,
            max_concurrency: max_concurrency.max(1),
        }
    }
}

#[async_trait]
impl VerificationScheme for EmailVerification {
    #[tracing::instrument(name = "Remind unverified members", skip(self, challenge_url))]
    async fn remind_unverified(&self, challenge_url: &Url) -> Vec<ReminderOutcome> {
        let reminded_before = Utc::now() - self.reminder_interval;
        let members = match self.store.unverified_members(reminded_before).await {
            Ok(members) => members,
            Err(reason) => {
                return vec![ReminderOutcome::Rejected {
                    member_id: None,
                    reason,
                }]
            }
        };

        let mut outcomes = Vec::with_capacity(members.len());
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut attempts = JoinSet::new();

        for member in members {
            let member = match member {
                Ok(member) => member,
                Err(reason) => {
                    outcomes.push(ReminderOutcome::Rejected {
                        member_id: None,
                        reason,
                    });
                    continue;
                }
            };
            let permits = Arc::clone(&permits);
            let store = Arc::clone(&self.store);
            let email_client = Arc::clone(&self.email_client);
            let challenge_url = challenge_url.clone();
            attempts.spawn(async move {
                let member_id = member.id;
                // The semaphore is never closed.
                let _permit = permits.acquire_owned().await;
                match remind(&*store, &email_client, &challenge_url, member).await {
                    Ok(()) => ReminderOutcome::Fulfilled { member_id },
                    Err(reason) => ReminderOutcome::Rejected {
                        member_id: Some(member_id),
                        reason,
                    },
                }
            });
        }

        while let Some(joined) = attempts.join_next().await {
            let outcome = joined.unwrap_or_else(|e| ReminderOutcome::Rejected {
                member_id: None,
                reason: anyhow::Error::new(e).context("A reminder task did not complete."),
            });
            outcomes.push(outcome);
        }
        outcomes
    }
}

#[tracing::instrument(
    name = "Send a verification reminder",
    skip(store, email_client, challenge_url, member),
    fields(member_id = %member.id)
)]
async fn remind(
    store: &dyn MemberStore,
    email_client: &EmailClient,
    challenge_url: &Url,
    member: UnverifiedMember,
) -> Result<(), anyhow::Error> {
    let link = verification_link(challenge_url, &member.verification_token);

    let mut context = tera::Context::new();
    context.insert("name", member.name.as_ref());
    context.insert("link", link.as_str());
    let html_body =
        templates::render("emails/reminder.html", &context).context("Failed to render the reminder.")?;
    let plain_body =
        templates::render("emails/reminder.txt", &context).context("Failed to render the reminder.")?;

    email_client
        .send_email(
            &member.email,
            "Please verify your email address",
            &html_body,
            &plain_body,
        )
        .await
        .with_context(|| format!("Failed to send a verification reminder to {}", member.email))?;

    store
        .record_reminder(member.id, Utc::now())
        .await
        .context("Failed to record the reminder.")?;
    Ok(())
}

pub fn verification_link(challenge_url: &Url, token: &str) -> Url {
    let mut link = challenge_url.clone();
    link.query_pairs_mut().append_pair("token", token);
    link
}
