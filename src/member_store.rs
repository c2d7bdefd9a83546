use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{MemberEmail, MemberName, UnverifiedMember};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
    UnknownToken,
}

/// Persistence for enrolled members.
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Members still pending verification that were never reminded, or were
    /// last reminded before `reminded_before`.
    ///
    /// The outer error means the store could not be queried at all. Rows
    /// whose stored contact details no longer parse come back as inner
    /// errors so the caller can skip them and carry on.
    async fn unverified_members(
        &self,
        reminded_before: DateTime<Utc>,
    ) -> Result<Vec<Result<UnverifiedMember, anyhow::Error>>, anyhow::Error>;

    async fn record_reminder(
        &self,
        member_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), anyhow::Error>;

    async fn verify(&self, token: &str) -> Result<VerifyOutcome, anyhow::Error>;

    async fn member_count(&self) -> Result<u64, anyhow::Error>;
}

pub struct PgMemberStore {
    pool: PgPool,
}

impl PgMemberStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberStore for PgMemberStore {
    #[tracing::instrument(name = "Get unverified members", skip(self))]
    async fn unverified_members(
        &self,
        reminded_before: DateTime<Utc>,
    ) -> Result<Vec<Result<UnverifiedMember, anyhow::Error>>, anyhow::Error> {
        let rows = sqlx::query(
            r#"
                SELECT id, email, name, verification_token FROM members
                    WHERE status = 'pending_verification'
                    AND (last_reminded_at IS NULL OR last_reminded_at < $1)
            "#,
        )
        .bind(reminded_before)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query unverified members.")?;

        let members = rows
            .into_iter()
            .map(|row| -> Result<UnverifiedMember, anyhow::Error> {
                let id: Uuid = row.try_get("id")?;
                let email = MemberEmail::parse(row.try_get("email")?)
                    .map_err(|e| anyhow::anyhow!(e))
                    .with_context(|| format!("Member {} has an invalid email.", id))?;
                let name = MemberName::parse(row.try_get("name")?)
                    .map_err(|e| anyhow::anyhow!(e))
                    .with_context(|| format!("Member {} has an invalid name.", id))?;
                let verification_token: String = row.try_get("verification_token")?;
                Ok(UnverifiedMember {
                    id,
                    email,
                    name,
                    verification_token,
                })
            })
            .collect();

        Ok(members)
    }

    #[tracing::instrument(name = "Record a verification reminder", skip(self))]
    async fn record_reminder(
        &self,
        member_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), anyhow::Error> {
        sqlx::query(r#"UPDATE members SET last_reminded_at = $1 WHERE id = $2"#)
            .bind(at)
            .bind(member_id)
            .execute(&self.pool)
            .await
            .context("Failed to record the reminder timestamp.")?;
        Ok(())
    }

    #[tracing::instrument(name = "Verify a member", skip(self, token))]
    async fn verify(&self, token: &str) -> Result<VerifyOutcome, anyhow::Error> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .context("Failed to acquire a Postgres connection from the pool.")?;

        let row = sqlx::query(
            r#"SELECT id, status FROM members WHERE verification_token = $1 FOR UPDATE"#,
        )
        .bind(token)
        .fetch_optional(&mut *transaction)
        .await
        .context("Failed to look up the verification token.")?;

        let outcome = match row {
            None => VerifyOutcome::UnknownToken,
            Some(row) => {
                let id: Uuid = row.try_get("id")?;
                let status: String = row.try_get("status")?;
                if status == "pending_verification" {
                    sqlx::query(r#"UPDATE members SET status = 'verified' WHERE id = $1"#)
                        .bind(id)
                        .execute(&mut *transaction)
                        .await
                        .context("Failed to mark the member as verified.")?;
                    VerifyOutcome::Verified
                } else {
                    VerifyOutcome::AlreadyVerified
                }
            }
        };

        transaction
            .commit()
            .await
            .context("Failed to commit the verification.")?;
        Ok(outcome)
    }

    #[tracing::instrument(name = "Count members", skip(self))]
    async fn member_count(&self) -> Result<u64, anyhow::Error> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM members"#)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count members.")?;
        Ok(count.max(0) as u64)
    }
}
