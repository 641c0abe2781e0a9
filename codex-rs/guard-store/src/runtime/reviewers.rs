use chrono::DateTime;
use chrono::Utc;
use guard_protocol::Login;
use guard_protocol::Reviewer;
use guard_protocol::ReviewerStatus;

use crate::model::ReviewerRow;
use crate::StoreError;
use crate::StoreRuntime;

impl StoreRuntime {
    pub async fn upsert_reviewer(&self, reviewer: &Reviewer) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO reviewers (login, chat_id, status, created_at, last_auth_success_at, last_auth_failure_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(login) DO UPDATE SET chat_id = excluded.chat_id, status = excluded.status"#,
        )
        .bind(reviewer.login.as_str())
        .bind(&reviewer.chat_id)
        .bind(reviewer.status.to_string())
        .bind(reviewer.created_at.timestamp())
        .bind(reviewer.last_auth_success_at.map(|t| t.timestamp()))
        .bind(reviewer.last_auth_failure_at.map(|t| t.timestamp()))
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_reviewer(&self, login: &Login) -> Result<Option<Reviewer>, StoreError> {
        let row = sqlx::query(
            "SELECT login, chat_id, status, created_at, last_auth_success_at, last_auth_failure_at
             FROM reviewers WHERE login = ?",
        )
            .bind(login.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.map(|row| ReviewerRow::try_from(row).and_then(Reviewer::try_from))
            .transpose()
    }

    pub async fn set_reviewer_status(&self, login: &Login, status: ReviewerStatus) -> Result<(), StoreError> {
        sqlx::query("UPDATE reviewers SET status = ? WHERE login = ?")
            .bind(status.to_string())
            .bind(login.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Record a successful credential exchange, per spec §3/§4.5.
    pub async fn record_auth_success(&self, login: &Login, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE reviewers SET last_auth_success_at = ? WHERE login = ?")
            .bind(at.timestamp())
            .bind(login.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Record a rejected credential exchange, per spec §3/§4.5.
    pub async fn record_auth_failure(&self, login: &Login, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE reviewers SET last_auth_failure_at = ? WHERE login = ?")
            .bind(at.timestamp())
            .bind(login.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Resolve the reviewer a chat event belongs to. Every command and
    /// callback starts here; absence is the uniform "please authenticate"
    /// case in spec §4.3/§4.5.
    pub async fn get_reviewer_by_chat_id(&self, chat_id: &str) -> Result<Option<Reviewer>, StoreError> {
        let row = sqlx::query(
            "SELECT login, chat_id, status, created_at, last_auth_success_at, last_auth_failure_at
             FROM reviewers WHERE chat_id = ?",
        )
            .bind(chat_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(|row| ReviewerRow::try_from(row).and_then(Reviewer::try_from))
            .transpose()
    }

    /// Every reviewer the reconciliation loop should fan out to this tick.
    pub async fn list_active_reviewers(&self) -> Result<Vec<Reviewer>, StoreError> {
        let rows = sqlx::query(
            "SELECT login, chat_id, status, created_at, last_auth_success_at, last_auth_failure_at
             FROM reviewers WHERE status = ? ORDER BY login",
        )
            .bind(ReviewerStatus::Active.to_string())
            .fetch_all(self.pool())
            .await?;
        rows.into_iter()
            .map(|row| ReviewerRow::try_from(row).and_then(Reviewer::try_from))
            .collect()
    }
}
