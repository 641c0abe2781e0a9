use chrono::DateTime;
use chrono::Utc;
use guard_protocol::Login;
use guard_protocol::ReviewId;
use guard_protocol::ReviewRequest;
use guard_protocol::ReviewStatus;
use guard_protocol::SlotId;
use sqlx::QueryBuilder;
use sqlx::Sqlite;

use crate::model::ReviewRequestRow;
use crate::StoreError;
use crate::StoreRuntime;

/// The set of field writes and the target status for a single transition
/// commit. `None` fields are left untouched. See spec §5: every transition
/// is a conditional write keyed on the row's current status, so a
/// tick-driven timeout and an in-flight callback racing the same review
/// never both apply.
#[derive(Debug, Clone, Default)]
pub struct TransitionPatch {
    pub new_status: Option<ReviewStatus>,
    pub project_name: Option<String>,
    pub family_label: Option<String>,
    pub decision_deadline: Option<DateTime<Utc>>,
    pub non_whitelist_cancel_at: Option<DateTime<Utc>>,
    pub chat_message_id: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl StoreRuntime {
    pub async fn insert_review_request(&self, review: &ReviewRequest) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO review_requests
                   (id, login, notification_id, project_name, family_label, review_start,
                    review_end, slot_id, decision_deadline, non_whitelist_cancel_at,
                    chat_message_id, status, created_at, decided_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(review.id.as_uuid().to_string())
        .bind(review.login.as_str())
        .bind(&review.notification_id)
        .bind(&review.project_name)
        .bind(&review.family_label)
        .bind(review.review_start.timestamp())
        .bind(review.review_end.timestamp())
        .bind(review.slot_id.as_str())
        .bind(review.decision_deadline.map(|t| t.timestamp()))
        .bind(review.non_whitelist_cancel_at.map(|t| t.timestamp()))
        .bind(&review.chat_message_id)
        .bind(review.status.to_string())
        .bind(review.created_at.timestamp())
        .bind(review.decided_at.map(|t| t.timestamp()))
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_review_request(&self, id: ReviewId) -> Result<Option<ReviewRequest>, StoreError> {
        let row = sqlx::query(
            r#"SELECT id, login, notification_id, project_name, family_label, review_start,
                      review_end, slot_id, decision_deadline, non_whitelist_cancel_at,
                      chat_message_id, status, created_at, decided_at
               FROM review_requests WHERE id = ?"#,
        )
        .bind(id.as_uuid().to_string())
        .fetch_optional(self.pool())
        .await?;
        row.map(|row| ReviewRequestRow::try_from(row).and_then(ReviewRequest::try_from))
            .transpose()
    }

    /// Every non-terminal review for a login, oldest first — the working
    /// set the reconciliation loop steps through each tick.
    pub async fn list_open_reviews(&self, login: &Login) -> Result<Vec<ReviewRequest>, StoreError> {
        let terminal = [
            ReviewStatus::Approved,
            ReviewStatus::Cancelled,
            ReviewStatus::AutoCancelled,
            ReviewStatus::AutoCancelledNotWhitelisted,
        ];
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"SELECT id, login, notification_id, project_name, family_label, review_start,
                      review_end, slot_id, decision_deadline, non_whitelist_cancel_at,
                      chat_message_id, status, created_at, decided_at
               FROM review_requests WHERE login = "#,
        );
        builder.push_bind(login.as_str());
        builder.push(" AND status NOT IN (");
        let mut separated = builder.separated(", ");
        for status in terminal {
            separated.push_bind(status.to_string());
        }
        builder.push(") ORDER BY created_at ASC");

        let rows = builder.build().fetch_all(self.pool()).await?;
        rows.into_iter()
            .map(|row| ReviewRequestRow::try_from(row).and_then(ReviewRequest::try_from))
            .collect()
    }

    /// Used by booking ingestion to tell whether a calendar slot already has
    /// an open review request, so the same booking is never double-ingested.
    pub async fn find_open_by_slot_id(&self, slot_id: &SlotId) -> Result<Option<ReviewRequest>, StoreError> {
        let row = sqlx::query(
            r#"SELECT id, login, notification_id, project_name, family_label, review_start,
                      review_end, slot_id, decision_deadline, non_whitelist_cancel_at,
                      chat_message_id, status, created_at, decided_at
               FROM review_requests WHERE slot_id = ?
               ORDER BY created_at DESC LIMIT 1"#,
        )
        .bind(slot_id.as_str())
        .fetch_optional(self.pool())
        .await?;
        row.map(|row| ReviewRequestRow::try_from(row).and_then(ReviewRequest::try_from))
            .transpose()
    }

    /// Apply `patch` to the review at `id`, succeeding only if its current
    /// `status` is still `expected_status`. Returns `false` (no error) if
    /// another writer already moved the row on — the caller retries or
    /// drops the stale transition on the next tick.
    pub async fn commit_transition(
        &self,
        id: ReviewId,
        expected_status: ReviewStatus,
        patch: TransitionPatch,
    ) -> Result<bool, StoreError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE review_requests SET ");
        let mut separated = builder.separated(", ");
        if let Some(status) = patch.new_status {
            separated.push("status = ");
            separated.push_bind_unseparated(status.to_string());
        }
        if let Some(project_name) = &patch.project_name {
            separated.push("project_name = ");
            separated.push_bind_unseparated(project_name);
        }
        if let Some(family_label) = &patch.family_label {
            separated.push("family_label = ");
            separated.push_bind_unseparated(family_label);
        }
        if let Some(decision_deadline) = patch.decision_deadline {
            separated.push("decision_deadline = ");
            separated.push_bind_unseparated(decision_deadline.timestamp());
        }
        if let Some(non_whitelist_cancel_at) = patch.non_whitelist_cancel_at {
            separated.push("non_whitelist_cancel_at = ");
            separated.push_bind_unseparated(non_whitelist_cancel_at.timestamp());
        }
        if let Some(chat_message_id) = &patch.chat_message_id {
            separated.push("chat_message_id = ");
            separated.push_bind_unseparated(chat_message_id);
        }
        if let Some(decided_at) = patch.decided_at {
            separated.push("decided_at = ");
            separated.push_bind_unseparated(decided_at.timestamp());
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id.as_uuid().to_string());
        builder.push(" AND status = ");
        builder.push_bind(expected_status.to_string());

        let result = builder.build().execute(self.pool()).await?;
        Ok(result.rows_affected() == 1)
    }
}
