use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use guard_protocol::Login;
use guard_protocol::ReviewId;
use guard_protocol::ReviewRequest;
use guard_protocol::ReviewStatus;
use guard_protocol::SlotId;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::StoreError;

pub(crate) struct ReviewRequestRow {
    pub id: String,
    pub login: String,
    pub notification_id: Option<String>,
    pub project_name: Option<String>,
    pub family_label: Option<String>,
    pub review_start: i64,
    pub review_end: i64,
    pub slot_id: String,
    pub decision_deadline: Option<i64>,
    pub non_whitelist_cancel_at: Option<i64>,
    pub chat_message_id: Option<String>,
    pub status: String,
    pub created_at: i64,
    pub decided_at: Option<i64>,
}

impl TryFrom<SqliteRow> for ReviewRequestRow {
    type Error = StoreError;

    fn try_from(row: SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            login: row.try_get("login")?,
            notification_id: row.try_get("notification_id")?,
            project_name: row.try_get("project_name")?,
            family_label: row.try_get("family_label")?,
            review_start: row.try_get("review_start")?,
            review_end: row.try_get("review_end")?,
            slot_id: row.try_get("slot_id")?,
            decision_deadline: row.try_get("decision_deadline")?,
            non_whitelist_cancel_at: row.try_get("non_whitelist_cancel_at")?,
            chat_message_id: row.try_get("chat_message_id")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            decided_at: row.try_get("decided_at")?,
        })
    }
}

fn at(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}

impl TryFrom<ReviewRequestRow> for ReviewRequest {
    type Error = StoreError;

    fn try_from(row: ReviewRequestRow) -> Result<Self, Self::Error> {
        let id = ReviewId::from_str(&row.id).map_err(|_| StoreError::MalformedRow {
            table: "review_requests",
            reason: format!("invalid id {:?}", row.id),
        })?;
        let status = ReviewStatus::from_str(&row.status).map_err(|_| StoreError::MalformedRow {
            table: "review_requests",
            reason: format!("unknown status {:?}", row.status),
        })?;
        Ok(Self {
            id,
            login: Login::new(row.login),
            notification_id: row.notification_id,
            project_name: row.project_name,
            family_label: row.family_label,
            review_start: at(row.review_start),
            review_end: at(row.review_end),
            slot_id: SlotId::new(row.slot_id),
            decision_deadline: row.decision_deadline.map(at),
            non_whitelist_cancel_at: row.non_whitelist_cancel_at.map(at),
            chat_message_id: row.chat_message_id,
            status,
            created_at: at(row.created_at),
            decided_at: row.decided_at.map(at),
        })
    }
}
