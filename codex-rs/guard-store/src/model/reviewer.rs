use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use guard_protocol::Login;
use guard_protocol::Reviewer;
use guard_protocol::ReviewerSettings;
use guard_protocol::ReviewerStatus;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::StoreError;

pub(crate) struct ReviewerRow {
    pub login: String,
    pub chat_id: String,
    pub status: String,
    pub created_at: i64,
    pub last_auth_success_at: Option<i64>,
    pub last_auth_failure_at: Option<i64>,
}

impl TryFrom<SqliteRow> for ReviewerRow {
    type Error = StoreError;

    fn try_from(row: SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            login: row.try_get("login")?,
            chat_id: row.try_get("chat_id")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            last_auth_success_at: row.try_get("last_auth_success_at")?,
            last_auth_failure_at: row.try_get("last_auth_failure_at")?,
        })
    }
}

impl TryFrom<ReviewerRow> for Reviewer {
    type Error = StoreError;

    fn try_from(row: ReviewerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            login: Login::new(row.login),
            chat_id: row.chat_id,
            status: ReviewerStatus::from_str(&row.status).map_err(|_| StoreError::MalformedRow {
                table: "reviewers",
                reason: format!("unknown status {:?}", row.status),
            })?,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_else(Utc::now),
            last_auth_success_at: row.last_auth_success_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            last_auth_failure_at: row.last_auth_failure_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
        })
    }
}

pub(crate) struct ReviewerSettingsRow {
    pub response_deadline_shift_minutes: i64,
    pub non_whitelist_cancel_delay_minutes: i64,
    pub notify_whitelist_timeout: bool,
    pub notify_non_whitelist_cancel: bool,
    pub slot_shift_threshold_minutes: i64,
    pub slot_shift_duration_minutes: i64,
    pub cleanup_duration_minutes: i64,
}

impl TryFrom<SqliteRow> for ReviewerSettingsRow {
    type Error = StoreError;

    fn try_from(row: SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            response_deadline_shift_minutes: row.try_get("response_deadline_shift_minutes")?,
            non_whitelist_cancel_delay_minutes: row.try_get("non_whitelist_cancel_delay_minutes")?,
            notify_whitelist_timeout: row.try_get("notify_whitelist_timeout")?,
            notify_non_whitelist_cancel: row.try_get("notify_non_whitelist_cancel")?,
            slot_shift_threshold_minutes: row.try_get("slot_shift_threshold_minutes")?,
            slot_shift_duration_minutes: row.try_get("slot_shift_duration_minutes")?,
            cleanup_duration_minutes: row.try_get("cleanup_duration_minutes")?,
        })
    }
}

impl From<ReviewerSettingsRow> for ReviewerSettings {
    fn from(row: ReviewerSettingsRow) -> Self {
        Self {
            response_deadline_shift_minutes: row.response_deadline_shift_minutes,
            non_whitelist_cancel_delay_minutes: row.non_whitelist_cancel_delay_minutes,
            notify_whitelist_timeout: row.notify_whitelist_timeout,
            notify_non_whitelist_cancel: row.notify_non_whitelist_cancel,
            slot_shift_threshold_minutes: row.slot_shift_threshold_minutes,
            slot_shift_duration_minutes: row.slot_shift_duration_minutes,
            cleanup_duration_minutes: row.cleanup_duration_minutes,
        }
    }
}
