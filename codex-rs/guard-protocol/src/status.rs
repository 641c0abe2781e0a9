use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;
use strum_macros::EnumString;

use crate::ids::Login;
use crate::ids::ReviewId;
use crate::ids::SlotId;

/// The ten states a [`ReviewRequest`] can be in. See spec §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    /// Booking ingested; project name not yet resolved from the notification.
    UnknownProjectReview,
    /// Project name and family resolved; classification pending.
    KnownProjectReview,
    /// Project or family matches the whitelist; awaiting an optional slot shift.
    Whitelisted,
    /// No whitelist match; auto-cancel armed.
    NotWhitelisted,
    /// Classification deferred; the reviewer must be asked now.
    NeedToApprove,
    /// Chat prompt delivered; awaiting the reviewer's action or a timeout.
    WaitingForApprove,
    /// Accepted, either via a whitelist shift or an explicit approval.
    Approved,
    /// The reviewer declined.
    Cancelled,
    /// Timed out in `WaitingForApprove`, or cleanup cancelled a short/shifted slot.
    AutoCancelled,
    /// The non-whitelist delay elapsed without an override.
    AutoCancelledNotWhitelisted,
}

impl ReviewStatus {
    /// Terminal states are sinks: no further transition is permitted.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReviewStatus::Approved
                | ReviewStatus::Cancelled
                | ReviewStatus::AutoCancelled
                | ReviewStatus::AutoCancelledNotWhitelisted
        )
    }
}

/// The core entity: one outstanding (or decided) review request. See spec §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub id: ReviewId,
    pub login: Login,
    pub notification_id: Option<String>,
    pub project_name: Option<String>,
    pub family_label: Option<String>,
    pub review_start: DateTime<Utc>,
    pub review_end: DateTime<Utc>,
    pub slot_id: SlotId,
    pub decision_deadline: Option<DateTime<Utc>>,
    pub non_whitelist_cancel_at: Option<DateTime<Utc>>,
    pub chat_message_id: Option<String>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl ReviewRequest {
    /// A freshly ingested booking, per spec §4.2 step 2d.
    pub fn new_from_booking(
        login: Login,
        slot_id: SlotId,
        notification_id: String,
        review_start: DateTime<Utc>,
        review_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReviewId::new(),
            login,
            notification_id: Some(notification_id),
            project_name: None,
            family_label: None,
            review_start,
            review_end,
            slot_id,
            decision_deadline: None,
            non_whitelist_cancel_at: None,
            chat_message_id: None,
            status: ReviewStatus::UnknownProjectReview,
            created_at: now,
            decided_at: None,
        }
    }
}
