use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::ids::Login;
use crate::ids::ReviewId;
use crate::ids::SlotId;

/// The closed alphabet of side effects `guard-core`'s `step` function can
/// emit. Nothing outside this enum crosses the boundary between the pure
/// state machine and the drivers (`guard-reconcile`, `guard-dispatch`) that
/// execute it. See spec §9.
///
/// Every variant is addressed to exactly one of the two external systems:
/// [`crate::whitelist`]-adjacent school calls (`CancelSlot`, `ChangeSlot`,
/// `RefreshFamilyIndex`) or chat calls (`SendPrompt`, `EditPrompt`,
/// `AckCallback`, `NotifyTimeout`, `NotifyNonWhitelistCancel`). `StoreFields`
/// is the one intent addressed to `guard-store` itself, used when a
/// transition needs to persist fields without changing `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    /// Cancel the calendar slot backing a review. Failures are logged but
    /// never block the terminal transition that triggered them.
    CancelSlot { review_id: ReviewId, slot_id: SlotId },

    /// Move a slot to a new start/end time, used when a whitelisted review
    /// needs to be shifted closer to the deadline.
    ChangeSlot {
        review_id: ReviewId,
        slot_id: SlotId,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    },

    /// Deliver the two-button approve/decline prompt for a review awaiting
    /// a human decision.
    SendPrompt {
        review_id: ReviewId,
        chat_id: String,
        project_name: String,
        family_label: Option<String>,
        review_start: DateTime<Utc>,
    },

    /// Replace the text of a previously sent prompt, used once a decision
    /// has been recorded so the buttons stop soliciting further taps.
    EditPrompt {
        chat_id: String,
        message_id: String,
        text: String,
    },

    /// Acknowledge a callback tap so the chat client stops showing its
    /// loading spinner, regardless of whether the tap changed anything.
    AckCallback { callback_id: String, text: String },

    /// Tell the reviewer a decision window elapsed without a response.
    NotifyTimeout {
        review_id: ReviewId,
        chat_id: String,
    },

    /// Tell the reviewer an unlisted project's slot was auto-cancelled.
    NotifyNonWhitelistCancel {
        review_id: ReviewId,
        chat_id: String,
    },

    /// Re-fetch the project/family graph for a login because the cached
    /// index had no entry for the project under review.
    RefreshFamilyIndex { login: Login },

    /// Persist a set of field writes on a review without changing its
    /// `status`, e.g. recording the resolved `project_name`/`family_label`
    /// before the record can advance to `KNOWN_PROJECT_REVIEW`.
    StoreFields {
        review_id: ReviewId,
        project_name: Option<String>,
        family_label: Option<String>,
    },
}
