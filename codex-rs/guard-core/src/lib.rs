//! The pure review-slot state machine (spec §4.1).
//!
//! [`step`] takes a snapshot of one [`ReviewRequest`] plus everything needed
//! to decide its next move and returns a [`StepOutcome`] describing what
//! should happen — never what did happen. No I/O crosses this boundary:
//! callers (`guard-reconcile`, `guard-dispatch`) execute the emitted
//! [`Intent`]s and persist the resulting fields through `guard-store`.
//!
//! Some transitions depend on whether an intent they emit actually
//! succeeds (sending a chat prompt, moving a calendar slot). `step` can't
//! know that in advance, so those cases come back as [`StepOutcome::Gated`]:
//! both the success and failure continuations, computed up front. The
//! caller executes the one gating intent and then applies whichever branch
//! matches the outcome.

mod whitelist;

use chrono::DateTime;
use chrono::Utc;
use guard_clock::add_minutes;
use guard_clock::has_elapsed;
use guard_clock::minutes_between;
use guard_clock::more_than_minutes_away;
use guard_protocol::Decision;
use guard_protocol::Intent;
use guard_protocol::ProjectFamilyIndex;
use guard_protocol::Reviewer;
use guard_protocol::ReviewRequest;
use guard_protocol::ReviewStatus;
use guard_protocol::ReviewerSettings;
use guard_protocol::WhitelistEntry;

pub use whitelist::is_whitelisted;

/// A set of field writes to apply to a [`ReviewRequest`] alongside a status
/// change. `None` means "leave as-is" — fields are only ever set, never
/// cleared, matching the invariants in spec §3.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    pub project_name: Option<String>,
    pub family_label: Option<String>,
    pub decision_deadline: Option<DateTime<Utc>>,
    pub non_whitelist_cancel_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    /// Set when this patch's `chat_message_id` can only be known once the
    /// gating `SendPrompt` intent has actually executed. The caller fills
    /// in the real id returned by the chat adapter before persisting.
    pub chat_message_id_pending: bool,
    pub chat_message_id: Option<String>,
}

/// One side of a [`StepOutcome::Gated`] decision: what to commit depending
/// on whether the gating intent succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct GatedBranch {
    pub next_status: ReviewStatus,
    pub patch: FieldPatch,
    pub intents: Vec<Intent>,
}

/// What a single `step` invocation decided to do with a review.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Nothing to do this tick; re-evaluate later with no side effects.
    NoOp,
    /// Commit unconditionally: the intents' success or failure does not
    /// change which status to land in (failures are logged by the caller
    /// but never block the transition — spec §4.1's `CancelSlot` rule).
    Commit {
        next_status: ReviewStatus,
        patch: FieldPatch,
        intents: Vec<Intent>,
    },
    /// Execute `intent` first; commit `on_success` if it succeeded,
    /// `on_failure` otherwise.
    Gated {
        intent: Intent,
        on_success: Box<GatedBranch>,
        on_failure: Box<GatedBranch>,
    },
    /// An invariant the machine depends on was violated (spec §7, `Fatal`).
    /// The caller logs `reason` and abandons this single review; it does
    /// not propagate.
    Abandon { reason: String },
}

/// Everything `step` needs to decide a review's next move. Carries no
/// hidden state — two calls with equal inputs always return equal outputs.
pub struct StepInputs<'a> {
    pub review: &'a ReviewRequest,
    pub reviewer: &'a Reviewer,
    pub settings: ReviewerSettings,
    pub now: DateTime<Utc>,
    pub whitelist: &'a [WhitelistEntry],
    pub family_index: &'a ProjectFamilyIndex,
    /// The project name read off the notification this review was created
    /// from, if the caller has already resolved it. `None` while the
    /// notification lookup is still pending (spec's `NotificationMissing`,
    /// retried next tick).
    pub resolved_project_name: Option<String>,
    /// `Some` only for callback-driven invocations (spec §4.3 step 4).
    pub decision: Option<Decision>,
    /// The chat callback id to acknowledge, meaningful only alongside
    /// `decision`.
    pub callback_id: String,
}

/// Advance one review by exactly one transition. See spec §4.1.
pub fn step(input: StepInputs<'_>) -> StepOutcome {
    let review = input.review;

    if let Some(decision) = input.decision {
        if review.status != ReviewStatus::WaitingForApprove {
            return StepOutcome::Commit {
                next_status: review.status,
                patch: FieldPatch::default(),
                intents: vec![Intent::AckCallback {
                    callback_id: input.callback_id,
                    text: "already decided".to_string(),
                }],
            };
        }
        return step_waiting_for_approve_callback(&input, decision);
    }

    if review.status.is_terminal() {
        return StepOutcome::NoOp;
    }

    match review.status {
        ReviewStatus::UnknownProjectReview => step_unknown_project_review(&input),
        ReviewStatus::KnownProjectReview => step_known_project_review(&input),
        ReviewStatus::Whitelisted => step_whitelisted(&input),
        ReviewStatus::NotWhitelisted => step_not_whitelisted(&input),
        ReviewStatus::NeedToApprove => step_need_to_approve(&input),
        ReviewStatus::WaitingForApprove => step_waiting_for_approve_timeout(&input),
        ReviewStatus::Approved
        | ReviewStatus::Cancelled
        | ReviewStatus::AutoCancelled
        | ReviewStatus::AutoCancelledNotWhitelisted => StepOutcome::NoOp,
    }
}

fn step_unknown_project_review(input: &StepInputs<'_>) -> StepOutcome {
    let Some(project_name) = input.resolved_project_name.clone() else {
        // NotificationMissing: nothing to persist yet, retried next tick.
        return StepOutcome::NoOp;
    };

    match input.family_index.family_of(&project_name) {
        Some(family_label) => StepOutcome::Commit {
            next_status: ReviewStatus::KnownProjectReview,
            patch: FieldPatch {
                project_name: Some(project_name),
                family_label: Some(family_label.to_string()),
                ..FieldPatch::default()
            },
            intents: Vec::new(),
        },
        None => StepOutcome::Commit {
            next_status: ReviewStatus::UnknownProjectReview,
            patch: FieldPatch {
                project_name: Some(project_name.clone()),
                ..FieldPatch::default()
            },
            intents: vec![Intent::RefreshFamilyIndex {
                login: input.reviewer.login.clone(),
            }],
        },
    }
}

fn step_known_project_review(input: &StepInputs<'_>) -> StepOutcome {
    let review = input.review;
    let Some(project_name) = review.project_name.as_deref() else {
        return StepOutcome::Abandon {
            reason: "KNOWN_PROJECT_REVIEW without a resolved project_name".to_string(),
        };
    };

    let deadline = add_minutes(review.review_start, -input.settings.response_deadline_shift_minutes);
    let past_deadline = has_elapsed(deadline, input.now);
    let within_shift_window = !more_than_minutes_away(
        review.review_start,
        input.now,
        input.settings.slot_shift_threshold_minutes,
    );

    if past_deadline || within_shift_window {
        return StepOutcome::Commit {
            next_status: ReviewStatus::NeedToApprove,
            patch: FieldPatch::default(),
            intents: Vec::new(),
        };
    }

    if is_whitelisted(project_name, review.family_label.as_deref(), input.whitelist) {
        StepOutcome::Commit {
            next_status: ReviewStatus::Whitelisted,
            patch: FieldPatch::default(),
            intents: Vec::new(),
        }
    } else {
        StepOutcome::Commit {
            next_status: ReviewStatus::NotWhitelisted,
            patch: FieldPatch {
                non_whitelist_cancel_at: Some(add_minutes(
                    input.now,
                    input.settings.non_whitelist_cancel_delay_minutes,
                )),
                ..FieldPatch::default()
            },
            intents: Vec::new(),
        }
    }
}

fn step_whitelisted(input: &StepInputs<'_>) -> StepOutcome {
    let review = input.review;

    if more_than_minutes_away(review.review_start, input.now, input.settings.slot_shift_threshold_minutes) {
        // Plenty of lead time left; nothing to do yet.
        return StepOutcome::NoOp;
    }

    let slot_length_minutes = minutes_between(review.review_start, review.review_end);
    if slot_length_minutes <= input.settings.cleanup_duration_minutes {
        return StepOutcome::Commit {
            next_status: ReviewStatus::AutoCancelled,
            patch: FieldPatch {
                decided_at: Some(input.now),
                ..FieldPatch::default()
            },
            intents: vec![Intent::CancelSlot {
                review_id: review.id,
                slot_id: review.slot_id.clone(),
            }],
        };
    }

    let new_start = add_minutes(review.review_start, -input.settings.slot_shift_duration_minutes);
    let new_end = add_minutes(new_start, slot_length_minutes);
    StepOutcome::Gated {
        intent: Intent::ChangeSlot {
            review_id: review.id,
            slot_id: review.slot_id.clone(),
            new_start,
            new_end,
        },
        // See spec §9's open question: a pure-whitelist shift never records
        // an explicit APPROVED; the review simply stays WHITELISTED.
        on_success: Box::new(GatedBranch {
            next_status: ReviewStatus::Whitelisted,
            patch: FieldPatch::default(),
            intents: Vec::new(),
        }),
        on_failure: Box::new(GatedBranch {
            next_status: ReviewStatus::AutoCancelled,
            patch: FieldPatch {
                decided_at: Some(input.now),
                ..FieldPatch::default()
            },
            intents: vec![Intent::CancelSlot {
                review_id: review.id,
                slot_id: review.slot_id.clone(),
            }],
        }),
    }
}

fn step_not_whitelisted(input: &StepInputs<'_>) -> StepOutcome {
    let review = input.review;
    let Some(cancel_at) = review.non_whitelist_cancel_at else {
        return StepOutcome::Abandon {
            reason: "NOT_WHITELISTED without non_whitelist_cancel_at".to_string(),
        };
    };

    if !has_elapsed(cancel_at, input.now) {
        return StepOutcome::NoOp;
    }

    let mut intents = Vec::new();
    if input.settings.notify_non_whitelist_cancel {
        intents.push(Intent::NotifyNonWhitelistCancel {
            review_id: review.id,
            chat_id: input.reviewer.chat_id.clone(),
        });
    }
    intents.push(Intent::CancelSlot {
        review_id: review.id,
        slot_id: review.slot_id.clone(),
    });

    StepOutcome::Commit {
        next_status: ReviewStatus::AutoCancelledNotWhitelisted,
        patch: FieldPatch {
            decided_at: Some(input.now),
            ..FieldPatch::default()
        },
        intents,
    }
}

fn step_need_to_approve(input: &StepInputs<'_>) -> StepOutcome {
    let review = input.review;
    let Some(project_name) = review.project_name.clone() else {
        return StepOutcome::Abandon {
            reason: "NEED_TO_APPROVE without a resolved project_name".to_string(),
        };
    };
    let deadline = add_minutes(review.review_start, -input.settings.response_deadline_shift_minutes);

    StepOutcome::Gated {
        intent: Intent::SendPrompt {
            review_id: review.id,
            chat_id: input.reviewer.chat_id.clone(),
            project_name,
            family_label: review.family_label.clone(),
            review_start: review.review_start,
        },
        on_success: Box::new(GatedBranch {
            next_status: ReviewStatus::WaitingForApprove,
            patch: FieldPatch {
                decision_deadline: Some(deadline),
                chat_message_id_pending: true,
                ..FieldPatch::default()
            },
            intents: Vec::new(),
        }),
        on_failure: Box::new(GatedBranch {
            next_status: ReviewStatus::NeedToApprove,
            patch: FieldPatch::default(),
            intents: Vec::new(),
        }),
    }
}

fn step_waiting_for_approve_timeout(input: &StepInputs<'_>) -> StepOutcome {
    let review = input.review;
    let Some(decision_deadline) = review.decision_deadline else {
        return StepOutcome::Abandon {
            reason: "WAITING_FOR_APPROVE without a decision_deadline".to_string(),
        };
    };

    if !has_elapsed(decision_deadline, input.now) {
        return StepOutcome::NoOp;
    }

    let mut intents = Vec::new();
    if input.settings.notify_whitelist_timeout {
        intents.push(Intent::NotifyTimeout {
            review_id: review.id,
            chat_id: input.reviewer.chat_id.clone(),
        });
    }
    intents.push(Intent::CancelSlot {
        review_id: review.id,
        slot_id: review.slot_id.clone(),
    });

    StepOutcome::Commit {
        next_status: ReviewStatus::AutoCancelled,
        patch: FieldPatch {
            decided_at: Some(input.now),
            ..FieldPatch::default()
        },
        intents,
    }
}

fn step_waiting_for_approve_callback(input: &StepInputs<'_>, decision: Decision) -> StepOutcome {
    let review = input.review;
    let chat_id = input.reviewer.chat_id.clone();
    let message_id = review.chat_message_id.clone().unwrap_or_default();

    match decision {
        Decision::Approve => StepOutcome::Commit {
            next_status: ReviewStatus::Approved,
            patch: FieldPatch {
                decided_at: Some(input.now),
                ..FieldPatch::default()
            },
            intents: vec![
                Intent::EditPrompt {
                    chat_id,
                    message_id,
                    text: "Approved.".to_string(),
                },
                Intent::AckCallback {
                    callback_id: input.callback_id.clone(),
                    text: "approved".to_string(),
                },
            ],
        },
        Decision::Decline => StepOutcome::Commit {
            next_status: ReviewStatus::Cancelled,
            patch: FieldPatch {
                decided_at: Some(input.now),
                ..FieldPatch::default()
            },
            intents: vec![
                Intent::CancelSlot {
                    review_id: review.id,
                    slot_id: review.slot_id.clone(),
                },
                Intent::EditPrompt {
                    chat_id,
                    message_id,
                    text: "Cancelled.".to_string(),
                },
                Intent::AckCallback {
                    callback_id: input.callback_id.clone(),
                    text: "cancelled".to_string(),
                },
            ],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use guard_protocol::Login;
    use guard_protocol::ReviewId;
    use guard_protocol::ReviewerStatus;
    use guard_protocol::SlotId;
    use guard_protocol::WhitelistKind;
    use pretty_assertions::assert_eq;

    fn at(minute: i64) -> DateTime<Utc> {
        DateTime::UNIX_EPOCH + Duration::minutes(minute)
    }

    fn reviewer() -> Reviewer {
        Reviewer {
            login: Login::new("alice"),
            chat_id: "555".to_string(),
            status: ReviewerStatus::Active,
            created_at: at(0),
            last_auth_success_at: Some(at(0)),
            last_auth_failure_at: None,
        }
    }

    fn review(status: ReviewStatus) -> ReviewRequest {
        ReviewRequest {
            id: ReviewId::new(),
            login: Login::new("alice"),
            notification_id: Some("notif-1".to_string()),
            project_name: Some("libft".to_string()),
            family_label: Some("C - I".to_string()),
            review_start: at(100),
            review_end: at(220),
            slot_id: SlotId::new("slot-1"),
            decision_deadline: None,
            non_whitelist_cancel_at: None,
            chat_message_id: None,
            status,
            created_at: at(0),
            decided_at: None,
        }
    }

    fn inputs<'a>(
        review: &'a ReviewRequest,
        reviewer: &'a Reviewer,
        whitelist: &'a [WhitelistEntry],
        family_index: &'a ProjectFamilyIndex,
        now: DateTime<Utc>,
    ) -> StepInputs<'a> {
        StepInputs {
            review,
            reviewer,
            settings: ReviewerSettings::defaults(),
            now,
            whitelist,
            family_index,
            resolved_project_name: None,
            decision: None,
            callback_id: "cb-1".to_string(),
        }
    }

    #[test]
    fn unknown_project_review_retries_when_notification_not_yet_resolved() {
        let reviewer = reviewer();
        let review = review(ReviewStatus::UnknownProjectReview);
        let family_index = ProjectFamilyIndex::default();
        let outcome = step(inputs(&review, &reviewer, &[], &family_index, at(0)));
        assert_eq!(outcome, StepOutcome::NoOp);
    }

    #[test]
    fn unknown_project_review_refreshes_family_index_on_miss() {
        let reviewer = reviewer();
        let review = review(ReviewStatus::UnknownProjectReview);
        let family_index = ProjectFamilyIndex::default();
        let mut input = inputs(&review, &reviewer, &[], &family_index, at(0));
        input.resolved_project_name = Some("xyz".to_string());

        let outcome = step(input);
        match outcome {
            StepOutcome::Commit {
                next_status,
                patch,
                intents,
            } => {
                assert_eq!(next_status, ReviewStatus::UnknownProjectReview);
                assert_eq!(patch.project_name.as_deref(), Some("xyz"));
                assert_eq!(intents, vec![Intent::RefreshFamilyIndex { login: Login::new("alice") }]);
            }
            other => panic!("expected Commit, got {other:?}"),
        }
    }

    #[test]
    fn unknown_project_review_resolves_family_once_indexed() {
        let reviewer = reviewer();
        let review = review(ReviewStatus::UnknownProjectReview);
        let mut entries = std::collections::BTreeMap::new();
        entries.insert("xyz".to_string(), "misc".to_string());
        let family_index = ProjectFamilyIndex::new(entries, at(0));
        let mut input = inputs(&review, &reviewer, &[], &family_index, at(0));
        input.resolved_project_name = Some("xyz".to_string());

        let outcome = step(input);
        match outcome {
            StepOutcome::Commit {
                next_status,
                patch,
                intents,
            } => {
                assert_eq!(next_status, ReviewStatus::KnownProjectReview);
                assert_eq!(patch.family_label.as_deref(), Some("misc"));
                assert!(intents.is_empty());
            }
            other => panic!("expected Commit, got {other:?}"),
        }
    }

    #[test]
    fn known_project_review_asks_when_deadline_has_passed_even_if_whitelisted() {
        let reviewer = reviewer();
        let review = review(ReviewStatus::KnownProjectReview);
        let family_index = ProjectFamilyIndex::default();
        let whitelist = vec![WhitelistEntry::new(Login::new("alice"), WhitelistKind::Project, "libft")];
        // deadline = review_start(100) - response_deadline_shift(20) = 80.
        let input = inputs(&review, &reviewer, &whitelist, &family_index, at(80));
        assert_eq!(
            step(input),
            StepOutcome::Commit {
                next_status: ReviewStatus::NeedToApprove,
                patch: FieldPatch::default(),
                intents: Vec::new(),
            }
        );
    }

    #[test]
    fn known_project_review_shift_threshold_boundary_is_inclusive() {
        let reviewer = reviewer();
        let review = review(ReviewStatus::KnownProjectReview);
        let family_index = ProjectFamilyIndex::default();
        // review_start(100) - now == slot_shift_threshold(25) exactly.
        let input = inputs(&review, &reviewer, &[], &family_index, at(75));
        assert_eq!(
            step(input),
            StepOutcome::Commit {
                next_status: ReviewStatus::NeedToApprove,
                patch: FieldPatch::default(),
                intents: Vec::new(),
            }
        );
    }

    #[test]
    fn known_project_review_whitelisted_by_family() {
        let reviewer = reviewer();
        let review = review(ReviewStatus::KnownProjectReview);
        let family_index = ProjectFamilyIndex::default();
        let whitelist = vec![WhitelistEntry::new(Login::new("alice"), WhitelistKind::Family, "C - I")];
        // Comfortably before the shift threshold and the deadline.
        let input = inputs(&review, &reviewer, &whitelist, &family_index, at(0));
        assert_eq!(
            step(input),
            StepOutcome::Commit {
                next_status: ReviewStatus::Whitelisted,
                patch: FieldPatch::default(),
                intents: Vec::new(),
            }
        );
    }

    #[test]
    fn known_project_review_not_whitelisted_arms_cancel_timer() {
        let reviewer = reviewer();
        let review = review(ReviewStatus::KnownProjectReview);
        let family_index = ProjectFamilyIndex::default();
        let outcome = step(inputs(&review, &reviewer, &[], &family_index, at(0)));
        match outcome {
            StepOutcome::Commit {
                next_status,
                patch,
                ..
            } => {
                assert_eq!(next_status, ReviewStatus::NotWhitelisted);
                assert_eq!(patch.non_whitelist_cancel_at, Some(at(5)));
            }
            other => panic!("expected Commit, got {other:?}"),
        }
    }

    #[test]
    fn whitelisted_stays_put_while_outside_the_shift_window() {
        let reviewer = reviewer();
        let review = review(ReviewStatus::Whitelisted);
        let family_index = ProjectFamilyIndex::default();
        let outcome = step(inputs(&review, &reviewer, &[], &family_index, at(0)));
        assert_eq!(outcome, StepOutcome::NoOp);
    }

    #[test]
    fn whitelisted_shifts_the_slot_inside_the_window() {
        let reviewer = reviewer();
        let review = review(ReviewStatus::Whitelisted);
        let family_index = ProjectFamilyIndex::default();
        // threshold=25, so at minute 80 the review is exactly 20 minutes out.
        let outcome = step(inputs(&review, &reviewer, &[], &family_index, at(80)));
        match outcome {
            StepOutcome::Gated {
                intent,
                on_success,
                on_failure,
            } => {
                assert_eq!(
                    intent,
                    Intent::ChangeSlot {
                        review_id: review.id,
                        slot_id: review.slot_id.clone(),
                        new_start: at(85),
                        new_end: at(205),
                    }
                );
                assert_eq!(on_success.next_status, ReviewStatus::Whitelisted);
                assert_eq!(on_failure.next_status, ReviewStatus::AutoCancelled);
            }
            other => panic!("expected Gated, got {other:?}"),
        }
    }

    #[test]
    fn whitelisted_cancels_outright_when_slot_is_too_short_inclusive() {
        let reviewer = reviewer();
        let mut review = review(ReviewStatus::Whitelisted);
        // cleanup_duration_minutes default is 15; make the slot exactly 15.
        review.review_end = review.review_start + Duration::minutes(15);
        let family_index = ProjectFamilyIndex::default();
        let outcome = step(inputs(&review, &reviewer, &[], &family_index, at(80)));
        match outcome {
            StepOutcome::Commit {
                next_status,
                intents,
                ..
            } => {
                assert_eq!(next_status, ReviewStatus::AutoCancelled);
                assert_eq!(
                    intents,
                    vec![Intent::CancelSlot {
                        review_id: review.id,
                        slot_id: review.slot_id.clone()
                    }]
                );
            }
            other => panic!("expected Commit, got {other:?}"),
        }
    }

    #[test]
    fn not_whitelisted_fires_on_or_after_the_cancel_deadline() {
        let reviewer = reviewer();
        let mut review = review(ReviewStatus::NotWhitelisted);
        review.non_whitelist_cancel_at = Some(at(5));
        let family_index = ProjectFamilyIndex::default();

        assert_eq!(step(inputs(&review, &reviewer, &[], &family_index, at(4))), StepOutcome::NoOp);

        let outcome = step(inputs(&review, &reviewer, &[], &family_index, at(5)));
        match outcome {
            StepOutcome::Commit {
                next_status,
                intents,
                ..
            } => {
                assert_eq!(next_status, ReviewStatus::AutoCancelledNotWhitelisted);
                assert_eq!(intents.len(), 2);
                assert!(matches!(intents[0], Intent::NotifyNonWhitelistCancel { .. }));
                assert!(matches!(intents[1], Intent::CancelSlot { .. }));
            }
            other => panic!("expected Commit, got {other:?}"),
        }
    }

    #[test]
    fn not_whitelisted_skips_the_notification_when_disabled() {
        let reviewer = reviewer();
        let mut review = review(ReviewStatus::NotWhitelisted);
        review.non_whitelist_cancel_at = Some(at(5));
        let family_index = ProjectFamilyIndex::default();
        let mut input = inputs(&review, &reviewer, &[], &family_index, at(5));
        input.settings.notify_non_whitelist_cancel = false;

        match step(input) {
            StepOutcome::Commit { intents, .. } => {
                assert_eq!(intents, vec![Intent::CancelSlot { review_id: review.id, slot_id: review.slot_id.clone() }]);
            }
            other => panic!("expected Commit, got {other:?}"),
        }
    }

    #[test]
    fn need_to_approve_is_gated_on_the_prompt_send() {
        let reviewer = reviewer();
        let review = review(ReviewStatus::NeedToApprove);
        let family_index = ProjectFamilyIndex::default();
        let outcome = step(inputs(&review, &reviewer, &[], &family_index, at(80)));
        match outcome {
            StepOutcome::Gated {
                intent,
                on_success,
                on_failure,
            } => {
                assert!(matches!(intent, Intent::SendPrompt { .. }));
                assert_eq!(on_success.next_status, ReviewStatus::WaitingForApprove);
                assert!(on_success.patch.chat_message_id_pending);
                assert_eq!(on_success.patch.decision_deadline, Some(at(80)));
                assert_eq!(on_failure.next_status, ReviewStatus::NeedToApprove);
            }
            other => panic!("expected Gated, got {other:?}"),
        }
    }

    #[test]
    fn waiting_for_approve_timeout_fires_inclusively_at_the_deadline() {
        let reviewer = reviewer();
        let mut review = review(ReviewStatus::WaitingForApprove);
        review.decision_deadline = Some(at(80));
        review.chat_message_id = Some("msg-1".to_string());
        let family_index = ProjectFamilyIndex::default();

        assert_eq!(step(inputs(&review, &reviewer, &[], &family_index, at(79))), StepOutcome::NoOp);

        match step(inputs(&review, &reviewer, &[], &family_index, at(80))) {
            StepOutcome::Commit { next_status, intents, .. } => {
                assert_eq!(next_status, ReviewStatus::AutoCancelled);
                assert_eq!(intents.len(), 2);
            }
            other => panic!("expected Commit, got {other:?}"),
        }
    }

    #[test]
    fn waiting_for_approve_approve_callback_commits_approved() {
        let reviewer = reviewer();
        let mut review = review(ReviewStatus::WaitingForApprove);
        review.decision_deadline = Some(at(80));
        review.chat_message_id = Some("msg-1".to_string());
        let family_index = ProjectFamilyIndex::default();
        let mut input = inputs(&review, &reviewer, &[], &family_index, at(50));
        input.decision = Some(Decision::Approve);

        match step(input) {
            StepOutcome::Commit { next_status, intents, patch } => {
                assert_eq!(next_status, ReviewStatus::Approved);
                assert_eq!(patch.decided_at, Some(at(50)));
                assert!(matches!(intents[0], Intent::EditPrompt { .. }));
                assert!(matches!(intents[1], Intent::AckCallback { .. }));
            }
            other => panic!("expected Commit, got {other:?}"),
        }
    }

    #[test]
    fn waiting_for_approve_decline_callback_cancels_the_slot() {
        let reviewer = reviewer();
        let mut review = review(ReviewStatus::WaitingForApprove);
        review.decision_deadline = Some(at(80));
        let family_index = ProjectFamilyIndex::default();
        let mut input = inputs(&review, &reviewer, &[], &family_index, at(50));
        input.decision = Some(Decision::Decline);

        match step(input) {
            StepOutcome::Commit { next_status, intents, .. } => {
                assert_eq!(next_status, ReviewStatus::Cancelled);
                assert!(matches!(intents[0], Intent::CancelSlot { .. }));
            }
            other => panic!("expected Commit, got {other:?}"),
        }
    }

    #[test]
    fn double_click_on_a_terminal_review_just_acks() {
        let reviewer = reviewer();
        let mut review = review(ReviewStatus::Approved);
        review.decided_at = Some(at(50));
        let family_index = ProjectFamilyIndex::default();
        let mut input = inputs(&review, &reviewer, &[], &family_index, at(60));
        input.decision = Some(Decision::Approve);

        match step(input) {
            StepOutcome::Commit { next_status, patch, intents } => {
                assert_eq!(next_status, ReviewStatus::Approved);
                assert_eq!(patch, FieldPatch::default());
                assert_eq!(intents.len(), 1);
                assert!(matches!(&intents[0], Intent::AckCallback { text, .. } if text == "already decided"));
            }
            other => panic!("expected Commit, got {other:?}"),
        }
    }

    #[test]
    fn callback_on_a_review_not_yet_awaiting_approval_also_just_acks() {
        let reviewer = reviewer();
        let review = review(ReviewStatus::KnownProjectReview);
        let family_index = ProjectFamilyIndex::default();
        let mut input = inputs(&review, &reviewer, &[], &family_index, at(0));
        input.decision = Some(Decision::Approve);

        match step(input) {
            StepOutcome::Commit { next_status, intents, .. } => {
                assert_eq!(next_status, ReviewStatus::KnownProjectReview);
                assert_eq!(intents.len(), 1);
            }
            other => panic!("expected Commit, got {other:?}"),
        }
    }

    #[test]
    fn not_whitelisted_missing_its_timer_is_abandoned_not_panicked() {
        let reviewer = reviewer();
        let review = review(ReviewStatus::NotWhitelisted);
        let family_index = ProjectFamilyIndex::default();
        match step(inputs(&review, &reviewer, &[], &family_index, at(0))) {
            StepOutcome::Abandon { .. } => {}
            other => panic!("expected Abandon, got {other:?}"),
        }
    }
}
