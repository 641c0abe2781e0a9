//! Callback path: a reviewer tapped Approve/Decline on a two-button prompt.
//! See spec §4.3 steps 1-4.

use guard_core::step;
use guard_core::StepInputs;
use guard_core::StepOutcome;
use guard_protocol::parse_callback;
use guard_protocol::Intent;
use guard_protocol::ReviewRequest;
use guard_protocol::ReviewerSettings;
use guard_store::runtime::TransitionPatch;

use crate::Services;

pub(crate) async fn handle_callback(services: &Services, chat_id: &str, callback_id: &str, payload: &str) {
    let reviewer = match services.store.get_reviewer_by_chat_id(chat_id).await {
        Ok(Some(reviewer)) => reviewer,
        Ok(None) => {
            services.ack(callback_id, "please authenticate").await;
            return;
        }
        Err(err) => {
            tracing::warn!(error = %err, chat_id, "get_reviewer_by_chat_id failed");
            services.ack(callback_id, "try again later").await;
            return;
        }
    };

    let Some((decision, review_id)) = parse_callback(payload) else {
        services.ack(callback_id, "invalid").await;
        return;
    };

    let review = match services.store.get_review_request(review_id).await {
        Ok(Some(review)) => review,
        Ok(None) => {
            services.ack(callback_id, "invalid").await;
            return;
        }
        Err(err) => {
            tracing::warn!(error = %err, %review_id, "get_review_request failed");
            services.ack(callback_id, "try again later").await;
            return;
        }
    };

    // Step 3 (spec §4.3): a callback only ever targets a review owned by
    // the caller, never another reviewer's.
    if review.login != reviewer.login {
        services.ack(callback_id, "access denied").await;
        return;
    }

    let settings = services
        .store
        .get_reviewer_settings(&reviewer.login)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(ReviewerSettings::defaults);
    let whitelist = services.store.list_whitelist(&reviewer.login).await.unwrap_or_default();
    let family_index = services.store.get_family_index(&reviewer.login).await.unwrap_or_default();

    // The decision-driven branches of `step` always resolve to `Commit` —
    // nothing gates on an intent's success once a human has decided.
    let outcome = step(StepInputs {
        review: &review,
        reviewer: &reviewer,
        settings,
        now: services.clock.now(),
        whitelist: &whitelist,
        family_index: &family_index,
        resolved_project_name: review.project_name.clone(),
        decision: Some(decision),
        callback_id: callback_id.to_string(),
    });

    let StepOutcome::Commit { next_status, patch, intents } = outcome else {
        tracing::error!(%review_id, "callback-driven step produced a non-Commit outcome");
        services.ack(callback_id, "try again later").await;
        return;
    };

    for intent in &intents {
        execute_callback_intent(services, &reviewer, &review, intent).await;
    }

    let transition_patch = TransitionPatch {
        new_status: Some(next_status),
        project_name: patch.project_name,
        family_label: patch.family_label,
        decision_deadline: patch.decision_deadline,
        non_whitelist_cancel_at: patch.non_whitelist_cancel_at,
        chat_message_id: patch.chat_message_id,
        decided_at: patch.decided_at,
    };
    match services.store.commit_transition(review.id, review.status, transition_patch).await {
        Ok(true) => {
            services.metrics.counter("review.transition", 1, &[("via", "callback")]);
        }
        Ok(false) => {
            tracing::debug!(%review_id, "callback lost the transition race, tick will reconcile");
        }
        Err(err) => tracing::warn!(error = %err, %review_id, "commit_transition failed"),
    }
}

async fn execute_callback_intent(services: &Services, reviewer: &guard_protocol::Reviewer, review: &ReviewRequest, intent: &Intent) {
    match intent {
        Intent::CancelSlot { slot_id, .. } => {
            let Some(school) = services.school_client_for(&reviewer.login).await else {
                return;
            };
            let call = school.cancel_slot(slot_id.as_str());
            match tokio::time::timeout(services.call_timeout, call).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(error = %err, %slot_id, "cancel_slot failed"),
                Err(_) => tracing::warn!(%slot_id, "cancel_slot timed out"),
            }
        }
        Intent::EditPrompt { chat_id, message_id, text } => {
            let call = services.chat.edit_message(chat_id, message_id, text);
            match tokio::time::timeout(services.call_timeout, call).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(error = %err, %message_id, "edit_message failed"),
                Err(_) => tracing::warn!(%message_id, "edit_message timed out"),
            }
        }
        Intent::AckCallback { callback_id, text } => {
            services.ack(callback_id, text).await;
        }
        other => {
            tracing::debug!(review_id = %review.id, intent = ?other, "unexpected intent from callback-driven step, ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use guard_clock::Clock;
    use guard_clock::FixedClock;
    use guard_protocol::format_callback;
    use guard_protocol::Decision;
    use guard_protocol::Login;
    use guard_protocol::Reviewer;
    use guard_protocol::ReviewStatus;
    use guard_protocol::SlotId;
    use guard_store::StoreRuntime;
    use guard_vault::InMemorySecretStore;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    async fn seeded(login: &Login, now: chrono::DateTime<Utc>) -> (Services, ReviewRequest) {
        let store = StoreRuntime::init_in_memory().await.expect("init");
        store
            .upsert_reviewer(&Reviewer {
                login: login.clone(),
                chat_id: "555".into(),
                status: guard_protocol::ReviewerStatus::Active,
                created_at: now,
                last_auth_success_at: Some(now),
                last_auth_failure_at: None,
            })
            .await
            .unwrap();
        store.seed_reviewer_settings(login, ReviewerSettings::defaults()).await.unwrap();

        let mut review = ReviewRequest::new_from_booking(login.clone(), SlotId::new("slot-1"), "notif-1".into(), now, now, now);
        review.status = ReviewStatus::WaitingForApprove;
        review.decision_deadline = Some(now + chrono::Duration::minutes(20));
        review.chat_message_id = Some("msg-1".to_string());
        review.project_name = Some("libft".to_string());
        store.insert_review_request(&review).await.unwrap();

        let secret_store = Arc::new(InMemorySecretStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
        let vault = Arc::new(guard_vault::TokenVault::new(secret_store, clock.clone(), 5));
        let chat = guard_chat::Client::new("http://127.0.0.1:1", "bot-token");

        let services = Services::new(store, vault, chat, "http://127.0.0.1:1", clock);
        (services, review)
    }

    #[tokio::test]
    async fn unknown_chat_id_acks_please_authenticate() {
        let login = Login::new("alice");
        let now = Utc::now();
        let (services, review) = seeded(&login, now).await;
        handle_callback(&services, "no-such-chat", "cb-1", &format_callback(Decision::Approve, review.id)).await;
        // No panics, no state change: the review is still waiting.
        let fetched = services.store.get_review_request(review.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, ReviewStatus::WaitingForApprove);
    }

    #[tokio::test]
    async fn approve_commits_approved_even_though_chat_and_school_calls_fail() {
        let login = Login::new("alice");
        let now = Utc::now();
        let (services, review) = seeded(&login, now).await;
        handle_callback(&services, "555", "cb-1", &format_callback(Decision::Approve, review.id)).await;
        let fetched = services.store.get_review_request(review.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, ReviewStatus::Approved);
        assert_eq!(fetched.decided_at, Some(now));
    }

    #[tokio::test]
    async fn mismatched_login_is_denied() {
        let login = Login::new("alice");
        let now = Utc::now();
        let (services, review) = seeded(&login, now).await;
        services
            .store
            .upsert_reviewer(&Reviewer {
                login: Login::new("mallory"),
                chat_id: "999".into(),
                status: guard_protocol::ReviewerStatus::Active,
                created_at: now,
                last_auth_success_at: Some(now),
                last_auth_failure_at: None,
            })
            .await
            .unwrap();

        handle_callback(&services, "999", "cb-1", &format_callback(Decision::Approve, review.id)).await;
        let fetched = services.store.get_review_request(review.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, ReviewStatus::WaitingForApprove);
    }
}
