//! Turns a [`guard_core::Intent`] into the one outbound call it names, and
//! a [`guard_core::FieldPatch`] plus target status into the
//! [`guard_store::runtime::TransitionPatch`] the store actually commits.

use std::future::Future;
use std::time::Duration;

use guard_clock::Clock;
use guard_core::FieldPatch;
use guard_protocol::format_callback;
use guard_protocol::Decision;
use guard_protocol::Intent;
use guard_protocol::Login;
use guard_protocol::ReviewStatus;
use guard_store::runtime::TransitionPatch;
use guard_store::StoreRuntime;

/// Bound every outbound adapter call by the ambient per-call timeout (spec
/// §5). A timeout is treated the same as any other transport failure: log
/// and let the next tick retry.
pub(crate) async fn with_timeout<T>(
    timeout: Duration,
    label: &'static str,
    fut: impl Future<Output = T>,
) -> Option<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(call = label, timeout_secs = timeout.as_secs(), "adapter call timed out");
            None
        }
    }
}

/// The result of executing one intent, carrying whatever dynamic data the
/// caller needs to fold back into a patch (currently only `SendPrompt`'s
/// `message_id`).
pub(crate) enum IntentOutcome {
    Ok,
    SentMessageId(String),
    Failed,
}

pub(crate) struct IntentContext<'a> {
    pub school: &'a guard_school::Client,
    pub chat: &'a guard_chat::Client,
    pub store: &'a StoreRuntime,
    pub clock: &'a dyn Clock,
    pub call_timeout: Duration,
}

pub(crate) async fn execute_intent(ctx: &IntentContext<'_>, intent: &Intent) -> IntentOutcome {
    match intent {
        Intent::CancelSlot { slot_id, .. } => {
            match with_timeout(ctx.call_timeout, "cancel_slot", ctx.school.cancel_slot(slot_id.as_str())).await {
                Some(Ok(())) => IntentOutcome::Ok,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, slot_id = %slot_id, "cancel_slot failed, retried next tick");
                    IntentOutcome::Failed
                }
                None => IntentOutcome::Failed,
            }
        }
        Intent::ChangeSlot {
            slot_id,
            new_start,
            new_end,
            ..
        } => {
            let call = ctx.school.change_slot(slot_id.as_str(), *new_start, *new_end);
            match with_timeout(ctx.call_timeout, "change_slot", call).await {
                Some(Ok(())) => IntentOutcome::Ok,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, slot_id = %slot_id, "change_slot failed");
                    IntentOutcome::Failed
                }
                None => IntentOutcome::Failed,
            }
        }
        Intent::SendPrompt {
            review_id,
            chat_id,
            project_name,
            family_label,
            review_start,
        } => {
            let text = prompt_text(project_name, family_label.as_deref(), *review_start);
            let approve_payload = format_callback(Decision::Approve, *review_id);
            let decline_payload = format_callback(Decision::Decline, *review_id);
            let call = ctx
                .chat
                .send_two_button_keyboard(chat_id, &text, "Approve", &approve_payload, "Decline", &decline_payload);
            match with_timeout(ctx.call_timeout, "send_two_button_keyboard", call).await {
                Some(Ok(message_id)) => IntentOutcome::SentMessageId(message_id),
                Some(Err(err)) => {
                    tracing::warn!(error = %err, review_id = %review_id, "send_two_button_keyboard failed");
                    IntentOutcome::Failed
                }
                None => IntentOutcome::Failed,
            }
        }
        Intent::EditPrompt { chat_id, message_id, text } => {
            let call = ctx.chat.edit_message(chat_id, message_id, text);
            match with_timeout(ctx.call_timeout, "edit_message", call).await {
                Some(Ok(())) => IntentOutcome::Ok,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, message_id = %message_id, "edit_message failed");
                    IntentOutcome::Failed
                }
                None => IntentOutcome::Failed,
            }
        }
        Intent::AckCallback { callback_id, text } => {
            let call = ctx.chat.answer_callback(callback_id, text, false);
            match with_timeout(ctx.call_timeout, "answer_callback", call).await {
                Some(Ok(())) => IntentOutcome::Ok,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, callback_id = %callback_id, "answer_callback failed");
                    IntentOutcome::Failed
                }
                None => IntentOutcome::Failed,
            }
        }
        Intent::NotifyTimeout { chat_id, review_id } => {
            let text = "Your decision window elapsed; the slot was cancelled.";
            let call = ctx.chat.send_plain_message(chat_id, text);
            match with_timeout(ctx.call_timeout, "notify_timeout", call).await {
                Some(Ok(())) => IntentOutcome::Ok,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, review_id = %review_id, "notify_timeout send failed");
                    IntentOutcome::Failed
                }
                None => IntentOutcome::Failed,
            }
        }
        Intent::NotifyNonWhitelistCancel { chat_id, review_id } => {
            let text = "A booking for a project outside your whitelist was auto-cancelled.";
            let call = ctx.chat.send_plain_message(chat_id, text);
            match with_timeout(ctx.call_timeout, "notify_non_whitelist_cancel", call).await {
                Some(Ok(())) => IntentOutcome::Ok,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, review_id = %review_id, "notify_non_whitelist_cancel send failed");
                    IntentOutcome::Failed
                }
                None => IntentOutcome::Failed,
            }
        }
        Intent::RefreshFamilyIndex { login } => refresh_family_index(ctx, login).await,
        Intent::StoreFields {
            review_id,
            project_name,
            family_label,
        } => {
            let patch = TransitionPatch {
                project_name: project_name.clone(),
                family_label: family_label.clone(),
                ..Default::default()
            };
            match ctx.store.commit_transition(*review_id, ReviewStatus::UnknownProjectReview, patch).await {
                Ok(_) => IntentOutcome::Ok,
                Err(err) => {
                    tracing::warn!(error = %err, review_id = %review_id, "store_fields commit failed");
                    IntentOutcome::Failed
                }
            }
        }
    }
}

/// Re-fetch the project/family graph for `login` and write it through to
/// the store in one batch. See spec §4.1's `UNKNOWN_PROJECT_REVIEW` rule
/// and §3's `ProjectFamilyIndex`.
async fn refresh_family_index(ctx: &IntentContext<'_>, login: &Login) -> IntentOutcome {
    let call = ctx.school.get_project_graph(login.as_str());
    let graph = match with_timeout(ctx.call_timeout, "get_project_graph", call).await {
        Some(Ok(graph)) => graph,
        Some(Err(err)) => {
            tracing::warn!(error = %err, login = %login, "get_project_graph failed");
            return IntentOutcome::Failed;
        }
        None => return IntentOutcome::Failed,
    };
    let entries = graph
        .entries
        .into_iter()
        .filter_map(|entry| entry.family_label.map(|family| (entry.project_name, family)))
        .collect();
    match ctx.store.replace_family_index(login, &entries, ctx.clock.now()).await {
        Ok(()) => IntentOutcome::Ok,
        Err(err) => {
            tracing::warn!(error = %err, login = %login, "replace_family_index failed");
            IntentOutcome::Failed
        }
    }
}

fn prompt_text(project_name: &str, family_label: Option<&str>, review_start: chrono::DateTime<chrono::Utc>) -> String {
    match family_label {
        Some(family) => format!("Review request for {project_name} ({family}) starting {review_start}. Approve or decline?"),
        None => format!("Review request for {project_name} starting {review_start}. Approve or decline?"),
    }
}

/// Build the store-level patch for a [`guard_core::StepOutcome`] branch,
/// folding in a dynamically learned `chat_message_id` when the branch's
/// patch asked for one (see [`FieldPatch::chat_message_id_pending`]).
pub(crate) fn into_transition_patch(
    next_status: ReviewStatus,
    patch: FieldPatch,
    sent_message_id: Option<String>,
) -> TransitionPatch {
    let chat_message_id = if patch.chat_message_id_pending {
        sent_message_id.or(patch.chat_message_id)
    } else {
        patch.chat_message_id
    };
    TransitionPatch {
        new_status: Some(next_status),
        project_name: patch.project_name,
        family_label: patch.family_label,
        decision_deadline: patch.decision_deadline,
        non_whitelist_cancel_at: patch.non_whitelist_cancel_at,
        chat_message_id,
        decided_at: patch.decided_at,
    }
}
