//! Event-driven chat dispatcher (C8) and command surface (C9). See spec
//! §4.3, §4.5.
//!
//! Grounded on `mcp-server/src/message_processor.rs`'s classify-then-match
//! dispatch shape: one entrypoint classifies an inbound event and delegates
//! to exactly one handler, each of which resolves the reviewer, does its
//! own I/O through the shared [`Services`] bundle, and sends at most one
//! reply. Unlike `guard-reconcile`'s tick, which fans out over every
//! reviewer at once, a dispatcher invocation handles exactly one event for
//! exactly one chat.

mod callback;
mod command;
mod credential;
mod event;

pub use event::classify;
pub use event::ChatEvent;
pub use event::InboundCallback;
pub use event::InboundEvent;

use std::sync::Arc;
use std::time::Duration;

use guard_clock::Clock;
use guard_otel::GuardMetrics;
use guard_store::StoreRuntime;
use guard_vault::TokenVault;

/// Per-call timeout applied to every outbound adapter call made while
/// handling one event. See spec §5.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// The shared services bundle every dispatch handler is given. Mirrors
/// `guard-reconcile::Reconciler`'s shape: cheap to clone, no ambient
/// globals — a services handle is passed by value into every call instead
/// of handlers reaching into statics.
#[derive(Clone)]
pub struct Services {
    pub(crate) store: StoreRuntime,
    pub(crate) vault: Arc<TokenVault>,
    pub(crate) chat: guard_chat::Client,
    pub(crate) school_base_url: String,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) metrics: GuardMetrics,
    pub(crate) call_timeout: Duration,
}

impl Services {
    pub fn new(
        store: StoreRuntime,
        vault: Arc<TokenVault>,
        chat: guard_chat::Client,
        school_base_url: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            vault,
            chat,
            school_base_url: school_base_url.into(),
            clock,
            metrics: GuardMetrics::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Send a single plain-text reply. Logged, never propagated — a failed
    /// reply has no retry path in an event-driven dispatcher (there is no
    /// "next tick").
    pub(crate) async fn reply(&self, chat_id: &str, text: &str) {
        let call = self.chat.send_plain_message(chat_id, text);
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, chat_id, "reply send failed"),
            Err(_) => tracing::warn!(chat_id, "reply send timed out"),
        }
    }

    /// Acknowledge a callback tap so the chat client stops showing its
    /// loading spinner, regardless of outcome.
    pub(crate) async fn ack(&self, callback_id: &str, text: &str) {
        let call = self.chat.answer_callback(callback_id, text, false);
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, callback_id, "answer_callback failed"),
            Err(_) => tracing::warn!(callback_id, "answer_callback timed out"),
        }
    }

    /// Build a school API client scoped to one reviewer's vaulted access
    /// token. `None` if the reviewer has no tokens on file — surfaced by
    /// callers as `TokensMissing` (spec §7).
    pub(crate) async fn school_client_for(&self, login: &guard_protocol::Login) -> Option<guard_school::Client> {
        match self.vault.get(login).await {
            Ok(Some(bundle)) => Some(guard_school::Client::new(self.school_base_url.clone()).with_bearer_token(bundle.access_token)),
            Ok(None) => {
                tracing::warn!(%login, "no tokens vaulted");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, %login, "vault lookup failed");
                None
            }
        }
    }
}

/// Handle exactly one inbound chat event end to end: classify, route,
/// reply. See spec §4.3.
pub async fn handle_event(services: &Services, event: InboundEvent) {
    let Some(classified) = classify(event) else {
        return;
    };
    match classified {
        ChatEvent::Callback {
            chat_id,
            callback_id,
            payload,
        } => callback::handle_callback(services, &chat_id, &callback_id, &payload).await,
        ChatEvent::Command { chat_id, name, args } => command::handle_command(services, &chat_id, &name, &args).await,
        ChatEvent::PlainText { chat_id, text } => credential::handle_plain_text(services, &chat_id, &text).await,
    }
}
