//! Classification of one inbound chat event into the three paths spec §4.3
//! names: callback, command, or credential/plain-text.

/// The payload of an inline-button tap, as the (out-of-scope) chat
/// transport would hand it to us alongside the chat it arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCallback {
    pub callback_id: String,
    /// The raw `ACTION:review_id` wire payload; parsed by `guard_protocol`.
    pub payload: String,
}

/// One event the chat transport delivers to `guard-dispatch`. Exactly one
/// of `callback` or `text` is meaningful for any real event; both present
/// is treated as a callback (callbacks never carry free text in this
/// protocol).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub chat_id: String,
    pub text: Option<String>,
    pub callback: Option<InboundCallback>,
}

impl InboundEvent {
    pub fn callback(chat_id: impl Into<String>, callback_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: None,
            callback: Some(InboundCallback {
                callback_id: callback_id.into(),
                payload: payload.into(),
            }),
        }
    }

    pub fn text(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: Some(text.into()),
            callback: None,
        }
    }
}

/// The character that opens a command, e.g. `/start`.
pub const COMMAND_PREFIX: char = '/';

/// One classified chat event, ready to be routed to a handler. See spec
/// §4.3's classification rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Has a button-action payload.
    Callback {
        chat_id: String,
        callback_id: String,
        payload: String,
    },
    /// Text begins with the command prefix.
    Command {
        chat_id: String,
        name: String,
        args: String,
    },
    /// Plain text: meaningful only as a credential message right after
    /// `/start`; otherwise the command handler's default rejects it.
    PlainText { chat_id: String, text: String },
}

/// Classify one inbound event. Returns `None` only for a text-less,
/// callback-less event, which no real transport ever produces.
pub fn classify(event: InboundEvent) -> Option<ChatEvent> {
    if let Some(callback) = event.callback {
        return Some(ChatEvent::Callback {
            chat_id: event.chat_id,
            callback_id: callback.callback_id,
            payload: callback.payload,
        });
    }

    let text = event.text?;
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix(COMMAND_PREFIX) {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or("").to_ascii_lowercase();
        let args = parts.next().unwrap_or("").trim().to_string();
        return Some(ChatEvent::Command {
            chat_id: event.chat_id,
            name,
            args,
        });
    }

    Some(ChatEvent::PlainText {
        chat_id: event.chat_id,
        text: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn a_callback_always_classifies_as_callback_regardless_of_text() {
        let mut event = InboundEvent::callback("chat-1", "cb-1", "APPROVE:id");
        event.text = Some("/start".to_string());
        match classify(event).expect("classifies") {
            ChatEvent::Callback { callback_id, payload, .. } => {
                assert_eq!(callback_id, "cb-1");
                assert_eq!(payload, "APPROVE:id");
            }
            other => panic!("expected Callback, got {other:?}"),
        }
    }

    #[test]
    fn a_slash_prefixed_message_classifies_as_a_command() {
        let event = InboundEvent::text("chat-1", "/set_cleanup_duration 30");
        match classify(event).expect("classifies") {
            ChatEvent::Command { name, args, .. } => {
                assert_eq!(name, "set_cleanup_duration");
                assert_eq!(args, "30");
            }
            other => panic!("expected Command, got {other:?}"),
        }
    }

    #[test]
    fn a_bare_command_has_empty_args() {
        let event = InboundEvent::text("chat-1", "/status");
        match classify(event).expect("classifies") {
            ChatEvent::Command { name, args, .. } => {
                assert_eq!(name, "status");
                assert_eq!(args, "");
            }
            other => panic!("expected Command, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_classifies_as_plain_text() {
        let event = InboundEvent::text("chat-1", "alice:hunter2");
        assert_eq!(
            classify(event),
            Some(ChatEvent::PlainText {
                chat_id: "chat-1".to_string(),
                text: "alice:hunter2".to_string(),
            })
        );
    }
}
