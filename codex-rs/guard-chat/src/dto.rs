use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct InlineButton<'a> {
    pub label: &'a str,
    pub payload: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SendKeyboardRequest<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
    pub buttons: [InlineButton<'a>; 2],
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SendKeyboardResponse {
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EditMessageRequest<'a> {
    pub chat_id: &'a str,
    pub message_id: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnswerCallbackRequest<'a> {
    pub callback_id: &'a str,
    pub text: &'a str,
    pub show_alert: bool,
}
