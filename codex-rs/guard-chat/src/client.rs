use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

use crate::dto::AnswerCallbackRequest;
use crate::dto::EditMessageRequest;
use crate::dto::InlineButton;
use crate::dto::SendKeyboardRequest;
use crate::dto::SendKeyboardResponse;
use crate::dto::SendMessageRequest;
use crate::ChatApiError;

const MAX_PAYLOAD_BYTES: usize = 64;

/// HTTP client for the chat transport (C5). Built from a single
/// process-wide bot credential, unlike [`guard_school::Client`] which is
/// constructed per reviewer — there is exactly one bot, speaking to many
/// chats. One method per logical operation in spec §6.
#[derive(Clone, Debug)]
pub struct Client {
    base_url: String,
    http: reqwest::Client,
    bot_token: String,
}

impl Client {
    pub fn new(base_url: impl Into<String>, bot_token: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            http: reqwest::Client::new(),
            bot_token: bot_token.into(),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.bot_token)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    async fn exec_request(
        &self,
        req: reqwest::RequestBuilder,
        method: &'static str,
        url: &str,
    ) -> Result<String, ChatApiError> {
        let res = req.send().await?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ChatApiError::Status {
                method,
                url: url.to_string(),
                status,
                body,
            });
        }
        Ok(body)
    }

    fn decode_json<T: DeserializeOwned>(&self, url: &str, body: &str) -> Result<T, ChatApiError> {
        serde_json::from_str(body).map_err(|err| ChatApiError::Decode {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }

    /// `SendPlainMessage(chat_id, text)`.
    pub async fn send_plain_message(&self, chat_id: &str, text: &str) -> Result<(), ChatApiError> {
        let url = format!("{}/messages/send", self.base_url);
        let req = self
            .http
            .post(&url)
            .headers(self.headers())
            .json(&SendMessageRequest { chat_id, text });
        self.exec_request(req, "POST", &url).await?;
        Ok(())
    }

    /// `SendTwoButtonKeyboard(chat_id, text, button_a_label, button_a_payload,
    /// button_b_label, button_b_payload) -> message_id`. Rejects either
    /// payload over 64 bytes before making the call — see spec §6.
    #[allow(clippy::too_many_arguments)]
    pub async fn send_two_button_keyboard(
        &self,
        chat_id: &str,
        text: &str,
        button_a_label: &str,
        button_a_payload: &str,
        button_b_label: &str,
        button_b_payload: &str,
    ) -> Result<String, ChatApiError> {
        for payload in [button_a_payload, button_b_payload] {
            if payload.len() > MAX_PAYLOAD_BYTES {
                return Err(ChatApiError::PayloadTooLong(payload.to_string()));
            }
        }
        let url = format!("{}/messages/send_keyboard", self.base_url);
        let req = self.http.post(&url).headers(self.headers()).json(&SendKeyboardRequest {
            chat_id,
            text,
            buttons: [
                InlineButton {
                    label: button_a_label,
                    payload: button_a_payload,
                },
                InlineButton {
                    label: button_b_label,
                    payload: button_b_payload,
                },
            ],
        });
        let body = self.exec_request(req, "POST", &url).await?;
        let parsed: SendKeyboardResponse = self.decode_json(&url, &body)?;
        Ok(parsed.message_id)
    }

    /// `EditMessage(chat_id, message_id, text)`.
    pub async fn edit_message(&self, chat_id: &str, message_id: &str, text: &str) -> Result<(), ChatApiError> {
        let url = format!("{}/messages/edit", self.base_url);
        let req = self.http.post(&url).headers(self.headers()).json(&EditMessageRequest {
            chat_id,
            message_id,
            text,
        });
        self.exec_request(req, "POST", &url).await?;
        Ok(())
    }

    /// `AnswerCallback(callback_id, text, show_alert=false)`.
    pub async fn answer_callback(&self, callback_id: &str, text: &str, show_alert: bool) -> Result<(), ChatApiError> {
        let url = format!("{}/callbacks/answer", self.base_url);
        let req = self.http.post(&url).headers(self.headers()).json(&AnswerCallbackRequest {
            callback_id,
            text,
            show_alert,
        });
        self.exec_request(req, "POST", &url).await?;
        Ok(())
    }
}
