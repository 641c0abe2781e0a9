use chrono::DateTime;
use chrono::Utc;
use guard_protocol::TokenBundle;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::dto::AuthRequest;
use crate::dto::AuthResponse;
use crate::dto::ChangeSlotRequest;
use crate::dto::ProjectGraphEntry;
use crate::dto::RawNotification;
use crate::CalendarEvent;
use crate::Notification;
use crate::ProjectGraph;
use crate::SchoolApiError;

/// HTTP client for the school's booking API. One method per logical
/// operation in spec §6; `bearer_token` is unset for [`Client::authenticate`]
/// (there is no session yet) and set via [`Client::with_bearer_token`] for
/// every call made on behalf of an already-authenticated reviewer.
#[derive(Clone, Debug)]
pub struct Client {
    base_url: String,
    http: reqwest::Client,
    bearer_token: Option<String>,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            http: reqwest::Client::new(),
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.bearer_token
            && let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}"))
        {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    async fn exec_request(
        &self,
        req: reqwest::RequestBuilder,
        method: &'static str,
        url: &str,
    ) -> Result<String, SchoolApiError> {
        let res = req.send().await?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SchoolApiError::BadCredentials);
        }
        if !status.is_success() {
            return Err(SchoolApiError::Status {
                method,
                url: url.to_string(),
                status,
                body,
            });
        }
        Ok(body)
    }

    fn decode_json<T: DeserializeOwned>(&self, url: &str, body: &str) -> Result<T, SchoolApiError> {
        serde_json::from_str(body).map_err(|err| SchoolApiError::Decode {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }

    /// `Authenticate(login, password) -> {access, refresh}`. See spec §6.
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<TokenBundle, SchoolApiError> {
        let url = format!("{}/auth", self.base_url);
        let req = self
            .http
            .post(&url)
            .headers(self.headers())
            .json(&AuthRequest {
                login: login.to_string(),
                password: password.to_string(),
            });
        let body = self.exec_request(req, "POST", &url).await?;
        let parsed: AuthResponse = self.decode_json(&url, &body)?;
        Ok(TokenBundle::new(parsed.access_token, parsed.refresh_token, parsed.expires_at))
    }

    /// `GetNotifications(offset, limit) -> [{id, message}]`, with the
    /// project name already extracted from each `message`.
    pub async fn get_notifications(&self, offset: i64, limit: i64) -> Result<Vec<Notification>, SchoolApiError> {
        let url = format!("{}/notifications", self.base_url);
        let req = self
            .http
            .get(&url)
            .headers(self.headers())
            .query(&[("offset", offset), ("limit", limit)]);
        let body = self.exec_request(req, "GET", &url).await?;
        let raw: Vec<RawNotification> = self.decode_json(&url, &body)?;
        Ok(raw
            .into_iter()
            .map(|n| Notification {
                project_name: extract_project_name(&n.message),
                id: n.id,
            })
            .collect())
    }

    /// `GetProjectGraph(login) -> [(family_label, project_name)]`.
    pub async fn get_project_graph(&self, login: &str) -> Result<ProjectGraph, SchoolApiError> {
        let url = format!("{}/users/{login}/project_graph", self.base_url);
        let req = self.http.get(&url).headers(self.headers());
        let body = self.exec_request(req, "GET", &url).await?;
        let entries: Vec<ProjectGraphEntry> = self.decode_json(&url, &body)?;
        Ok(ProjectGraph { entries })
    }

    /// `GetCalendarEvents(from, to) -> [{slot_id, start, end, booking_id, project_name?}]`.
    pub async fn get_calendar_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, SchoolApiError> {
        let url = format!("{}/calendar/events", self.base_url);
        let req = self
            .http
            .get(&url)
            .headers(self.headers())
            .query(&[("from", from.to_rfc3339()), ("to", to.to_rfc3339())]);
        let body = self.exec_request(req, "GET", &url).await?;
        self.decode_json(&url, &body)
    }

    /// `CancelSlot(slot_id)`. Idempotent: cancelling an already-cancelled
    /// slot is treated as success by the caller, not surfaced as an error
    /// here (the school API itself returns 2xx for it).
    pub async fn cancel_slot(&self, slot_id: &str) -> Result<(), SchoolApiError> {
        let url = format!("{}/calendar/slots/{slot_id}/cancel", self.base_url);
        let req = self.http.post(&url).headers(self.headers());
        self.exec_request(req, "POST", &url).await?;
        Ok(())
    }

    /// `ChangeSlot(slot_id, new_start, new_end)`.
    pub async fn change_slot(
        &self,
        slot_id: &str,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<(), SchoolApiError> {
        let url = format!("{}/calendar/slots/{slot_id}/change", self.base_url);
        let req = self
            .http
            .post(&url)
            .headers(self.headers())
            .json(&ChangeSlotRequest {
                start: new_start,
                end: new_end,
            });
        self.exec_request(req, "POST", &url).await?;
        Ok(())
    }
}

/// Extract the project name from a notification's free-text `message`.
///
/// Per spec §9, the real extraction rule is locale-sensitive and owned by
/// each school deployment; this implementation takes the substring between
/// the last case-insensitive occurrence of `"project "` and the next
/// whitespace or sentence-ending punctuation, which covers the common
/// `"... review for project libft ..."` phrasing. Returns `None` when no
/// such marker is found, which the state machine surfaces as
/// `NotificationMissing` and retries next tick.
pub(crate) fn extract_project_name(message: &str) -> Option<String> {
    let lower = message.to_ascii_lowercase();
    let marker = "project ";
    let start = lower.rfind(marker)? + marker.len();
    let rest = &message[start..];
    let end = rest
        .find(|c: char| c.is_whitespace() || matches!(c, '.' | ',' | '!' | '?' | ';'))
        .unwrap_or(rest.len());
    let name = rest[..end].trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
