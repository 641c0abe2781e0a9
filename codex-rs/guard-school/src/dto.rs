use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AuthRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// The wire shape of one notification, before project-name extraction.
/// The school API only ever gives us free text; which substring names the
/// project is a per-school convention, not a structured field. See spec §9
/// (open question: notification parsing is an adapter concern).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawNotification {
    pub id: String,
    pub message: String,
}

/// A school notification, with the project name already extracted from its
/// free-text `message`. See [`crate::client::extract_project_name`].
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub project_name: Option<String>,
}

/// One project's family membership, as returned by the project graph
/// endpoint. `family_label` is `None` for a project with no family.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectGraphEntry {
    pub project_name: String,
    pub family_label: Option<String>,
}

/// The full project → family mapping for a school account.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ProjectGraph {
    pub entries: Vec<ProjectGraphEntry>,
}

/// A scheduled review slot on the reviewer's calendar.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalendarEvent {
    pub slot_id: String,
    pub notification_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChangeSlotRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}
