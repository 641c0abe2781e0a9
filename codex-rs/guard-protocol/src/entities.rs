use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;
use strum_macros::EnumString;

use crate::ids::Login;

/// Whether a reviewer is actively polled by the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewerStatus {
    /// Has a valid credential on file; included in every tick's fan-out.
    Active,
    /// Logged out, or never authenticated; skipped by the reconciliation loop.
    LoggedOut,
}

/// A school account the bot watches on behalf of. See spec §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reviewer {
    pub login: Login,
    pub chat_id: String,
    pub status: ReviewerStatus,
    pub created_at: DateTime<Utc>,
    pub last_auth_success_at: Option<DateTime<Utc>>,
    pub last_auth_failure_at: Option<DateTime<Utc>>,
}

impl Reviewer {
    pub fn new(login: Login, chat_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            login,
            chat_id: chat_id.into(),
            status: ReviewerStatus::LoggedOut,
            created_at: now,
            last_auth_success_at: None,
            last_auth_failure_at: None,
        }
    }
}

/// One entry in a reviewer's project or family whitelist. See spec §3, §4.1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub login: Login,
    pub kind: crate::whitelist::WhitelistKind,
    pub value: String,
}

impl WhitelistEntry {
    pub fn new(login: Login, kind: crate::whitelist::WhitelistKind, value: impl Into<String>) -> Self {
        Self {
            login,
            kind,
            value: value.into(),
        }
    }
}

/// A cached mapping from project name to family label for one reviewer's
/// school account. Refreshed on demand by `RefreshFamilyIndex`. See spec §4.1.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectFamilyIndex {
    entries: std::collections::BTreeMap<String, String>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl ProjectFamilyIndex {
    pub fn new(entries: std::collections::BTreeMap<String, String>, refreshed_at: DateTime<Utc>) -> Self {
        Self {
            entries,
            refreshed_at: Some(refreshed_at),
        }
    }

    /// The family label for `project_name`, if this index has seen it.
    pub fn family_of(&self, project_name: &str) -> Option<&str> {
        self.entries.get(project_name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn family_index_looks_up_known_projects_only() {
        let mut entries = std::collections::BTreeMap::new();
        entries.insert("ft_printf".to_string(), "printf_family".to_string());
        let index = ProjectFamilyIndex::new(entries, Utc::now());
        assert_eq!(index.family_of("ft_printf"), Some("printf_family"));
        assert_eq!(index.family_of("unknown_project"), None);
    }
}
