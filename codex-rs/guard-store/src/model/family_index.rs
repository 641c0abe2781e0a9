use chrono::DateTime;
use chrono::Utc;
use guard_protocol::ProjectFamilyIndex;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::StoreError;

pub(crate) struct FamilyIndexRow {
    pub entries_json: String,
    pub refreshed_at: Option<i64>,
}

impl TryFrom<SqliteRow> for FamilyIndexRow {
    type Error = StoreError;

    fn try_from(row: SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            entries_json: row.try_get("entries_json")?,
            refreshed_at: row.try_get("refreshed_at")?,
        })
    }
}

impl TryFrom<FamilyIndexRow> for ProjectFamilyIndex {
    type Error = StoreError;

    fn try_from(row: FamilyIndexRow) -> Result<Self, Self::Error> {
        let entries: std::collections::BTreeMap<String, String> =
            serde_json::from_str(&row.entries_json).map_err(|err| StoreError::MalformedRow {
                table: "project_family_index",
                reason: err.to_string(),
            })?;
        let refreshed_at = row
            .refreshed_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0));
        Ok(match refreshed_at {
            Some(refreshed_at) => ProjectFamilyIndex::new(entries, refreshed_at),
            None => ProjectFamilyIndex::default(),
        })
    }
}
