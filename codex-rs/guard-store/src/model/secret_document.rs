use chrono::DateTime;
use chrono::Utc;
use guard_protocol::TokenBundle;
use guard_vault::VersionedBundle;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::StoreError;

pub(crate) struct SecretDocumentRow {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub version: i64,
}

impl TryFrom<SqliteRow> for SecretDocumentRow {
    type Error = StoreError;

    fn try_from(row: SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            access_token: row.try_get("access_token")?,
            refresh_token: row.try_get("refresh_token")?,
            expires_at: row.try_get("expires_at")?,
            version: row.try_get("version")?,
        })
    }
}

impl From<SecretDocumentRow> for VersionedBundle {
    fn from(row: SecretDocumentRow) -> Self {
        Self {
            bundle: TokenBundle::new(
                row.access_token,
                row.refresh_token,
                DateTime::<Utc>::from_timestamp(row.expires_at, 0).unwrap_or_else(Utc::now),
            ),
            version: row.version as u64,
        }
    }
}
