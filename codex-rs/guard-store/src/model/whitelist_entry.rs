use std::str::FromStr;

use guard_protocol::Login;
use guard_protocol::WhitelistEntry;
use guard_protocol::WhitelistKind;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::StoreError;

pub(crate) struct WhitelistEntryRow {
    pub login: String,
    pub kind: String,
    pub value: String,
}

impl TryFrom<SqliteRow> for WhitelistEntryRow {
    type Error = StoreError;

    fn try_from(row: SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            login: row.try_get("login")?,
            kind: row.try_get("kind")?,
            value: row.try_get("value")?,
        })
    }
}

impl TryFrom<WhitelistEntryRow> for WhitelistEntry {
    type Error = StoreError;

    fn try_from(row: WhitelistEntryRow) -> Result<Self, Self::Error> {
        let kind = WhitelistKind::from_str(&row.kind).map_err(|_| StoreError::MalformedRow {
            table: "whitelist_entries",
            reason: format!("unknown kind {:?}", row.kind),
        })?;
        Ok(Self {
            login: Login::new(row.login),
            kind,
            value: row.value,
        })
    }
}
