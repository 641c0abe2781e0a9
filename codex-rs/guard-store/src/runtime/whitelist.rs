use guard_protocol::Login;
use guard_protocol::WhitelistEntry;

use crate::model::WhitelistEntryRow;
use crate::StoreError;
use crate::StoreRuntime;

impl StoreRuntime {
    pub async fn list_whitelist(&self, login: &Login) -> Result<Vec<WhitelistEntry>, StoreError> {
        let rows = sqlx::query("SELECT login, kind, value FROM whitelist_entries WHERE login = ? ORDER BY id")
            .bind(login.as_str())
            .fetch_all(self.pool())
            .await?;
        rows.into_iter()
            .map(|row| WhitelistEntryRow::try_from(row).and_then(WhitelistEntry::try_from))
            .collect()
    }

    pub async fn add_whitelist_entry(&self, entry: &WhitelistEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO whitelist_entries (login, kind, value) VALUES (?, ?, ?)
               ON CONFLICT(login, kind, value) DO NOTHING"#,
        )
        .bind(entry.login.as_str())
        .bind(entry.kind.to_string())
        .bind(&entry.value)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Returns the number of rows removed — zero means the entry wasn't
    /// present, which callers surface to the reviewer as "not on the list".
    pub async fn remove_whitelist_entry(&self, entry: &WhitelistEntry) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM whitelist_entries WHERE login = ? AND kind = ? AND value = ?")
            .bind(entry.login.as_str())
            .bind(entry.kind.to_string())
            .bind(&entry.value)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
