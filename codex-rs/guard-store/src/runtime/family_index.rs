use chrono::DateTime;
use chrono::Utc;
use guard_protocol::Login;
use guard_protocol::ProjectFamilyIndex;

use crate::model::FamilyIndexRow;
use crate::StoreError;
use crate::StoreRuntime;

impl StoreRuntime {
    pub async fn get_family_index(&self, login: &Login) -> Result<ProjectFamilyIndex, StoreError> {
        let row = sqlx::query("SELECT entries_json, refreshed_at FROM project_family_index WHERE login = ?")
            .bind(login.as_str())
            .fetch_optional(self.pool())
            .await?;
        match row {
            Some(row) => FamilyIndexRow::try_from(row).and_then(ProjectFamilyIndex::try_from),
            None => Ok(ProjectFamilyIndex::default()),
        }
    }

    pub async fn replace_family_index(
        &self,
        login: &Login,
        entries: &std::collections::BTreeMap<String, String>,
        refreshed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let entries_json = serde_json::to_string(entries).map_err(|err| StoreError::MalformedRow {
            table: "project_family_index",
            reason: err.to_string(),
        })?;
        sqlx::query(
            r#"INSERT INTO project_family_index (login, entries_json, refreshed_at)
               VALUES (?, ?, ?)
               ON CONFLICT(login) DO UPDATE SET entries_json = excluded.entries_json, refreshed_at = excluded.refreshed_at"#,
        )
        .bind(login.as_str())
        .bind(entries_json)
        .bind(refreshed_at.timestamp())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
