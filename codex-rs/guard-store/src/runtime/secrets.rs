use async_trait::async_trait;
use guard_protocol::ErrorKind;
use guard_protocol::Login;
use guard_protocol::TokenBundle;
use guard_vault::SecretStore;
use guard_vault::VersionedBundle;

use crate::model::SecretDocumentRow;
use crate::StoreRuntime;

/// `StoreRuntime` doubles as a [`SecretStore`] so an operator can run the
/// bot with one database file instead of standing up a separate vault
/// backend. Version conflicts are enforced with the same conditional-update
/// pattern every other status transition in this crate uses.
#[async_trait]
impl SecretStore for StoreRuntime {
    async fn get(&self, login: &Login) -> Result<Option<VersionedBundle>, ErrorKind> {
        let row = sqlx::query("SELECT access_token, refresh_token, expires_at, version FROM secret_documents WHERE login = ?")
            .bind(login.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(|err| ErrorKind::ExternalTransient(err.to_string()))?;
        row.map(|row| {
            SecretDocumentRow::try_from(row)
                .map(VersionedBundle::from)
                .map_err(|err| ErrorKind::Fatal(err.to_string()))
        })
        .transpose()
    }

    async fn store(
        &self,
        login: &Login,
        bundle: TokenBundle,
        expected_version: Option<u64>,
    ) -> Result<u64, ErrorKind> {
        let next_version = expected_version.unwrap_or(0) + 1;
        let rows_affected = match expected_version {
            None => {
                sqlx::query(
                    r#"INSERT INTO secret_documents (login, access_token, refresh_token, expires_at, version)
                       VALUES (?, ?, ?, ?, ?)
                       ON CONFLICT(login) DO NOTHING"#,
                )
                .bind(login.as_str())
                .bind(&bundle.access_token)
                .bind(&bundle.refresh_token)
                .bind(bundle.expires_at.timestamp())
                .bind(next_version as i64)
                .execute(self.pool())
                .await
            }
            Some(expected) => {
                sqlx::query(
                    r#"UPDATE secret_documents SET access_token = ?, refresh_token = ?, expires_at = ?, version = ?
                       WHERE login = ? AND version = ?"#,
                )
                .bind(&bundle.access_token)
                .bind(&bundle.refresh_token)
                .bind(bundle.expires_at.timestamp())
                .bind(next_version as i64)
                .bind(login.as_str())
                .bind(expected as i64)
                .execute(self.pool())
                .await
            }
        }
        .map_err(|err| ErrorKind::ExternalTransient(err.to_string()))?
        .rows_affected();

        if rows_affected != 1 {
            return Err(ErrorKind::ExternalTransient(format!(
                "secret document version conflict for {login}"
            )));
        }
        Ok(next_version)
    }

    async fn delete(&self, login: &Login) -> Result<(), ErrorKind> {
        sqlx::query("DELETE FROM secret_documents WHERE login = ?")
            .bind(login.as_str())
            .execute(self.pool())
            .await
            .map_err(|err| ErrorKind::ExternalTransient(err.to_string()))?;
        Ok(())
    }
}
