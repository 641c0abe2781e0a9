use guard_protocol::Login;
use guard_protocol::ReviewerSettings;

use crate::model::ReviewerSettingsRow;
use crate::StoreError;
use crate::StoreRuntime;

impl StoreRuntime {
    pub async fn get_reviewer_settings(&self, login: &Login) -> Result<Option<ReviewerSettings>, StoreError> {
        let row = sqlx::query(
            r#"SELECT response_deadline_shift_minutes, non_whitelist_cancel_delay_minutes,
                      notify_whitelist_timeout, notify_non_whitelist_cancel,
                      slot_shift_threshold_minutes, slot_shift_duration_minutes, cleanup_duration_minutes
               FROM reviewer_settings WHERE login = ?"#,
        )
        .bind(login.as_str())
        .fetch_optional(self.pool())
        .await?;
        row.map(|row| ReviewerSettingsRow::try_from(row).map(ReviewerSettings::from))
            .transpose()
    }

    /// Seed the defaults for a freshly registered reviewer. A no-op if
    /// settings already exist for this login.
    pub async fn seed_reviewer_settings(&self, login: &Login, settings: ReviewerSettings) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO reviewer_settings
                   (login, response_deadline_shift_minutes, non_whitelist_cancel_delay_minutes,
                    notify_whitelist_timeout, notify_non_whitelist_cancel,
                    slot_shift_threshold_minutes, slot_shift_duration_minutes, cleanup_duration_minutes)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(login) DO NOTHING"#,
        )
        .bind(login.as_str())
        .bind(settings.response_deadline_shift_minutes)
        .bind(settings.non_whitelist_cancel_delay_minutes)
        .bind(settings.notify_whitelist_timeout)
        .bind(settings.notify_non_whitelist_cancel)
        .bind(settings.slot_shift_threshold_minutes)
        .bind(settings.slot_shift_duration_minutes)
        .bind(settings.cleanup_duration_minutes)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn update_reviewer_settings(&self, login: &Login, settings: ReviewerSettings) -> Result<(), StoreError> {
        sqlx::query(
            r#"UPDATE reviewer_settings SET
                   response_deadline_shift_minutes = ?, non_whitelist_cancel_delay_minutes = ?,
                   notify_whitelist_timeout = ?, notify_non_whitelist_cancel = ?,
                   slot_shift_threshold_minutes = ?, slot_shift_duration_minutes = ?, cleanup_duration_minutes = ?
               WHERE login = ?"#,
        )
        .bind(settings.response_deadline_shift_minutes)
        .bind(settings.non_whitelist_cancel_delay_minutes)
        .bind(settings.notify_whitelist_timeout)
        .bind(settings.notify_non_whitelist_cancel)
        .bind(settings.slot_shift_threshold_minutes)
        .bind(settings.slot_shift_duration_minutes)
        .bind(settings.cleanup_duration_minutes)
        .bind(login.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use guard_protocol::Reviewer;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn seed_then_update_round_trips_every_field() {
        let store = StoreRuntime::init_in_memory().await.expect("init");
        let login = Login::new("jdoe");
        store.upsert_reviewer(&Reviewer::new(login.clone(), "123", Utc::now())).await.unwrap();
        store.seed_reviewer_settings(&login, ReviewerSettings::defaults()).await.unwrap();

        let mut settings = ReviewerSettings::defaults();
        settings.notify_whitelist_timeout = false;
        settings.cleanup_duration_minutes = 30;
        store.update_reviewer_settings(&login, settings).await.unwrap();

        let fetched = store.get_reviewer_settings(&login).await.unwrap().expect("present");
        assert!(!fetched.notify_whitelist_timeout);
        assert_eq!(fetched.cleanup_duration_minutes, 30);
        assert!(fetched.notify_non_whitelist_cancel);
    }
}
