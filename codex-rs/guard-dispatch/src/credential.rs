//! Plain-text path: a message that isn't a callback or a command is only
//! ever meaningful as a `login:password` credential, sent right after
//! `/start`. See spec §4.4.

use guard_protocol::Login;
use guard_protocol::Reviewer;
use guard_protocol::ReviewerSettings;
use guard_protocol::ReviewerStatus;

use crate::Services;

pub(crate) async fn handle_plain_text(services: &Services, chat_id: &str, text: &str) {
    let Some((login, password)) = split_credential(text) else {
        services.reply(chat_id, "send your credentials as login:password, or /help for commands").await;
        return;
    };

    let login = Login::new(login);
    let school = guard_school::Client::new(services.school_base_url.clone());
    let call = school.authenticate(login.as_str(), password);
    let authenticated = match tokio::time::timeout(services.call_timeout, call).await {
        Ok(Ok(bundle)) => bundle,
        Ok(Err(err)) => {
            tracing::info!(error = %err, %login, "authenticate rejected");
            record_failure(services, &login).await;
            services.reply(chat_id, "login failed, check your credentials and try again").await;
            return;
        }
        Err(_) => {
            tracing::warn!(%login, "authenticate timed out");
            services.reply(chat_id, "try again later").await;
            return;
        }
    };

    let now = services.clock.now();
    if let Err(err) = services.vault.store(&login, authenticated, None).await {
        tracing::warn!(error = %err, %login, "vault store failed");
        services.reply(chat_id, "try again later").await;
        return;
    }

    let existing = services.store.get_reviewer(&login).await.ok().flatten();
    let mut reviewer = existing.unwrap_or_else(|| Reviewer::new(login.clone(), chat_id, now));
    reviewer.chat_id = chat_id.to_string();
    reviewer.status = ReviewerStatus::Active;
    reviewer.last_auth_success_at = Some(now);
    if let Err(err) = services.store.upsert_reviewer(&reviewer).await {
        tracing::warn!(error = %err, %login, "upsert_reviewer failed");
        services.reply(chat_id, "try again later").await;
        return;
    }
    if let Err(err) = services.store.record_auth_success(&login, now).await {
        tracing::warn!(error = %err, %login, "record_auth_success failed");
    }

    if services.store.get_reviewer_settings(&login).await.ok().flatten().is_none() {
        if let Err(err) = services.store.seed_reviewer_settings(&login, ReviewerSettings::defaults()).await {
            tracing::warn!(error = %err, %login, "seed_reviewer_settings failed");
        }
    }

    services.reply(chat_id, &format!("Welcome, {login}. You're connected.")).await;
}

async fn record_failure(services: &Services, login: &Login) {
    let Ok(Some(_)) = services.store.get_reviewer(login).await else {
        return;
    };
    let now = services.clock.now();
    if let Err(err) = services.store.record_auth_failure(login, now).await {
        tracing::warn!(error = %err, %login, "record_auth_failure failed");
    }
}

/// `login:password`, with exactly one `:` and both halves non-empty.
fn split_credential(text: &str) -> Option<(&str, &str)> {
    let mut parts = text.splitn(2, ':');
    let login = parts.next()?.trim();
    let password = parts.next()?.trim();
    if login.is_empty() || password.is_empty() || login.contains(':') {
        return None;
    }
    Some((login, password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use guard_clock::Clock;
    use guard_clock::FixedClock;
    use guard_store::StoreRuntime;
    use guard_vault::InMemorySecretStore;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::matchers::path;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;

    async fn services(base_url: String, now: chrono::DateTime<Utc>) -> Services {
        let store = StoreRuntime::init_in_memory().await.expect("init");
        let secret_store = Arc::new(InMemorySecretStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
        let vault = Arc::new(guard_vault::TokenVault::new(secret_store, clock.clone(), 5));
        let chat = guard_chat::Client::new("http://127.0.0.1:1", "bot-token");
        Services::new(store, vault, chat, base_url, clock)
    }

    #[test]
    fn splits_on_first_colon_only() {
        assert_eq!(split_credential("alice:hunter2"), Some(("alice", "hunter2")));
        assert_eq!(split_credential("alice:hunter2:extra"), Some(("alice", "hunter2:extra")));
        assert_eq!(split_credential("alice"), None);
        assert_eq!(split_credential(":hunter2"), None);
        assert_eq!(split_credential("alice:"), None);
    }

    #[tokio::test]
    async fn malformed_text_gets_the_help_pointer() {
        let now = Utc::now();
        let services = services("http://127.0.0.1:1".to_string(), now).await;
        // No panics, and no reviewer materializes from garbage input.
        handle_plain_text(&services, "555", "not a credential").await;
        assert!(services.store.get_reviewer(&Login::new("not a credential")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn successful_authentication_activates_the_reviewer_and_seeds_settings() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_at": Utc::now() + chrono::Duration::hours(1),
            })))
            .mount(&mock_server)
            .await;

        let now = Utc::now();
        let services = services(mock_server.uri(), now).await;
        handle_plain_text(&services, "555", "alice:hunter2").await;

        let login = Login::new("alice");
        let reviewer = services.store.get_reviewer(&login).await.unwrap().expect("reviewer created");
        assert_eq!(reviewer.status, ReviewerStatus::Active);
        assert_eq!(reviewer.chat_id, "555");
        let settings = services.store.get_reviewer_settings(&login).await.unwrap();
        assert!(settings.is_some());
        let bundle = services.vault.get(&login).await.unwrap().expect("token vaulted");
        assert_eq!(bundle.access_token, "access-1");
    }

    #[tokio::test]
    async fn reauthenticating_refreshes_last_auth_success_at_for_a_returning_reviewer() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-2",
                "refresh_token": "refresh-2",
                "expires_at": Utc::now() + chrono::Duration::hours(1),
            })))
            .mount(&mock_server)
            .await;

        let earlier = Utc::now() - chrono::Duration::days(1);
        let later = Utc::now();
        let services = services(mock_server.uri(), later).await;
        let login = Login::new("alice");
        services
            .store
            .upsert_reviewer(&Reviewer::new(login.clone(), "555", earlier))
            .await
            .unwrap();
        services.vault.store(&login, guard_protocol::TokenBundle::new("old", "old", earlier), None).await.unwrap();

        handle_plain_text(&services, "555", "alice:hunter2").await;

        let reviewer = services.store.get_reviewer(&login).await.unwrap().expect("reviewer still present");
        assert_eq!(reviewer.last_auth_success_at, Some(later));
        let bundle = services.vault.get(&login).await.unwrap().expect("token overwritten");
        assert_eq!(bundle.access_token, "access-2");
    }

    #[tokio::test]
    async fn rejected_credentials_record_a_failure_on_an_existing_reviewer() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let now = Utc::now();
        let services = services(mock_server.uri(), now).await;
        let login = Login::new("alice");
        services
            .store
            .upsert_reviewer(&Reviewer::new(login.clone(), "555", now))
            .await
            .unwrap();

        handle_plain_text(&services, "555", "alice:wrong").await;

        let reviewer = services.store.get_reviewer(&login).await.unwrap().unwrap();
        assert_eq!(reviewer.last_auth_failure_at, Some(now));
        assert_eq!(reviewer.status, ReviewerStatus::LoggedOut);
    }
}
