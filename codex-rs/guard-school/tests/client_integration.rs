use chrono::Utc;
use guard_school::Client;
use pretty_assertions::assert_eq;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

#[tokio::test]
async fn authenticate_returns_bearer_tokens_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-123",
            "refresh_token": "refresh-456",
            "expires_at": Utc::now().to_rfc3339(),
        })))
        .mount(&server)
        .await;

    let client = Client::new(server.uri());
    let bundle = client.authenticate("alice", "hunter2").await.expect("ok");
    assert_eq!(bundle.access_token, "access-123");
    assert_eq!(bundle.refresh_token, "refresh-456");
}

#[tokio::test]
async fn authenticate_maps_401_to_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = Client::new(server.uri());
    let err = client.authenticate("alice", "wrong").await.unwrap_err();
    assert!(matches!(err, guard_school::SchoolApiError::BadCredentials));
}

#[tokio::test]
async fn get_notifications_extracts_project_name_from_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "n1", "message": "New review booked for project libft starting soon"},
            {"id": "n2", "message": "no project marker in this one"},
        ])))
        .mount(&server)
        .await;

    let client = Client::new(server.uri()).with_bearer_token("token");
    let notifications = client.get_notifications(0, 10).await.expect("ok");
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].project_name.as_deref(), Some("libft"));
    assert_eq!(notifications[1].project_name, None);
}

#[tokio::test]
async fn get_project_graph_decodes_family_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/alice/project_graph"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"project_name": "libft", "family_label": "C - I"},
            {"project_name": "push_swap", "family_label": null},
        ])))
        .mount(&server)
        .await;

    let client = Client::new(server.uri()).with_bearer_token("token");
    let graph = client.get_project_graph("alice").await.expect("ok");
    assert_eq!(graph.entries.len(), 2);
    assert_eq!(graph.entries[0].family_label.as_deref(), Some("C - I"));
    assert_eq!(graph.entries[1].family_label, None);
}

#[tokio::test]
async fn cancel_slot_treats_2xx_as_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendar/slots/slot-1/cancel"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = Client::new(server.uri()).with_bearer_token("token");
    client.cancel_slot("slot-1").await.expect("ok");
}

#[tokio::test]
async fn change_slot_posts_new_bounds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendar/slots/slot-1/change"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = Client::new(server.uri()).with_bearer_token("token");
    let now = Utc::now();
    client
        .change_slot("slot-1", now, now + chrono::Duration::minutes(30))
        .await
        .expect("ok");
}

#[tokio::test]
async fn server_error_maps_to_external_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/calendar/events"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = Client::new(server.uri()).with_bearer_token("token");
    let now = Utc::now();
    let err = client.get_calendar_events(now, now).await.unwrap_err();
    let kind: guard_protocol::ErrorKind = err.into();
    assert!(matches!(kind, guard_protocol::ErrorKind::ExternalTransient(_)));
}
