//! E2E tests for profile endpoint

mod common;

use common::{TestServer, USER_ID};
use macguffin::data::{DEFAULT_STAT, PROFILES_COLLECTION, UserProfile};

#[tokio::test]
async fn test_profile_requires_token() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/profile"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_profile_defaults_for_new_agent() {
    let server = TestServer::new().await;
    let token = server.sign_in(USER_ID);

    let response = server
        .client
        .get(server.url("/profile"))
        .header("Authorization", token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["userID"], USER_ID);
    assert_eq!(json["strength"], DEFAULT_STAT);
    assert_eq!(json["charisma"], DEFAULT_STAT);
    assert!(json.get("publicAgentID").is_none());
}

#[tokio::test]
async fn test_profile_returns_stored_sheet_with_bearer_token() {
    let server = TestServer::new().await;
    let token = server.sign_in(USER_ID);

    let stored = UserProfile {
        public_agent_id: Some("agent-007".to_string()),
        dexterity: 15,
        ..UserProfile::starting(USER_ID)
    };
    server.fixture(PROFILES_COLLECTION).register_document(
        &serde_json::json!({ "userID": { "$eq": USER_ID } }),
        &stored,
    );

    let response = server
        .client
        .get(server.url("/profile"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let profile: UserProfile = response.json().await.unwrap();
    assert_eq!(profile, stored);
}
