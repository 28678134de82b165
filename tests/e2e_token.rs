//! E2E tests for sign-in and token verification

mod common;

use common::{ACCESS_TOKEN, GOOD_CODE, TestServer, USER_ID};
use macguffin::api::TokenResponse;
use macguffin::auth::derive_client_token;
use macguffin::data::{AGENTS_COLLECTION, TOKENS_COLLECTION, TokenRecord, UserRecord};

#[tokio::test]
async fn test_token_exchange_issues_client_token() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/token"))
        .json(&serde_json::json!({ "code": GOOD_CODE }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: TokenResponse = response.json().await.unwrap();
    assert_eq!(body.access_token, derive_client_token(ACCESS_TOKEN, USER_ID));

    let stored: TokenRecord = server
        .fixture(TOKENS_COLLECTION)
        .last_insert_as()
        .unwrap()
        .unwrap();
    assert_eq!(stored.user_id, USER_ID);
    assert_eq!(stored.client_token, body.access_token);

    let user: UserRecord = server
        .fixture(AGENTS_COLLECTION)
        .last_insert_as()
        .unwrap()
        .unwrap();
    assert_eq!(user, UserRecord::uninitialized(USER_ID));
}

#[tokio::test]
async fn test_token_exchange_is_repeatable() {
    let server = TestServer::new().await;

    let mut tokens = Vec::new();
    for _ in 0..2 {
        let body: TokenResponse = server
            .client
            .post(server.url("/token"))
            .json(&serde_json::json!({ "code": GOOD_CODE }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        tokens.push(body.access_token);
    }

    assert_eq!(tokens[0], tokens[1]);
}

#[tokio::test]
async fn test_token_requires_code() {
    let server = TestServer::new().await;

    for body in [r#"{"code":""}"#, r#"{}"#, "not json"] {
        let response = server
            .client
            .post(server.url("/token"))
            .body(body)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400, "body: {body}");
    }

    assert!(server.fixture(TOKENS_COLLECTION).last_insert().is_none());
}

#[tokio::test]
async fn test_rejected_code_is_bad_gateway() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/token"))
        .json(&serde_json::json!({ "code": "stale-code" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("bad_verification_code"));
    assert!(server.fixture(TOKENS_COLLECTION).last_insert().is_none());
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/profile"))
        .header("Authorization", "no-such-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Token has expired");
}

#[tokio::test]
async fn test_token_without_user_is_server_error() {
    let server = TestServer::new().await;
    let token = derive_client_token(ACCESS_TOKEN, "orphan");
    server.fixture(TOKENS_COLLECTION).register_document(
        &serde_json::json!({ "clientToken": { "$eq": token } }),
        &serde_json::json!({ "userID": "orphan", "clientToken": token }),
    );

    let response = server
        .client
        .get(server.url("/profile"))
        .header("Authorization", token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
}
