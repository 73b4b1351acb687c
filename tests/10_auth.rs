mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{app, delegated_app, get, login, send, DUMMY_TOKEN};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = app();
    let res = send(&app, Method::GET, "/health", None, None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["status"], "ok");
    assert_eq!(res.body["data"]["store"], "memory");

    let res = send(&app, Method::GET, "/", None, None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    Ok(())
}

#[tokio::test]
async fn missing_token_is_unauthorized() -> Result<()> {
    let app = app();
    let res = send(&app, Method::GET, "/api/medications", None, None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["message"], "Unauthorized");
    Ok(())
}

#[tokio::test]
async fn unknown_token_is_invalid() -> Result<()> {
    let app = app();
    let res = get(&app, "/api/medications", "not_a_dummy_token").await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn dummy_exchange_issues_prefixed_token() -> Result<()> {
    let app = app();
    let body = json!({ "supabase_user_id": "ext-42", "email": "someone@example.com", "name": "Someone" });
    let res = send(&app, Method::POST, "/api/auth/token", None, Some(body)).await?;
    assert_eq!(res.status, StatusCode::OK);

    let token = res.body["data"]["token"].as_str().unwrap_or_default().to_string();
    assert!(token.starts_with("dummy_token_"));
    assert!(token.ends_with("_ext-42"));

    let me = get(&app, "/api/user", &token).await?;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["email"], "test@example.com");
    assert_eq!(me.body["data"]["name"], "Test User");
    Ok(())
}

#[tokio::test]
async fn dummy_exchange_validates_body() -> Result<()> {
    let app = app();
    let res = send(&app, Method::POST, "/api/auth/token", None, Some(json!({ "email": "nope" }))).await?;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.body["errors"]["supabase_user_id"].is_array());
    assert!(res.body["errors"]["email"].is_array());
    Ok(())
}

#[tokio::test]
async fn every_dummy_token_is_the_same_user() -> Result<()> {
    let app = app();
    let a = get(&app, "/api/user", DUMMY_TOKEN).await?;
    let b = get(&app, "/api/user", "dummy_token_other").await?;
    assert_eq!(a.body["data"]["id"], b.body["data"]["id"]);
    Ok(())
}

#[tokio::test]
async fn delegated_session_lifecycle() -> Result<()> {
    let app = delegated_app();
    let token = login(&app, "alice").await?;

    let me = get(&app, "/api/user", &token).await?;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["email"], "alice@example.com");
    assert_eq!(me.body["data"]["name"], "alice@example.com");

    let res = send(&app, Method::POST, "/api/auth/revoke", Some(token.as_str()), None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Token revoked");

    let res = get(&app, "/api/user", &token).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn delegated_rejects_bad_credentials_and_dummy_tokens() -> Result<()> {
    let app = delegated_app();
    let res = send(&app, Method::POST, "/api/auth/token", None, Some(json!({ "access_token": "bad" }))).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = send(&app, Method::POST, "/api/auth/token", None, Some(json!({}))).await?;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.body["errors"]["access_token"].is_array());

    let res = get(&app, "/api/user", DUMMY_TOKEN).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn revoking_one_session_keeps_the_other() -> Result<()> {
    let app = delegated_app();
    let first = login(&app, "alice").await?;
    let second = login(&app, "alice").await?;

    send(&app, Method::POST, "/api/auth/revoke", Some(first.as_str()), None).await?;
    assert_eq!(get(&app, "/api/user", &first).await?.status, StatusCode::UNAUTHORIZED);
    assert_eq!(get(&app, "/api/user", &second).await?.status, StatusCode::OK);
    Ok(())
}
