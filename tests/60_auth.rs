mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use brickbix_api::testing::StaticIdentity;
use common::{property_body, requirement_body, TestServer};

async fn guarded() -> Result<TestServer> {
    let identity = StaticIdentity::new()
        .with_user("tok-owner", "owner@x.com", "Owner")
        .with_user("tok-rival", "rival@x.com", "Rival");
    let server = TestServer::start_with(identity, true).await?;
    server.seed_user("owner@x.com").await?;
    server.seed_user("rival@x.com").await?;
    Ok(server)
}

async fn send(
    server: &TestServer,
    method: reqwest::Method,
    path: &str,
    token: Option<&str>,
    body: Option<&Value>,
) -> Result<(StatusCode, Value)> {
    let mut request = server.http.request(method, server.url(path));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    if let Some(body) = body {
        request = request.json(body);
    }
    let res = request.send().await?;
    let status = res.status();
    Ok((status, res.json().await.unwrap_or(Value::Null)))
}

#[tokio::test]
async fn mutations_need_a_verified_bearer() -> Result<()> {
    let server = guarded().await?;
    let body = property_body("owner@x.com", "Guarded", "apartment", 1);

    let (status, err) = send(&server, reqwest::Method::POST, "/properties", None, Some(&body)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["code"], "UNAUTHORIZED");

    let (status, _) = send(&server, reqwest::Method::POST, "/properties", Some("forged"), Some(&body)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(server.store.property_count().await, 0);

    // reads stay public
    let (status, _) = send(&server, reqwest::Method::GET, "/properties", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn only_the_owner_may_change_a_listing() -> Result<()> {
    let server = guarded().await?;

    let body = property_body("owner@x.com", "Mine", "apartment", 1);
    let (status, _) = send(&server, reqwest::Method::POST, "/properties", Some("tok-rival"), Some(&body)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(&server, reqwest::Method::POST, "/properties", Some("tok-owner"), Some(&body)).await?;
    assert_eq!(status, StatusCode::CREATED);
    let path = format!("/properties/{}", created["property"]["_id"].as_str().unwrap_or_default());

    let patch = json!({"title": "Hijacked"});
    let (status, _) = send(&server, reqwest::Method::PATCH, &path, Some("tok-rival"), Some(&patch)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&server, reqwest::Method::DELETE, &path, Some("tok-rival"), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let patch = json!({"title": "Renamed"});
    let (status, updated) = send(&server, reqwest::Method::PATCH, &path, Some("tok-owner"), Some(&patch)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["property"]["title"], "Renamed");
    let (status, _) = send(&server, reqwest::Method::DELETE, &path, Some("tok-owner"), None).await?;
    assert_eq!(status, StatusCode::OK);

    let req = requirement_body("owner@x.com", "Need office", 1);
    let (status, _) = send(&server, reqwest::Method::POST, "/requirement", Some("tok-rival"), Some(&req)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn profile_update_is_self_service() -> Result<()> {
    let server = guarded().await?;
    let update = json!({"email": "owner@x.com", "workLocation": "Hinjewadi"});

    let (status, _) = send(&server, reqwest::Method::POST, "/users/update", Some("tok-rival"), Some(&update)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, user) = send(&server, reqwest::Method::POST, "/users/update", Some("tok-owner"), Some(&update)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["workLocation"], "Hinjewadi");
    Ok(())
}

#[tokio::test]
async fn login_and_signup_stay_open() -> Result<()> {
    let server = guarded().await?;

    let (status, _) = send(
        &server,
        reqwest::Method::POST,
        "/users",
        None,
        Some(&json!({"name": "Walk In", "email": "walkin@x.com"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, user) = send(
        &server,
        reqwest::Method::POST,
        "/users/login",
        None,
        Some(&json!({"credential": "tok-owner"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["email"], "owner@x.com");
    Ok(())
}
