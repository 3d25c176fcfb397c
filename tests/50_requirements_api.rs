mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use brickbix_api::database::{FailPoint, Store};
use common::{requirement_body, TestServer};

#[tokio::test]
async fn requirement_lifecycle() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.seed_user("buyer@x.com").await?;

    let (status, created) = server
        .post_json("/requirement", &requirement_body("buyer@x.com", "Need 2BHK", 6_000_000))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["message"], "Requirement created successfully");
    let id = created["requirement"]["_id"].as_str().unwrap_or_default().to_string();
    assert_eq!(
        server.store.find_user(owner.id).await?.expect("owner").all_requirements.len(),
        1
    );

    let (status, shown) = server.get_json(&format!("/requirement/{}", id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shown["creator"]["email"], "buyer@x.com");
    assert_eq!(shown["askedPrice"], 6_000_000);

    let (status, updated) = server
        .patch_json(&format!("/requirement/{}", id), &json!({"askedPrice": 5_500_000, "dealType": "direct"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["requirement"]["askedPrice"], 5_500_000);
    assert_eq!(updated["requirement"]["dealType"], "Direct");
    assert_eq!(updated["requirement"]["title"], "Need 2BHK");

    let (status, body) = server.delete(&format!("/requirement/{}", id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Requirement deleted successfully");
    assert!(server.store.find_user(owner.id).await?.expect("owner").all_requirements.is_empty());

    let (status, _) = server.delete(&format!("/requirement/{}", id)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn missing_asked_price_is_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    server.seed_user("buyer@x.com").await?;
    let mut body = requirement_body("buyer@x.com", "No price", 0);
    if let Some(fields) = body.as_object_mut() {
        fields.remove("askedPrice");
    }

    let (status, err) = server.post_json("/requirement", &body).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["field_errors"]["askedPrice"], "is required");
    assert_eq!(server.store.requirement_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn failed_commit_leaves_nothing_behind() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.seed_user("buyer@x.com").await?;
    server.store.fail_on(FailPoint::Insert).await;

    let (status, err) = server
        .post_json("/requirement", &requirement_body("buyer@x.com", "Doomed", 1))
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err["code"], "TRANSACTION_ABORTED");
    assert_eq!(server.store.requirement_count().await, 0);
    assert!(server.store.find_user(owner.id).await?.expect("owner").all_requirements.is_empty());

    // fail points fire once
    let (status, _) = server
        .post_json("/requirement", &requirement_body("buyer@x.com", "Second try", 1))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn failed_unlink_keeps_requirement() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.seed_user("buyer@x.com").await?;
    let (_, created) = server
        .post_json("/requirement", &requirement_body("buyer@x.com", "Sticky", 1))
        .await?;
    let id = created["requirement"]["_id"].as_str().unwrap_or_default().to_string();

    server.store.fail_on(FailPoint::PullRef).await;
    let (status, _) = server.delete(&format!("/requirement/{}", id)).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(server.store.requirement_count().await, 1);
    assert_eq!(
        server.store.find_user(owner.id).await?.expect("owner").all_requirements.len(),
        1
    );
    Ok(())
}

#[tokio::test]
async fn list_and_five() -> Result<()> {
    let server = TestServer::start().await?;
    let (status, empty) = server.get_json("/requirement/five").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty, json!({"requirements": [], "totalRequirementsCount": 0}));

    server.seed_user("buyer@x.com").await?;
    for (i, price) in [300, 100, 200, 400].iter().enumerate() {
        server
            .post_json("/requirement", &requirement_body("buyer@x.com", &format!("Want {}", i), *price))
            .await?;
    }

    let (_, summary) = server.get_json("/requirement/five").await?;
    assert_eq!(summary["totalRequirementsCount"], 4);
    assert_eq!(summary["requirements"].as_array().map(Vec::len), Some(3));
    assert_eq!(summary["requirements"][0]["title"], "Want 3");

    let res = server
        .http
        .get(server.url("/requirement?_sort=askedPrice&_order=desc&_start=0&_end=2"))
        .send()
        .await?;
    assert_eq!(res.headers()["x-total-count"], "4");
    let rows: serde_json::Value = res.json().await?;
    assert_eq!(rows[0]["askedPrice"], 400);
    assert_eq!(rows[1]["askedPrice"], 300);

    let (status, _) = server.get_json("/requirement?_sort=price").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
