use serde_json::json;

use crate::common::{TestApp, routes};

const CLIP: &[u8] = b"0123456789";

#[tokio::test]
async fn approval_publishes_and_rejection_hides() {
    let app = TestApp::spawn().await;
    let owner = app.token(1, "user");
    let admin = app.token(2, "admin");
    let id = app.upload_video(&owner, "Review me", CLIP).await;

    let res = app
        .put_with_token(&routes::moderation(id), &json!({ "status": "approved" }), &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["is_approved"], true);

    let public = app.get_without_token(routes::VIDEOS).await;
    assert_eq!(public.body["data"][0]["id"], id);
    assert_eq!(app.get_without_token(&routes::video(id)).await.status, 200);

    let res = app
        .put_with_token(&routes::moderation(id), &json!({ "status": "rejected" }), &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["is_approved"], false);

    let public = app.get_without_token(routes::VIDEOS).await;
    assert_eq!(public.body["pagination"]["total"], 0);
    assert_eq!(app.get_without_token(&routes::video(id)).await.status, 403);
}

#[tokio::test]
async fn moderation_requires_admin() {
    let app = TestApp::spawn().await;
    let owner = app.token(1, "user");
    let business = app.token(3, "business");
    let id = app.upload_video(&owner, "Self approve", CLIP).await;

    for token in [&owner, &business] {
        let res = app
            .put_with_token(&routes::moderation(id), &json!({ "status": "approved" }), token)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.error_code(), "PERMISSION_DENIED");
    }

    assert_eq!(app.get_with_token(routes::ADMIN_VIDEOS, &owner).await.status, 403);
}

#[tokio::test]
async fn unknown_status_is_rejected() {
    let app = TestApp::spawn().await;
    let owner = app.token(1, "user");
    let admin = app.token(2, "admin");
    let id = app.upload_video(&owner, "Limbo", CLIP).await;

    let res = app
        .put_with_token(&routes::moderation(id), &json!({ "status": "deleted" }), &admin)
        .await;
    assert_eq!(res.status, 400);

    let res = app
        .put_with_token(&routes::moderation(9999), &json!({ "status": "approved" }), &admin)
        .await;
    assert_eq!(res.status, 404);

    let res = app
        .get_with_token(&format!("{}?status=bogus", routes::ADMIN_VIDEOS), &admin)
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn admin_listing_filters_by_status() {
    let app = TestApp::spawn().await;
    let owner = app.token(1, "user");
    let admin = app.token(2, "admin");
    let pending = app.upload_video(&owner, "Pending", CLIP).await;
    let approved = app.upload_approved(&owner, &admin, "Approved", CLIP).await;

    let res = app.get_with_token(routes::ADMIN_VIDEOS, &admin).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["pagination"]["total"], 1);
    assert_eq!(res.body["data"][0]["id"], pending);

    let res = app
        .get_with_token(&format!("{}?status=approved", routes::ADMIN_VIDEOS), &admin)
        .await;
    assert_eq!(res.body["pagination"]["total"], 1);
    assert_eq!(res.body["data"][0]["id"], approved);

    let res = app
        .get_with_token(&format!("{}?status=all", routes::ADMIN_VIDEOS), &admin)
        .await;
    assert_eq!(res.body["pagination"]["total"], 2);
}
