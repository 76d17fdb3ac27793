use std::time::Duration;

use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use server::entity::video;

use crate::common::{TestApp, routes};

const CLIP: &[u8] = b"0123456789abcdefghij";

async fn set_derived(app: &TestApp, id: i32, apply: impl FnOnce(&mut video::ActiveModel)) {
    let row = video::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .expect("video row");
    let mut active: video::ActiveModel = row.into();
    apply(&mut active);
    active.update(&app.db).await.expect("update derived keys");
}

#[tokio::test]
async fn full_fetch_advertises_ranges() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let id = app.upload_video(&admin, "Whole", CLIP).await;

    let res = app.get_without_token(&routes::content(id)).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.bytes, CLIP);
    assert_eq!(res.header("accept-ranges"), Some("bytes"));
    assert_eq!(res.header("content-length"), Some("20"));
    assert_eq!(res.header("content-type"), Some("video/mp4"));
}

#[tokio::test]
async fn range_requests_return_partial_content() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let id = app.upload_video(&admin, "Ranged", CLIP).await;

    let res = app.get_range(&routes::content(id), "bytes=0-3", None).await;
    assert_eq!(res.status, 206, "{}", res.text);
    assert_eq!(res.bytes, b"0123");
    assert_eq!(res.header("content-range"), Some("bytes 0-3/20"));
    assert_eq!(res.header("content-length"), Some("4"));

    let res = app.get_range(&routes::content(id), "bytes=15-", None).await;
    assert_eq!(res.status, 206);
    assert_eq!(res.bytes, b"fghij");
    assert_eq!(res.header("content-range"), Some("bytes 15-19/20"));

    let res = app.get_range(&routes::content(id), "bytes=-3", None).await;
    assert_eq!(res.status, 206);
    assert_eq!(res.bytes, b"hij");

    let res = app.get_range(&routes::content(id), "bytes=10-999", None).await;
    assert_eq!(res.status, 206);
    assert_eq!(res.header("content-range"), Some("bytes 10-19/20"));
}

#[tokio::test]
async fn unsatisfiable_ranges_report_size() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let id = app.upload_video(&admin, "Short", CLIP).await;

    for header in ["bytes=20-", "bytes=30-40", "bytes=5-2", "items=0-1", "bytes=0-1,4-5"] {
        let res = app.get_range(&routes::content(id), header, None).await;
        assert_eq!(res.status, 416, "header {header}: {}", res.text);
        assert_eq!(res.header("content-range"), Some("bytes */20"));
        assert_eq!(res.error_code(), "RANGE_NOT_SATISFIABLE");
    }
}

#[tokio::test]
async fn pending_content_is_gated() {
    let app = TestApp::spawn().await;
    let owner = app.token(1, "user");
    let other = app.token(2, "user");
    let id = app.upload_video(&owner, "Hidden", CLIP).await;

    assert_eq!(app.get_without_token(&routes::content(id)).await.status, 403);
    assert_eq!(app.get_with_token(&routes::content(id), &other).await.status, 403);
    assert_eq!(app.get_with_token(&routes::content(id), &owner).await.status, 200);
    assert_eq!(app.get_without_token(&routes::content(9999)).await.status, 404);
}

#[tokio::test]
async fn quality_selects_rendition_with_fallback() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let id = app.upload_video(&admin, "Renditions", CLIP).await;

    // Not derived yet: 720p falls back to the original.
    let res = app
        .get_without_token(&format!("{}?quality=720p", routes::content(id)))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.bytes, CLIP);

    let key = format!("derived/{id}/720p.mp4");
    app.store.put(&key, b"small", "video/mp4").await.unwrap();
    set_derived(&app, id, |v| v.rendition_720p_key = Set(Some(key))).await;

    let res = app
        .get_without_token(&format!("{}?quality=720p", routes::content(id)))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.bytes, b"small");

    let res = app
        .get_without_token(&format!("{}?quality=480p", routes::content(id)))
        .await;
    assert_eq!(res.bytes, CLIP);

    let detail = app.get_without_token(&routes::video(id)).await;
    assert_eq!(detail.body["qualities"], serde_json::json!(["original", "720p"]));
}

#[tokio::test]
async fn thumbnail_available_after_derivation() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let id = app.upload_video(&admin, "Preview", CLIP).await;

    let res = app.get_without_token(&routes::thumbnail(id)).await;
    assert_eq!(res.status, 404);

    let key = format!("derived/{id}/thumb.jpg");
    app.store.put(&key, b"jpeg", "image/jpeg").await.unwrap();
    set_derived(&app, id, |v| v.thumbnail_static_key = Set(Some(key))).await;

    // Animated form missing: the still is served instead.
    let res = app.get_without_token(&routes::thumbnail(id)).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.bytes, b"jpeg");
    assert_eq!(res.header("content-type"), Some("image/jpeg"));

    let res = app
        .get_without_token(&format!("{}?variant=sideways", routes::thumbnail(id)))
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn content_fetches_count_views() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let id = app.upload_video(&admin, "Popular", CLIP).await;

    for _ in 0..3 {
        assert_eq!(app.get_without_token(&routes::content(id)).await.status, 200);
    }
    // Unsatisfiable ranges are not views.
    assert_eq!(
        app.get_range(&routes::content(id), "bytes=99-", None).await.status,
        416
    );

    let mut views = 0;
    for _ in 0..50 {
        let row = video::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        views = row.views;
        if views == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(views, 3);
}
