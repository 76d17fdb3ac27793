use serde_json::json;

use crate::common::{TestApp, TestResponse, routes};

async fn create_stream(
    app: &TestApp,
    token: &str,
    title: &str,
    extra: serde_json::Value,
) -> TestResponse {
    let mut body = json!({
        "title": title,
        "stream_url": format!("https://live.example/{title}"),
    });
    if let (Some(fields), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        fields.extend(extra.clone());
    }
    app.post_with_token(routes::LIVESTREAMS, &body, token).await
}

fn titles(res: &TestResponse) -> Vec<String> {
    res.body
        .as_array()
        .expect("array body")
        .iter()
        .map(|s| s["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn create_defaults_to_scheduled() {
    let app = TestApp::spawn().await;
    let host = app.token(1, "user");

    let res = create_stream(&app, &host, "Soon", json!({ "description": "  later  " })).await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["status"], "scheduled");
    assert_eq!(res.body["user_id"], 1);
    assert_eq!(res.body["description"], "later");
    assert!(res.body["started_at"].is_null());

    let res = create_stream(&app, &host, "Now", json!({ "status": " LIVE " })).await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["status"], "live");
    assert!(res.body["started_at"].is_string());

    let res = create_stream(
        &app,
        &host,
        "Planned",
        json!({ "scheduled_at": "2030-05-01T18:00:00Z" }),
    )
    .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert!(res.body["scheduled_at"].as_str().unwrap().starts_with("2030-05-01T18:00:00"));
}

#[tokio::test]
async fn create_validates_fields() {
    let app = TestApp::spawn().await;
    let host = app.token(1, "user");

    let res = app
        .post_with_token(
            routes::LIVESTREAMS,
            &json!({ "title": "  ", "stream_url": "https://x" }),
            &host,
        )
        .await;
    assert_eq!(res.status, 400);

    let res = app
        .post_with_token(
            routes::LIVESTREAMS,
            &json!({ "title": "No url", "stream_url": "" }),
            &host,
        )
        .await;
    assert_eq!(res.status, 400);

    let res = create_stream(&app, &host, "Odd", json!({ "status": "paused" })).await;
    assert_eq!(res.status, 400);
    assert_eq!(res.error_code(), "VALIDATION_ERROR");

    let res = create_stream(&app, &host, "When", json!({ "scheduled_at": "tomorrow" })).await;
    assert_eq!(res.status, 400);

    let res = app
        .client
        .post(format!("http://{}{}", app.addr, routes::LIVESTREAMS))
        .json(&json!({ "title": "Anon", "stream_url": "https://x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn public_listing_filters_by_status() {
    let app = TestApp::spawn().await;
    let host = app.token(1, "user");

    create_stream(&app, &host, "OnAir", json!({ "status": "live" })).await;
    create_stream(
        &app,
        &host,
        "Later",
        json!({ "scheduled_at": "2031-01-01T00:00:00Z" }),
    )
    .await;
    create_stream(
        &app,
        &host,
        "Sooner",
        json!({ "scheduled_at": "2030-01-01T00:00:00Z" }),
    )
    .await;
    let done = create_stream(&app, &host, "Done", json!({ "status": "live" })).await.id();
    let res = app
        .put_with_token(&routes::livestream_status(done), &json!({ "status": "ended" }), &host)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let res = app.get_without_token(routes::LIVESTREAMS).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(titles(&res), ["OnAir"]);

    let res = app
        .get_without_token(&format!("{}?status=scheduled", routes::LIVESTREAMS))
        .await;
    assert_eq!(titles(&res), ["Sooner", "Later"]);

    let res = app
        .get_without_token(&format!("{}?status=ended", routes::LIVESTREAMS))
        .await;
    assert_eq!(titles(&res), ["Done"]);

    let res = app
        .get_without_token(&format!("{}?status=all&limit=2", routes::LIVESTREAMS))
        .await;
    assert_eq!(res.body.as_array().unwrap().len(), 2);

    let res = app
        .get_without_token(&format!("{}?status=paused", routes::LIVESTREAMS))
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn mine_lists_only_callers_streams() {
    let app = TestApp::spawn().await;
    let alice = app.token(1, "user");
    let bob = app.token(2, "user");

    create_stream(&app, &alice, "A1", json!({})).await;
    create_stream(&app, &alice, "A2", json!({ "status": "live" })).await;
    create_stream(&app, &bob, "B1", json!({})).await;

    let res = app.get_with_token(routes::MY_LIVESTREAMS, &alice).await;
    assert_eq!(res.status, 200, "{}", res.text);
    let mut mine = titles(&res);
    mine.sort();
    assert_eq!(mine, ["A1", "A2"]);

    let res = app
        .get_with_token(&format!("{}?status=live", routes::MY_LIVESTREAMS), &alice)
        .await;
    assert_eq!(titles(&res), ["A2"]);

    let res = app
        .get_with_token(&format!("{}?status=bogus", routes::MY_LIVESTREAMS), &alice)
        .await;
    assert_eq!(res.status, 400);

    assert_eq!(app.get_without_token(routes::MY_LIVESTREAMS).await.status, 401);
}

#[tokio::test]
async fn status_transitions_stamp_times() {
    let app = TestApp::spawn().await;
    let host = app.token(1, "user");
    let id = create_stream(&app, &host, "Show", json!({})).await.id();

    let res = app
        .put_with_token(&routes::livestream_status(id), &json!({ "status": "Live" }), &host)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "live");
    let started = res.body["started_at"].clone();
    assert!(started.is_string());

    let res = app
        .put_with_token(&routes::livestream_status(id), &json!({ "status": "ended" }), &host)
        .await;
    assert_eq!(res.body["status"], "ended");
    assert!(res.body["ended_at"].is_string());
    assert_eq!(res.body["started_at"], started);

    // Resuming keeps the original start and clears the end.
    let res = app
        .put_with_token(&routes::livestream_status(id), &json!({ "status": "live" }), &host)
        .await;
    assert_eq!(res.body["started_at"], started);
    assert!(res.body["ended_at"].is_null());

    let res = app
        .put_with_token(
            &routes::livestream_status(id),
            &json!({ "status": "scheduled" }),
            &host,
        )
        .await;
    assert!(res.body["started_at"].is_null());
    assert!(res.body["ended_at"].is_null());

    for bad in ["", "paused"] {
        let res = app
            .put_with_token(&routes::livestream_status(id), &json!({ "status": bad }), &host)
            .await;
        assert_eq!(res.status, 400, "status '{bad}': {}", res.text);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn update_replaces_fields_and_keeps_schedule_when_absent() {
    let app = TestApp::spawn().await;
    let host = app.token(1, "user");
    let id = create_stream(
        &app,
        &host,
        "Draft",
        json!({ "scheduled_at": "2030-03-03T10:00:00Z", "thumbnail_url": "https://img/1" }),
    )
    .await
    .id();

    let res = app
        .put_with_token(
            &routes::livestream(id),
            &json!({ "title": "Final", "stream_url": "https://live.example/final" }),
            &host,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["title"], "Final");
    assert_eq!(res.body["thumbnail_url"], "");
    assert!(res.body["scheduled_at"].is_string());
    assert_eq!(res.body["status"], "scheduled");

    let res = app
        .put_with_token(
            &routes::livestream(id),
            &json!({ "title": "Final", "stream_url": "https://x", "scheduled_at": "" }),
            &host,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert!(res.body["scheduled_at"].is_null());

    let res = app
        .put_with_token(
            &routes::livestream(id),
            &json!({ "title": "Final", "stream_url": "  " }),
            &host,
        )
        .await;
    assert_eq!(res.status, 400);

    let fetched = app.get_without_token(&routes::livestream(id)).await;
    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.body["stream_url"], "https://x");
}

#[tokio::test]
async fn only_owner_or_admin_may_manage() {
    let app = TestApp::spawn().await;
    let owner = app.token(1, "user");
    let stranger = app.token(2, "user");
    let admin = app.token(3, "admin");
    let id = create_stream(&app, &owner, "Mine", json!({})).await.id();

    let edit = json!({ "title": "Hijacked", "stream_url": "https://evil" });
    let go_live = json!({ "status": "live" });
    let res = app.put_with_token(&routes::livestream(id), &edit, &stranger).await;
    assert_eq!(res.status, 403);
    let res = app
        .put_with_token(&routes::livestream_status(id), &go_live, &stranger)
        .await;
    assert_eq!(res.status, 403);
    let res = app.delete_with_token(&routes::livestream(id), &stranger).await;
    assert_eq!(res.status, 403);

    let res = app
        .put_with_token(&routes::livestream_status(id), &go_live, &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    assert_eq!(app.delete_with_token(&routes::livestream(id), &admin).await.status, 204);
    assert_eq!(app.get_without_token(&routes::livestream(id)).await.status, 404);
    assert_eq!(app.delete_with_token(&routes::livestream(id), &owner).await.status, 404);
}
