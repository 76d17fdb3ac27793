use serde_json::json;

use crate::common::{TestApp, UploadFields, routes};

/// The tree listing entry for `id`.
async fn tree_item(app: &TestApp, id: i32) -> serde_json::Value {
    let tree = app.get_without_token(routes::CATEGORIES).await;
    assert_eq!(tree.status, 200, "{}", tree.text);
    tree.body
        .as_array()
        .expect("array body")
        .iter()
        .find(|item| item["id"] == id)
        .cloned()
        .expect("category in tree")
}

/// Assert `id` is still a root category.
async fn assert_still_root(app: &TestApp, id: i32) {
    let item = tree_item(app, id).await;
    assert!(item["parent_id"].is_null(), "parent changed: {item}");
    assert_eq!(item["depth"], 1);
}

fn names(res: &crate::common::TestResponse) -> Vec<String> {
    res.body
        .as_array()
        .expect("array body")
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn tree_lists_parents_before_children_with_paths() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let music = app.create_category(&admin, "Music", None).await;
    let rock = app.create_category(&admin, "Rock", Some(music)).await;
    app.create_category(&admin, "Punk", Some(rock)).await;
    app.create_category(&admin, "Games", None).await;

    let res = app.get_without_token(routes::CATEGORIES).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(names(&res), ["Music", "Rock", "Punk", "Games"]);
    assert_eq!(res.body[2]["depth"], 3);
    assert_eq!(res.body[2]["path"], "Music / Rock / Punk");
    assert_eq!(res.body[3]["depth"], 1);
}

#[tokio::test]
async fn mutations_require_admin() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let user = app.token(2, "user");
    let id = app.create_category(&admin, "Locked", None).await;

    let res = app
        .post_with_token(routes::CATEGORIES, &json!({ "name": "Mine" }), &user)
        .await;
    assert_eq!(res.status, 403);
    let res = app
        .put_with_token(&routes::category(id), &json!({ "name": "Renamed" }), &user)
        .await;
    assert_eq!(res.status, 403);
    assert_eq!(app.delete_with_token(&routes::category(id), &user).await.status, 403);
}

#[tokio::test]
async fn depth_is_capped_at_five() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");

    let mut parent = None;
    for level in 1..=5 {
        parent = Some(app.create_category(&admin, &format!("L{level}"), parent).await);
    }

    let res = app
        .post_with_token(
            routes::CATEGORIES,
            &json!({ "name": "L6", "parent_id": parent }),
            &admin,
        )
        .await;
    assert_eq!(res.status, 400, "{}", res.text);

    let res = app
        .post_with_token(
            routes::CATEGORIES,
            &json!({ "name": "Nowhere", "parent_id": 9999 }),
            &admin,
        )
        .await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn names_are_globally_unique() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let a = app.create_category(&admin, "Alpha", None).await;
    let b = app.create_category(&admin, "Beta", Some(a)).await;

    let res = app
        .post_with_token(
            routes::CATEGORIES,
            &json!({ "name": "Alpha", "parent_id": b }),
            &admin,
        )
        .await;
    assert_eq!(res.status, 409);

    let res = app
        .put_with_token(&routes::category(b), &json!({ "name": "Alpha" }), &admin)
        .await;
    assert_eq!(res.status, 409);

    // Renaming to the current name succeeds without change.
    let res = app
        .put_with_token(&routes::category(b), &json!({ "name": "Beta" }), &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["name"], "Beta");

    let res = app
        .put_with_token(&routes::category(b), &json!({ "name": "Gamma" }), &admin)
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["name"], "Gamma");
}

#[tokio::test]
async fn move_rejects_cycles_and_depth_overflow() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let a = app.create_category(&admin, "A", None).await;
    let b = app.create_category(&admin, "B", Some(a)).await;
    let c = app.create_category(&admin, "C", Some(b)).await;

    let res = app
        .put_with_token(&routes::category_move(a), &json!({ "parent_id": c }), &admin)
        .await;
    assert_eq!(res.status, 400, "cycle: {}", res.text);
    assert_still_root(&app, a).await;
    assert_eq!(tree_item(&app, c).await["depth"], 3);

    let res = app
        .put_with_token(&routes::category_move(a), &json!({ "parent_id": a }), &admin)
        .await;
    assert_eq!(res.status, 400, "self parent: {}", res.text);
    assert_still_root(&app, a).await;

    // A three-level subtree fits under a level-2 node but not a level-3 one.
    let x = app.create_category(&admin, "X", None).await;
    let y = app.create_category(&admin, "Y", Some(x)).await;
    let z = app.create_category(&admin, "Z", Some(y)).await;

    let res = app
        .put_with_token(&routes::category_move(a), &json!({ "parent_id": z }), &admin)
        .await;
    assert_eq!(res.status, 400, "depth: {}", res.text);
    assert_still_root(&app, a).await;
    assert_eq!(tree_item(&app, c).await["path"], "A / B / C");

    let res = app
        .put_with_token(&routes::category_move(a), &json!({ "parent_id": y }), &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["parent_id"], y);

    let c_item = tree_item(&app, c).await;
    assert_eq!(c_item["depth"], 5);
    assert_eq!(c_item["path"], "X / Y / A / B / C");

    // Back to the root.
    let res = app
        .put_with_token(&routes::category_move(a), &json!({ "parent_id": null }), &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert!(res.body["parent_id"].is_null());
    assert_still_root(&app, a).await;
}

#[tokio::test]
async fn moved_category_is_appended_to_new_siblings() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let parent = app.create_category(&admin, "Parent", None).await;
    app.create_category(&admin, "First", Some(parent)).await;
    app.create_category(&admin, "Second", Some(parent)).await;
    let mover = app.create_category(&admin, "Mover", None).await;

    let res = app
        .put_with_token(
            &routes::category_move(mover),
            &json!({ "parent_id": parent }),
            &admin,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let res = app
        .get_without_token(&format!("{}?parent_id={parent}", routes::CATEGORY_CHILDREN))
        .await;
    assert_eq!(names(&res), ["First", "Second", "Mover"]);
}

#[tokio::test]
async fn reorder_before_sibling_or_to_end() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let a = app.create_category(&admin, "A", None).await;
    let b = app.create_category(&admin, "B", None).await;
    let c = app.create_category(&admin, "C", None).await;
    let nested = app.create_category(&admin, "Nested", Some(a)).await;

    let res = app
        .put_with_token(&routes::category_reorder(c), &json!({ "before_id": a }), &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    let roots = app.get_without_token(routes::CATEGORY_CHILDREN).await;
    assert_eq!(names(&roots), ["C", "A", "B"]);

    let res = app
        .put_with_token(&routes::category_reorder(c), &json!({ "before_id": null }), &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    let roots = app.get_without_token(routes::CATEGORY_CHILDREN).await;
    assert_eq!(names(&roots), ["A", "B", "C"]);

    let res = app
        .put_with_token(
            &routes::category_reorder(b),
            &json!({ "before_id": nested }),
            &admin,
        )
        .await;
    assert_eq!(res.status, 400, "not a sibling: {}", res.text);
}

#[tokio::test]
async fn children_listing_reports_child_counts() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let root = app.create_category(&admin, "Root", None).await;
    let left = app.create_category(&admin, "Left", Some(root)).await;
    app.create_category(&admin, "Right", Some(root)).await;
    app.create_category(&admin, "Leaf", Some(left)).await;

    let res = app
        .get_without_token(&format!("{}?parent_id={root}", routes::CATEGORY_CHILDREN))
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(names(&res), ["Left", "Right"]);
    assert_eq!(res.body[0]["child_count"], 1);
    assert_eq!(res.body[1]["child_count"], 0);

    let res = app
        .get_without_token(&format!(
            "{}?parent_id={root}&limit=1",
            routes::CATEGORY_CHILDREN
        ))
        .await;
    assert_eq!(names(&res), ["Left"]);
}

#[tokio::test]
async fn delete_detaches_children_and_videos() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let doomed = app.create_category(&admin, "Doomed", None).await;
    let child = app.create_category(&admin, "Survivor", Some(doomed)).await;
    app.create_category(&admin, "Grandchild", Some(child)).await;

    let fields = UploadFields {
        category_id: Some(doomed),
        ..UploadFields::titled("Filed")
    };
    let upload = app
        .upload_with_token(fields, "f.mp4", b"bytes".to_vec(), &admin)
        .await;
    assert_eq!(upload.status, 201, "{}", upload.text);
    let video_id = upload.id();

    let counts = app.get_without_token(&routes::category_counts(doomed)).await;
    assert_eq!(counts.status, 200, "{}", counts.text);
    assert_eq!(counts.body["child_count"], 1);
    assert_eq!(counts.body["descendant_count"], 2);
    assert_eq!(counts.body["video_count"], 1);

    let res = app.delete_with_token(&routes::category(doomed), &admin).await;
    assert_eq!(res.status, 204, "{}", res.text);

    let roots = app.get_without_token(routes::CATEGORY_CHILDREN).await;
    assert_eq!(names(&roots), ["Survivor"]);

    let video = app.get_without_token(&routes::video(video_id)).await;
    assert_eq!(video.status, 200);
    assert!(video.body["category_id"].is_null());

    assert_eq!(
        app.get_without_token(&routes::category_counts(doomed)).await.status,
        404
    );
}
