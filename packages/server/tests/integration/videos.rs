use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use server::entity::video;

use crate::common::{TestApp, UploadFields, routes};

const CLIP: &[u8] = b"not really an mp4 but the bytes are what matter";

#[tokio::test]
async fn user_upload_is_pending_and_schedules_derivation() {
    let mut app = TestApp::spawn().await;
    let user = app.token(1, "user");

    let res = app
        .upload_with_token(UploadFields::titled("First"), "first.mp4", CLIP.to_vec(), &user)
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["status"], "pending");
    let id = res.id();

    let job = app
        .derivations
        .try_recv()
        .expect("upload should schedule a derivation job");
    assert_eq!(job.video_id, id);

    let row = video::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .expect("video row");
    assert_eq!(row.original_key, job.original_key);
    assert!(!row.is_approved);
    assert_eq!(app.store.get(&row.original_key).await.unwrap(), CLIP);
}

#[tokio::test]
async fn admin_upload_is_approved_immediately() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");

    let res = app
        .upload_with_token(UploadFields::titled("Official"), "o.mp4", CLIP.to_vec(), &admin)
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["status"], "approved");

    let list = app.get_without_token(routes::VIDEOS).await;
    assert_eq!(list.status, 200);
    assert_eq!(list.body["data"][0]["id"], res.id());
}

#[tokio::test]
async fn tags_are_normalized_on_upload() {
    let app = TestApp::spawn().await;
    let user = app.token(3, "user");

    let fields = UploadFields {
        tags: Some("#a,b  B"),
        ..UploadFields::titled("Tagged")
    };
    let res = app.upload_with_token(fields, "t.mp4", CLIP.to_vec(), &user).await;
    assert_eq!(res.status, 201, "{}", res.text);

    let detail = app.get_with_token(&routes::video(res.id()), &user).await;
    assert_eq!(detail.status, 200, "{}", detail.text);
    assert_eq!(detail.body["tags"], json!(["#a", "#b"]));
}

#[tokio::test]
async fn banned_tag_rejects_upload_without_side_effects() {
    let mut app = TestApp::spawn().await;
    let user = app.token(4, "user");

    for tags in ["fun, spam", "#FORBIDDEN"] {
        let fields = UploadFields {
            tags: Some(tags),
            ..UploadFields::titled("Nope")
        };
        let res = app.upload_with_token(fields, "n.mp4", CLIP.to_vec(), &user).await;
        assert_eq!(res.status, 400, "tags {tags:?}: {}", res.text);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
    }

    let rows = video::Entity::find().count(&app.db).await.unwrap();
    assert_eq!(rows, 0);
    assert!(app.derivations.try_recv().is_err());
}

#[tokio::test]
async fn upload_validation() {
    let app = TestApp::spawn().await;
    let user = app.token(5, "user");

    let res = app
        .upload_with_token(UploadFields::titled("   "), "x.mp4", CLIP.to_vec(), &user)
        .await;
    assert_eq!(res.status, 400, "blank title: {}", res.text);

    let res = app
        .upload_with_token(UploadFields::titled("Empty"), "x.mp4", Vec::new(), &user)
        .await;
    assert_eq!(res.status, 400, "empty file: {}", res.text);

    let fields = UploadFields {
        category_id: Some(999),
        ..UploadFields::titled("Orphan")
    };
    let res = app.upload_with_token(fields, "x.mp4", CLIP.to_vec(), &user).await;
    assert_eq!(res.status, 201, "unknown category: {}", res.text);
    let detail = app.get_with_token(&routes::video(res.id()), &user).await;
    assert!(detail.body["category_id"].is_null());
}

#[tokio::test]
async fn upload_requires_authentication() {
    let app = TestApp::spawn().await;

    let res = app
        .upload_with_token(UploadFields::titled("Anon"), "a.mp4", CLIP.to_vec(), "garbage")
        .await;
    assert_eq!(res.status, 401);
    assert_eq!(res.error_code(), "TOKEN_INVALID");
}

#[tokio::test]
async fn product_link_only_kept_for_business_accounts() {
    let app = TestApp::spawn().await;
    let business = app.token(6, "business");
    let user = app.token(7, "user");

    let mut ids = Vec::new();
    for token in [&business, &user] {
        let fields = UploadFields {
            product_link: Some("https://shop.example/item"),
            ..UploadFields::titled("Promo")
        };
        let res = app.upload_with_token(fields, "p.mp4", CLIP.to_vec(), token).await;
        assert_eq!(res.status, 201, "{}", res.text);
        ids.push(res.id());
    }

    let biz = app.get_with_token(&routes::video(ids[0]), &business).await;
    assert_eq!(biz.body["product_link"], "https://shop.example/item");
    let plain = app.get_with_token(&routes::video(ids[1]), &user).await;
    assert!(plain.body["product_link"].is_null());
}

#[tokio::test]
async fn pending_videos_only_visible_to_owner_and_admin() {
    let app = TestApp::spawn().await;
    let owner = app.token(10, "user");
    let other = app.token(11, "user");
    let admin = app.token(12, "admin");

    let id = app.upload_video(&owner, "Secret", CLIP).await;

    let public = app.get_without_token(routes::VIDEOS).await;
    assert_eq!(public.body["pagination"]["total"], 0);

    let mine = app.get_with_token(routes::MY_VIDEOS, &owner).await;
    assert_eq!(mine.status, 200);
    assert_eq!(mine.body["data"][0]["id"], id);
    assert_eq!(mine.body["data"][0]["is_approved"], false);

    assert_eq!(app.get_without_token(&routes::video(id)).await.status, 403);
    assert_eq!(app.get_with_token(&routes::video(id), &other).await.status, 403);
    assert_eq!(app.get_with_token(&routes::video(id), &owner).await.status, 200);
    assert_eq!(app.get_with_token(&routes::video(id), &admin).await.status, 200);
}

#[tokio::test]
async fn list_filters_combine() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    let cat = app.create_category(&admin, "Animals", None).await;

    let uploads = [
        ("Cat video", Some("#pets #cute"), Some(cat)),
        ("Dog video", Some("#pets"), None),
        ("Cooking", Some("#food"), Some(cat)),
    ];
    for (title, tags, category_id) in uploads {
        let fields = UploadFields {
            tags,
            category_id,
            ..UploadFields::titled(title)
        };
        let res = app.upload_with_token(fields, "v.mp4", CLIP.to_vec(), &admin).await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    let titles = |res: &crate::common::TestResponse| -> Vec<String> {
        let mut t: Vec<String> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["title"].as_str().unwrap().to_string())
            .collect();
        t.sort();
        t
    };

    let res = app.get_without_token(&format!("{}?search=VIDEO", routes::VIDEOS)).await;
    assert_eq!(titles(&res), ["Cat video", "Dog video"]);

    let res = app.get_without_token(&format!("{}?tags=cute,food", routes::VIDEOS)).await;
    assert_eq!(titles(&res), ["Cat video", "Cooking"]);

    let res = app
        .get_without_token(&format!("{}?tags=pets&category_id={cat}", routes::VIDEOS))
        .await;
    assert_eq!(titles(&res), ["Cat video"]);

    // Tag matching is whole-token: #pet must not match #pets.
    let res = app.get_without_token(&format!("{}?tags=pet", routes::VIDEOS)).await;
    assert!(titles(&res).is_empty());
}

#[tokio::test]
async fn pagination_is_bounded() {
    let app = TestApp::spawn().await;
    let admin = app.token(1, "admin");
    for i in 0..3 {
        app.upload_video(&admin, &format!("V{i}"), CLIP).await;
    }

    let res = app
        .get_without_token(&format!("{}?page=2&per_page=2", routes::VIDEOS))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
    assert_eq!(res.body["pagination"]["total"], 3);
    assert_eq!(res.body["pagination"]["total_pages"], 2);
}

#[tokio::test]
async fn update_metadata_by_owner_only() {
    let app = TestApp::spawn().await;
    let owner = app.token(20, "user");
    let other = app.token(21, "user");
    let id = app.upload_video(&owner, "Before", CLIP).await;

    let res = app
        .put_with_token(&routes::video(id), &json!({ "title": "Hijack" }), &other)
        .await;
    assert_eq!(res.status, 403);

    let res = app
        .put_with_token(
            &routes::video(id),
            &json!({ "title": "After", "tags": "New, tags", "product_link": "https://x" }),
            &owner,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["title"], "After");
    assert_eq!(res.body["tags"], json!(["#new", "#tags"]));

    let detail = app.get_with_token(&routes::video(id), &owner).await;
    assert!(detail.body["product_link"].is_null());

    let res = app
        .put_with_token(&routes::video(id), &json!({ "tags": "ok spam" }), &owner)
        .await;
    assert_eq!(res.status, 400);

    let res = app
        .put_with_token(&routes::video(id), &json!({ "title": "" }), &owner)
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn delete_removes_row_and_blob() {
    let app = TestApp::spawn().await;
    let owner = app.token(30, "user");
    let other = app.token(31, "user");
    let id = app.upload_video(&owner, "Doomed", CLIP).await;
    let row = video::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(app.delete_with_token(&routes::video(id), &other).await.status, 403);

    let res = app.delete_with_token(&routes::video(id), &owner).await;
    assert_eq!(res.status, 204, "{}", res.text);

    assert_eq!(app.get_with_token(&routes::video(id), &owner).await.status, 404);
    assert!(!app.store.exists(&row.original_key).await.unwrap());

    assert_eq!(app.delete_with_token(&routes::video(id), &owner).await.status, 404);
}

#[tokio::test]
async fn admin_can_delete_any_video() {
    let app = TestApp::spawn().await;
    let owner = app.token(40, "user");
    let admin = app.token(41, "admin");
    let id = app.upload_video(&owner, "Reported", CLIP).await;

    let res = app.delete_with_token(&routes::video(id), &admin).await;
    assert_eq!(res.status, 204, "{}", res.text);
}
