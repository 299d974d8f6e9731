use crate::common::{MAX_UPLOAD, TestApp, routes};

async fn article_with_token(app: &TestApp) -> (String, i32) {
    let token = app.admin_token().await;
    let category = app.create_category(&token, "Photos").await;
    let article = app.create_published(&token, category, "Gallery Piece").await;
    app.settle().await;
    (token, article["id"].as_i64().unwrap() as i32)
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn uploaded_file_is_served_at_its_url() {
        let app = TestApp::spawn().await;
        let (token, id) = article_with_token(&app).await;

        let res = app
            .upload_with_token(
                &routes::article_media(id),
                "../../Holiday Photo.PNG",
                "image/png",
                b"PNG_DATA".to_vec(),
                None,
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["collection"], "gallery");
        assert_eq!(res.body["name"], "Holiday Photo.PNG");
        assert_eq!(res.body["mime_type"], "image/png");
        assert_eq!(res.body["size"], 8);
        let file_name = res.body["file_name"].as_str().unwrap();
        assert!(file_name.ends_with(".png"));
        assert!(!file_name.contains("Holiday"));

        let url = res.body["url"].as_str().unwrap();
        assert!(url.starts_with(&format!("/media/articles/{id}/")));
        let served = app.client.get(app.url(url)).send().await.unwrap();
        assert_eq!(served.status().as_u16(), 200);
        assert_eq!(served.headers()["content-type"], "image/png");
        assert_eq!(served.bytes().await.unwrap().as_ref(), b"PNG_DATA");
    }

    #[tokio::test]
    async fn featured_image_replaces_the_previous_one() {
        let app = TestApp::spawn().await;
        let (token, id) = article_with_token(&app).await;

        let first = app
            .upload_with_token(
                &routes::article_media(id),
                "a.jpg",
                "image/jpeg",
                b"FIRST".to_vec(),
                Some("featured_image"),
                &token,
            )
            .await;
        assert_eq!(first.status, 201);
        let second = app
            .upload_with_token(
                &routes::article_media(id),
                "b.jpg",
                "image/jpeg",
                b"SECOND".to_vec(),
                Some("featured_image"),
                &token,
            )
            .await;
        assert_eq!(second.status, 201);

        let list = app.get_with_token(&routes::article_media(id), &token).await;
        let items = list.body["data"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], second.body["id"]);

        let old = app
            .client
            .get(app.url(first.body["url"].as_str().unwrap()))
            .send()
            .await
            .unwrap();
        assert_eq!(old.status().as_u16(), 404);

        let public = app.get_without_token(&routes::article("gallery-piece")).await;
        assert_eq!(public.body["featured_image_url"], second.body["url"]);
    }

    #[tokio::test]
    async fn gallery_items_are_numbered_in_upload_order() {
        let app = TestApp::spawn().await;
        let (token, id) = article_with_token(&app).await;

        for name in ["1.png", "2.png", "3.png"] {
            let res = app
                .upload_with_token(&routes::article_media(id), name, "image/png", b"x".to_vec(), None, &token)
                .await;
            assert_eq!(res.status, 201);
        }

        let list = app.get_with_token(&routes::article_media(id), &token).await;
        let positions: Vec<i64> = list.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["position"].as_i64().unwrap())
            .collect();
        assert_eq!(positions, [0, 1, 2]);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let app = TestApp::spawn().await;
        let (token, id) = article_with_token(&app).await;

        let res = app
            .upload_with_token(
                &routes::article_media(id),
                "big.bin",
                "application/octet-stream",
                vec![0u8; MAX_UPLOAD as usize + 1],
                None,
                &token,
            )
            .await;

        assert_eq!(res.status, 413);
        assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn empty_file_and_unknown_collection_are_field_errors() {
        let app = TestApp::spawn().await;
        let (token, id) = article_with_token(&app).await;

        let empty = app
            .upload_with_token(&routes::article_media(id), "e.png", "image/png", Vec::new(), None, &token)
            .await;
        assert_eq!(empty.status, 422);
        assert!(empty.body["fields"]["file"].is_array());

        let odd = app
            .upload_with_token(
                &routes::article_media(id),
                "e.png",
                "image/png",
                b"x".to_vec(),
                Some("banner"),
                &token,
            )
            .await;
        assert_eq!(odd.status, 422);
        assert!(odd.body["fields"]["collection"].is_array());
    }

    #[tokio::test]
    async fn subscribers_cannot_upload() {
        let app = TestApp::spawn().await;
        let (_, id) = article_with_token(&app).await;
        let reader = app
            .create_user_with_role("reader@example.com", "password123", "subscriber")
            .await;

        let res = app
            .upload_with_token(&routes::article_media(id), "a.png", "image/png", b"x".to_vec(), None, &reader)
            .await;

        assert_eq!(res.status, 403);
    }
}

mod removal {
    use super::*;

    #[tokio::test]
    async fn deleting_media_removes_row_and_file() {
        let app = TestApp::spawn().await;
        let (token, id) = article_with_token(&app).await;
        let uploaded = app
            .upload_with_token(&routes::article_media(id), "a.png", "image/png", b"x".to_vec(), None, &token)
            .await;
        let media_id = uploaded.body["id"].as_str().unwrap();

        let res = app.delete_with_token(&routes::media(media_id), &token).await;
        assert_eq!(res.status, 204);

        let list = app.get_with_token(&routes::article_media(id), &token).await;
        assert!(list.body["data"].as_array().unwrap().is_empty());
        let served = app
            .client
            .get(app.url(uploaded.body["url"].as_str().unwrap()))
            .send()
            .await
            .unwrap();
        assert_eq!(served.status().as_u16(), 404);

        let again = app.delete_with_token(&routes::media(media_id), &token).await;
        assert_eq!(again.status, 404);
    }

    #[tokio::test]
    async fn force_deleting_an_article_removes_its_files() {
        let app = TestApp::spawn().await;
        let (token, id) = article_with_token(&app).await;
        let uploaded = app
            .upload_with_token(&routes::article_media(id), "a.png", "image/png", b"x".to_vec(), None, &token)
            .await;

        app.delete_with_token(&routes::admin_article(id), &token).await;
        let res = app.delete_with_token(&routes::force_delete(id), &token).await;
        assert_eq!(res.status, 204);

        let served = app
            .client
            .get(app.url(uploaded.body["url"].as_str().unwrap()))
            .send()
            .await
            .unwrap();
        assert_eq!(served.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn path_traversal_is_not_served() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token("/media/..%2F..%2Fetc%2Fpasswd").await;

        assert_eq!(res.status, 404);
    }
}
