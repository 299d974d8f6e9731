use serde_json::json;

use crate::common::{TestApp, routes};

mod creation {
    use super::*;

    #[tokio::test]
    async fn editor_creates_a_draft_with_derived_slug() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("editor@example.com", "password123", "editor")
            .await;
        let admin = app.admin_token().await;
        let category = app.create_category(&admin, "Science").await;

        let article = app
            .create_draft(&token, category, "Quantum Computing Breakthrough!")
            .await;

        assert_eq!(article["slug"], "quantum-computing-breakthrough");
        assert_eq!(article["status"], "draft");
        assert!(article["published_at"].is_null());
        assert_eq!(article["views"], 0);
        assert_eq!(article["category"]["id"], category);
        assert_eq!(article["author"]["name"], "editor");
    }

    #[tokio::test]
    async fn colliding_titles_get_numbered_slugs() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "World").await;

        let first = app.create_draft(&token, category, "Hello World").await;
        let second = app.create_draft(&token, category, "Hello World").await;
        let third = app.create_draft(&token, category, "Hello, World").await;

        assert_eq!(first["slug"], "hello-world");
        assert_eq!(second["slug"], "hello-world-1");
        assert_eq!(third["slug"], "hello-world-2");
    }

    #[tokio::test]
    async fn trashed_articles_keep_their_slug_reserved() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "World").await;

        let first = app.create_draft(&token, category, "Reserved").await;
        let id = first["id"].as_i64().unwrap() as i32;
        let res = app.delete_with_token(&routes::admin_article(id), &token).await;
        assert_eq!(res.status, 204);

        let second = app.create_draft(&token, category, "Reserved").await;
        assert_eq!(second["slug"], "reserved-1");
    }

    #[tokio::test]
    async fn explicit_slug_collision_is_a_conflict() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "World").await;
        app.create_article(
            &token,
            json!({"title": "One", "slug": "taken", "category_id": category}),
        )
        .await;

        let res = app
            .post_with_token(
                routes::ADMIN_ARTICLES,
                &json!({"title": "Two", "slug": "taken", "content": "x", "category_id": category}),
                &token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn unknown_category_and_tags_are_field_errors() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .post_with_token(
                routes::ADMIN_ARTICLES,
                &json!({"title": "Orphan", "content": "x", "category_id": 999}),
                &token,
            )
            .await;

        assert_eq!(res.status, 422);
        assert!(res.body["fields"]["category_id"].is_array());
    }

    #[tokio::test]
    async fn tags_are_attached_and_returned_sorted() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let rust = app.create_tag(&token, "Rust").await;
        let ai = app.create_tag(&token, "AI").await;

        let article = app
            .create_article(
                &token,
                json!({"title": "Tagged", "category_id": category, "tag_ids": [rust, ai]}),
            )
            .await;

        let names: Vec<&str> = article["tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["AI", "Rust"]);
    }

    #[tokio::test]
    async fn subscriber_cannot_create_published_articles() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let category = app.create_category(&admin, "Tech").await;
        let subscriber = app
            .create_user_with_role("sub@example.com", "password123", "subscriber")
            .await;

        let res = app
            .post_with_token(
                routes::ADMIN_ARTICLES,
                &json!({"title": "Nope", "content": "x", "category_id": category, "status": "published"}),
                &subscriber,
            )
            .await;

        assert_eq!(res.status, 403);
    }
}

mod updating {
    use super::*;

    #[tokio::test]
    async fn renaming_regenerates_the_slug() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let article = app.create_draft(&token, category, "Old Title").await;
        let id = article["id"].as_i64().unwrap() as i32;

        let res = app
            .patch_with_token(&routes::admin_article(id), &json!({"title": "New Title"}), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "New Title");
        assert_eq!(res.body["slug"], "new-title");
    }

    #[tokio::test]
    async fn null_clears_optional_fields_and_absent_keeps_them() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let article = app
            .create_article(
                &token,
                json!({
                    "title": "Meta",
                    "category_id": category,
                    "excerpt": "Short",
                    "meta_title": "SEO title",
                }),
            )
            .await;
        let id = article["id"].as_i64().unwrap() as i32;

        let res = app
            .patch_with_token(&routes::admin_article(id), &json!({"excerpt": null}), &token)
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["excerpt"].is_null());
        assert_eq!(res.body["meta"]["title"], "SEO title");
    }

    #[tokio::test]
    async fn trashed_article_cannot_be_edited() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let article = app.create_draft(&token, category, "Binned").await;
        let id = article["id"].as_i64().unwrap() as i32;
        app.delete_with_token(&routes::admin_article(id), &token).await;

        let res = app
            .patch_with_token(&routes::admin_article(id), &json!({"title": "Still here"}), &token)
            .await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn missing_article_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app.get_with_token(&routes::admin_article(4242), &token).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn admin_listing_filters_by_status_and_trash() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        app.create_draft(&token, category, "Draft one").await;
        app.create_published(&token, category, "Live one").await;
        let binned = app.create_draft(&token, category, "Binned one").await;
        let binned_id = binned["id"].as_i64().unwrap() as i32;
        app.delete_with_token(&routes::admin_article(binned_id), &token).await;
        app.settle().await;

        let all = app.get_with_token(routes::ADMIN_ARTICLES, &token).await;
        assert_eq!(all.body["pagination"]["total"], 2);

        let drafts = app
            .get_with_token(&format!("{}?status=draft", routes::ADMIN_ARTICLES), &token)
            .await;
        assert_eq!(drafts.body["pagination"]["total"], 1);
        assert_eq!(drafts.body["data"][0]["title"], "Draft one");

        let trashed = app
            .get_with_token(&format!("{}?trashed=only", routes::ADMIN_ARTICLES), &token)
            .await;
        assert_eq!(trashed.body["pagination"]["total"], 1);
        assert_eq!(trashed.body["data"][0]["id"], binned_id);
        assert!(trashed.body["data"][0]["deleted_at"].is_string());

        let with_trash = app
            .get_with_token(&format!("{}?trashed=include", routes::ADMIN_ARTICLES), &token)
            .await;
        assert_eq!(with_trash.body["pagination"]["total"], 3);
    }

    #[tokio::test]
    async fn title_search_is_case_insensitive() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        app.create_draft(&token, category, "Rust Rewrites").await;
        app.create_draft(&token, category, "Go Generics").await;

        let res = app
            .get_with_token(&format!("{}?search=rust", routes::ADMIN_ARTICLES), &token)
            .await;

        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["title"], "Rust Rewrites");
    }

    #[tokio::test]
    async fn unknown_sort_field_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;

        let res = app
            .get_with_token(&format!("{}?sort_by=password", routes::ADMIN_ARTICLES), &token)
            .await;

        assert_eq!(res.status, 422);
    }
}
