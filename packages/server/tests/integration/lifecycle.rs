use ::common::ArticleStatus;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use server::content::service::ArticleService;
use server::entity::publication_event;
use server::error::AppError;

use crate::common::{TestApp, routes};

fn id_of(article: &serde_json::Value) -> i32 {
    article["id"].as_i64().unwrap() as i32
}

mod transitions {
    use super::*;

    #[tokio::test]
    async fn publish_stamps_published_at_and_makes_article_public() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let draft = app.create_draft(&token, category, "Going Live").await;

        let hidden = app.get_without_token(&routes::article("going-live")).await;
        assert_eq!(hidden.status, 404);

        let res = app.post_with_token(&routes::publish(id_of(&draft)), &json!({}), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "published");
        assert!(res.body["published_at"].is_string());

        let public = app.get_without_token(&routes::article("going-live")).await;
        assert_eq!(public.status, 200);
    }

    #[tokio::test]
    async fn a_transition_read_from_a_stale_status_is_refused() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let draft = app.create_draft(&token, category, "Contested").await;
        let id = id_of(&draft);
        let service = ArticleService::new(&app.db);

        service
            .claim_transition(id, ArticleStatus::Draft, ArticleStatus::Published)
            .await
            .unwrap();
        let second = service
            .claim_transition(id, ArticleStatus::Draft, ArticleStatus::Published)
            .await;

        assert!(matches!(second, Err(AppError::Conflict(_))));
        let current = service.find(id).await.unwrap();
        assert_eq!(current.status, ArticleStatus::Published);
    }

    #[tokio::test]
    async fn publishing_twice_records_a_single_publication_event() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let draft = app.create_draft(&token, category, "Once Only").await;
        let id = id_of(&draft);

        let first = app.post_with_token(&routes::publish(id), &json!({}), &token).await;
        let second = app.post_with_token(&routes::publish(id), &json!({}), &token).await;
        app.settle().await;

        assert_eq!(first.status, 200, "{}", first.text);
        assert_eq!(second.status, 200, "{}", second.text);
        let events = publication_event::Entity::find()
            .filter(publication_event::Column::ArticleId.eq(id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(events, 1);
    }

    #[tokio::test]
    async fn republishing_keeps_the_original_publication_date() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let article = app.create_published(&token, category, "Evergreen").await;
        let id = id_of(&article);
        let first_published = article["published_at"].clone();

        let archived = app.post_with_token(&routes::archive(id), &json!({}), &token).await;
        assert_eq!(archived.status, 200);
        assert_eq!(archived.body["status"], "archived");
        assert_eq!(
            app.get_without_token(&routes::article("evergreen")).await.status,
            404
        );

        let again = app.post_with_token(&routes::publish(id), &json!({}), &token).await;
        assert_eq!(again.status, 200);
        assert_eq!(again.body["published_at"], first_published);
    }

    #[tokio::test]
    async fn draft_cannot_be_archived_directly() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let draft = app.create_draft(&token, category, "Fresh").await;

        let res = app.post_with_token(&routes::archive(id_of(&draft)), &json!({}), &token).await;

        assert_eq!(res.status, 422);
        assert!(res.body["fields"]["status"].is_array());
    }

    #[tokio::test]
    async fn published_article_cannot_return_to_draft() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let article = app.create_published(&token, category, "One Way").await;

        let res = app
            .patch_with_token(
                &routes::admin_article(id_of(&article)),
                &json!({"status": "draft"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 422);
    }

    #[tokio::test]
    async fn future_publication_date_hides_article_until_then() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        app.create_article(
            &token,
            json!({
                "title": "Scheduled",
                "category_id": category,
                "status": "published",
                "published_at": "2999-01-01T00:00:00Z",
            }),
        )
        .await;

        let res = app.get_without_token(&routes::article("scheduled")).await;
        assert_eq!(res.status, 404);

        let listing = app.get_without_token(routes::ARTICLES).await;
        assert_eq!(listing.body["pagination"]["total"], 0);

        let by_category = app.get_without_token(&routes::category_articles("tech")).await;
        assert_eq!(by_category.body["pagination"]["total"], 0);

        let found = app.get_without_token(&routes::search("scheduled")).await;
        assert_eq!(found.body["total"], 0);
    }
}

mod trash {
    use super::*;

    #[tokio::test]
    async fn trashing_hides_and_restoring_brings_back_with_views() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let article = app.create_published(&token, category, "Comeback").await;
        let id = id_of(&article);

        app.get_without_token(&routes::article("comeback")).await;
        app.get_without_token(&routes::article("comeback")).await;

        let res = app.delete_with_token(&routes::admin_article(id), &token).await;
        assert_eq!(res.status, 204);
        assert_eq!(app.get_without_token(&routes::article("comeback")).await.status, 404);

        let again = app.delete_with_token(&routes::admin_article(id), &token).await;
        assert_eq!(again.status, 409);

        let restored = app.post_with_token(&routes::restore(id), &json!({}), &token).await;
        assert_eq!(restored.status, 200);
        assert_eq!(restored.body["slug"], "comeback");
        assert_eq!(restored.body["views"], 2);

        let public = app.get_without_token(&routes::article("comeback")).await;
        assert_eq!(public.status, 200);
    }

    #[tokio::test]
    async fn editor_cannot_trash() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let editor = app
            .create_user_with_role("editor@example.com", "password123", "editor")
            .await;
        let category = app.create_category(&admin, "Tech").await;
        let article = app.create_draft(&editor, category, "Mine").await;

        let res = app.delete_with_token(&routes::admin_article(id_of(&article)), &editor).await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn force_delete_requires_the_trash_first() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let article = app.create_draft(&token, category, "Doomed").await;
        let id = id_of(&article);

        let early = app.delete_with_token(&routes::force_delete(id), &token).await;
        assert_eq!(early.status, 409);

        app.delete_with_token(&routes::admin_article(id), &token).await;
        let res = app.delete_with_token(&routes::force_delete(id), &token).await;
        assert_eq!(res.status, 204);

        let gone = app.get_with_token(&routes::admin_article(id), &token).await;
        assert_eq!(gone.status, 404);
    }

    #[tokio::test]
    async fn force_deleted_slug_becomes_free_again() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let article = app.create_draft(&token, category, "Recycled").await;
        let id = id_of(&article);
        app.delete_with_token(&routes::admin_article(id), &token).await;
        app.delete_with_token(&routes::force_delete(id), &token).await;

        let fresh = app.create_draft(&token, category, "Recycled").await;

        assert_eq!(fresh["slug"], "recycled");
    }
}
