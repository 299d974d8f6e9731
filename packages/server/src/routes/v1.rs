use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers::{article, auth, category, dashboard, media, notification, public, tag};
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/home", OpenApiRouter::new().routes(routes!(public::home)))
        .nest("/articles", public_article_routes())
        .nest("/categories", public_category_routes())
        .nest("/search", OpenApiRouter::new().routes(routes!(public::search)))
        .nest("/notifications", notification_routes())
        .nest("/admin", admin_routes(config))
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(auth::register))
        .routes(routes!(auth::login))
        .routes(routes!(auth::me))
}

fn public_article_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(public::list_articles))
        .routes(routes!(public::show_article))
}

fn public_category_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(public::list_categories))
        .routes(routes!(public::category_articles))
}

fn notification_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(notification::list_notifications))
        .routes(routes!(notification::mark_read))
        .routes(routes!(notification::mark_all_read))
}

fn admin_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/articles", admin_article_routes(config))
        .nest("/media", OpenApiRouter::new().routes(routes!(media::delete_media)))
        .nest("/categories", category_routes())
        .nest("/tags", tag_routes())
        .nest("/dashboard", OpenApiRouter::new().routes(routes!(dashboard::dashboard)))
}

fn admin_article_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let crud = OpenApiRouter::new()
        .routes(routes!(article::list_articles, article::create_article))
        .routes(routes!(
            article::get_article,
            article::update_article,
            article::trash_article
        ))
        .routes(routes!(article::publish_article))
        .routes(routes!(article::archive_article))
        .routes(routes!(article::restore_article))
        .routes(routes!(article::force_delete_article));

    let uploads = OpenApiRouter::new()
        .routes(routes!(media::list_media, media::upload_media))
        .layer(media::upload_body_limit(config.storage.max_upload_size));

    crud.merge(uploads)
}

fn category_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(category::list_categories, category::create_category))
        .routes(routes!(category::update_category, category::delete_category))
}

fn tag_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(tag::list_tags, tag::create_tag))
        .routes(routes!(tag::update_tag, tag::delete_tag))
}
