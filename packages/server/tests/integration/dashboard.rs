use chrono::{Datelike, Duration, Utc};
use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn dashboard_reports_totals_trend_and_rankings() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.insert_user("reader@example.com", "password123", "subscriber").await;
    let category = app.create_category(&token, "Tech").await;
    app.create_tag(&token, "Rust").await;

    app.create_draft(&token, category, "Draft").await;
    app.create_published(&token, category, "Quiet").await;
    app.create_published(&token, category, "Popular").await;
    let binned = app.create_draft(&token, category, "Binned").await;
    let binned_id = binned["id"].as_i64().unwrap() as i32;
    app.delete_with_token(&routes::admin_article(binned_id), &token).await;
    app.settle().await;

    for _ in 0..3 {
        app.get_without_token(&routes::article("popular")).await;
    }
    app.get_without_token(&routes::article("quiet")).await;

    let res = app.get_with_token(routes::DASHBOARD, &token).await;

    assert_eq!(res.status, 200, "{}", res.text);
    let totals = &res.body["totals"];
    assert_eq!(totals["articles"], 3);
    assert_eq!(totals["published"], 2);
    assert_eq!(totals["drafts"], 1);
    assert_eq!(totals["archived"], 0);
    assert_eq!(totals["trashed"], 1);
    assert_eq!(totals["views"], 4);
    assert_eq!(totals["categories"], 1);
    assert_eq!(totals["tags"], 1);
    assert_eq!(totals["users"], 2);

    assert_eq!(res.body["trend"]["this_month"], 2);
    assert_eq!(res.body["trend"]["last_month"], 0);
    assert!(res.body["trend"]["change_percent"].is_null());

    let months = res.body["published_per_month"].as_array().unwrap();
    assert_eq!(months.len(), 12);
    assert_eq!(months[11]["published"], 2);

    assert_eq!(res.body["most_viewed"][0]["title"], "Popular");
    assert_eq!(res.body["latest"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn dashboard_counts_last_month_publications() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    let category = app.create_category(&token, "Tech").await;

    let now = Utc::now();
    let last_month = now - Duration::days(i64::from(now.day()) + 1);
    app.create_article(
        &token,
        json!({
            "title": "Older",
            "category_id": category,
            "status": "published",
            "published_at": last_month.to_rfc3339(),
        }),
    )
    .await;
    app.create_published(&token, category, "Newer").await;
    app.create_published(&token, category, "Newest").await;
    app.settle().await;

    let res = app.get_with_token(routes::DASHBOARD, &token).await;

    assert_eq!(res.body["trend"]["this_month"], 2);
    assert_eq!(res.body["trend"]["last_month"], 1);
    assert_eq!(res.body["trend"]["change_percent"], 100.0);
}

#[tokio::test]
async fn subscribers_cannot_view_dashboard() {
    let app = TestApp::spawn().await;
    let reader = app
        .create_user_with_role("reader@example.com", "password123", "subscriber")
        .await;

    let res = app.get_with_token(routes::DASHBOARD, &reader).await;

    assert_eq!(res.status, 403);
}
