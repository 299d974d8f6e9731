use serde_json::json;

use crate::common::{TestApp, routes};

mod reading {
    use super::*;

    #[tokio::test]
    async fn home_lists_featured_latest_and_active_categories() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let tech = app.create_category(&token, "Tech").await;
        let hidden = app.create_category(&token, "Hidden").await;
        app.patch_with_token(&routes::admin_category(hidden), &json!({"is_active": false}), &token)
            .await;

        app.create_article(
            &token,
            json!({"title": "Headline", "category_id": tech, "status": "published", "is_featured": true}),
        )
        .await;
        app.create_published(&token, tech, "Ordinary").await;
        app.create_draft(&token, tech, "Unfinished").await;
        app.settle().await;

        let res = app.get_without_token(routes::HOME).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let featured = res.body["featured"].as_array().unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0]["title"], "Headline");
        assert_eq!(res.body["latest"].as_array().unwrap().len(), 2);
        let categories: Vec<&str> = res.body["categories"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(categories, ["Tech"]);
    }

    #[tokio::test]
    async fn public_listing_paginates_newest_first() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        for i in 0..3 {
            app.create_article(
                &token,
                json!({
                    "title": format!("Story {i}"),
                    "category_id": category,
                    "status": "published",
                    "published_at": format!("2024-01-0{}T00:00:00Z", i + 1),
                }),
            )
            .await;
        }
        app.settle().await;

        let res = app
            .get_without_token(&format!("{}?per_page=2&page=1", routes::ARTICLES))
            .await;

        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["total_pages"], 2);
        assert_eq!(res.body["data"][0]["title"], "Story 2");
        assert_eq!(res.body["data"][1]["title"], "Story 1");
        assert!(res.body["data"][0].get("content").is_none());
    }

    #[tokio::test]
    async fn pages_past_the_end_are_empty_even_when_huge() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        app.create_published(&token, category, "Quantum leap").await;
        app.settle().await;

        let huge = u64::MAX;
        for path in [
            format!("{}?page={huge}&per_page=100", routes::ARTICLES),
            format!("{}?page={huge}", routes::category_articles("tech")),
            format!("{}&page={huge}&per_page=100", routes::search("quantum")),
            format!("{}?page=100000000000000000", routes::ARTICLES),
        ] {
            let res = app.get_without_token(&path).await;

            assert_eq!(res.status, 200, "{path}: {}", res.text);
            assert_eq!(res.body["data"], json!([]), "{path}");
            assert_eq!(res.body["pagination"]["total"], 1, "{path}");
        }
    }

    #[tokio::test]
    async fn article_page_includes_related_from_same_category() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let tech = app.create_category(&token, "Tech").await;
        let sport = app.create_category(&token, "Sport").await;
        app.create_published(&token, tech, "Main").await;
        app.create_published(&token, tech, "Sibling").await;
        app.create_published(&token, sport, "Stranger").await;
        app.settle().await;

        let res = app.get_without_token(&routes::article("main")).await;

        assert_eq!(res.status, 200);
        let related: Vec<&str> = res.body["related"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["title"].as_str().unwrap())
            .collect();
        assert_eq!(related, ["Sibling"]);
        assert!(res.body["content"].is_string());
    }

    #[tokio::test]
    async fn category_page_lists_its_articles_and_hides_inactive_categories() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let tech = app.create_category(&token, "Tech").await;
        app.create_published(&token, tech, "In Tech").await;
        app.settle().await;

        let res = app.get_without_token(&routes::category_articles("tech")).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["category"]["slug"], "tech");
        assert_eq!(res.body["data"][0]["title"], "In Tech");

        app.patch_with_token(&routes::admin_category(tech), &json!({"is_active": false}), &token)
            .await;
        let hidden = app.get_without_token(&routes::category_articles("tech")).await;
        assert_eq!(hidden.status, 404);

        let unknown = app.get_without_token(&routes::category_articles("nope")).await;
        assert_eq!(unknown.status, 404);
    }
}

mod views {
    use super::*;

    #[tokio::test]
    async fn every_read_counts_exactly_once_under_concurrency() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        let article = app.create_published(&token, category, "Popular").await;
        let id = article["id"].as_i64().unwrap() as i32;
        app.settle().await;

        let url = app.url(&routes::article("popular"));
        let reads = (0..100).map(|_| {
            let client = app.client.clone();
            let url = url.clone();
            tokio::spawn(async move { client.get(url).send().await.unwrap().status().as_u16() })
        });
        for read in reads.collect::<Vec<_>>() {
            assert_eq!(read.await.unwrap(), 200);
        }

        let res = app.get_with_token(&routes::admin_article(id), &token).await;
        assert_eq!(res.body["views"], 100);
    }

    #[tokio::test]
    async fn response_reflects_the_view_just_recorded() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        app.create_published(&token, category, "Counted").await;
        app.settle().await;

        let first = app.get_without_token(&routes::article("counted")).await;
        let second = app.get_without_token(&routes::article("counted")).await;

        assert_eq!(first.body["views"], 1);
        assert_eq!(second.body["views"], 2);
    }
}

mod sitemap {
    use super::*;

    #[tokio::test]
    async fn sitemap_lists_home_categories_and_public_articles_only() {
        let app = TestApp::spawn().await;
        let token = app.admin_token().await;
        let category = app.create_category(&token, "Tech").await;
        app.create_published(&token, category, "Visible").await;
        app.create_draft(&token, category, "Invisible").await;
        app.settle().await;

        let res = app.get_without_token(routes::SITEMAP).await;

        assert_eq!(res.status, 200);
        assert!(res.content_type.as_deref().is_some_and(|c| c.starts_with("application/xml")));
        assert!(res.text.starts_with("<?xml"));
        assert!(res.text.contains("<loc>https://news.example.com/</loc>"));
        assert!(res.text.contains("<loc>https://news.example.com/category/tech</loc>"));
        assert!(res.text.contains("<loc>https://news.example.com/article/visible</loc>"));
        assert!(!res.text.contains("invisible"));
        assert_eq!(res.text.matches("<url>").count(), 3);
        assert_eq!(res.text.matches("<lastmod>").count(), 3);
    }
}
