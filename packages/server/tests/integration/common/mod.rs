use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use common::storage::filesystem::FilesystemMediaStore;
use reqwest::Client;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::{Value, json};
use tempfile::TempDir;

use server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, MailBackend, MailConfig, MqAppConfig,
    OutboxConfig, ServerConfig, SiteConfig, SmtpConfig, StorageConfig,
};
use server::entity::user;
use server::notifications::{InProcessNotifier, MemoryMailer, PublicationDelivery};
use server::state::AppState;
use server::utils::hash::hash_password;

/// Upload limit used by every test server.
pub const MAX_UPLOAD: u64 = 64 * 1024;

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const ME: &str = "/api/v1/auth/me";

    pub const HOME: &str = "/api/v1/home";
    pub const ARTICLES: &str = "/api/v1/articles";
    pub const CATEGORIES: &str = "/api/v1/categories";
    pub const SEARCH: &str = "/api/v1/search";
    pub const NOTIFICATIONS: &str = "/api/v1/notifications";
    pub const NOTIFICATIONS_READ_ALL: &str = "/api/v1/notifications/read-all";
    pub const SITEMAP: &str = "/sitemap.xml";

    pub const ADMIN_ARTICLES: &str = "/api/v1/admin/articles";
    pub const ADMIN_CATEGORIES: &str = "/api/v1/admin/categories";
    pub const ADMIN_TAGS: &str = "/api/v1/admin/tags";
    pub const DASHBOARD: &str = "/api/v1/admin/dashboard";

    pub fn article(slug: &str) -> String {
        format!("/api/v1/articles/{slug}")
    }

    pub fn category_articles(slug: &str) -> String {
        format!("/api/v1/categories/{slug}/articles")
    }

    pub fn search(q: &str) -> String {
        format!("/api/v1/search?q={}", urlencode(q))
    }

    pub fn notification_read(id: &str) -> String {
        format!("/api/v1/notifications/{id}/read")
    }

    pub fn admin_article(id: i32) -> String {
        format!("/api/v1/admin/articles/{id}")
    }

    pub fn publish(id: i32) -> String {
        format!("/api/v1/admin/articles/{id}/publish")
    }

    pub fn archive(id: i32) -> String {
        format!("/api/v1/admin/articles/{id}/archive")
    }

    pub fn restore(id: i32) -> String {
        format!("/api/v1/admin/articles/{id}/restore")
    }

    pub fn force_delete(id: i32) -> String {
        format!("/api/v1/admin/articles/{id}/force")
    }

    pub fn article_media(id: i32) -> String {
        format!("/api/v1/admin/articles/{id}/media")
    }

    pub fn media(id: &str) -> String {
        format!("/api/v1/admin/media/{id}")
    }

    pub fn admin_category(id: i32) -> String {
        format!("/api/v1/admin/categories/{id}")
    }

    pub fn admin_tag(id: i32) -> String {
        format!("/api/v1/admin/tags/{id}")
    }

    fn urlencode(s: &str) -> String {
        s.bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                    (b as char).to_string()
                }
                _ => format!("%{b:02X}"),
            })
            .collect()
    }
}

/// A running test server backed by a throwaway SQLite file.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub mailer: Arc<MemoryMailer>,
    pub notifier: Arc<InProcessNotifier>,
    pub config: AppConfig,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
    pub content_type: Option<String>,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let content_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = res.text().await.expect("Failed to read response body");
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            text,
            body,
            content_type,
        }
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

        let mut opts = ConnectOptions::new(&db_url);
        opts.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("Failed to open test database");
        server::database::sync_schema(&db)
            .await
            .expect("Failed to sync schema");
        server::seed::seed_role_permissions(&db)
            .await
            .expect("Failed to seed roles");

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig { url: db_url },
            auth: AuthConfig {
                jwt_secret: "test-secret-for-integration-tests".to_string(),
            },
            site: SiteConfig {
                name: "Beacon Test".to_string(),
                base_url: "https://news.example.com".to_string(),
            },
            storage: StorageConfig {
                media_dir: dir.path().join("media"),
                public_url: "/media".to_string(),
                max_upload_size: MAX_UPLOAD,
            },
            mail: MailConfig {
                backend: MailBackend::Log,
                from: "Beacon <noreply@example.com>".to_string(),
                smtp: SmtpConfig {
                    host: "localhost".to_string(),
                    port: 25,
                    username: None,
                    password: None,
                },
            },
            mq: MqAppConfig::default(),
            outbox: OutboxConfig {
                sweep_interval_secs: 60,
                redeliver_after_secs: 300,
            },
            admin: None,
        };

        let media = Arc::new(
            FilesystemMediaStore::new(
                config.storage.media_dir.clone(),
                config.storage.public_url.clone(),
                config.storage.max_upload_size,
            )
            .await
            .expect("Failed to create media store"),
        );

        let mailer = Arc::new(MemoryMailer::new());
        let delivery = Arc::new(PublicationDelivery::new(
            db.clone(),
            mailer.clone(),
            config.site.clone(),
        ));
        let notifier = Arc::new(InProcessNotifier::new(delivery));

        let state = AppState {
            db: db.clone(),
            config: config.clone(),
            media,
            notifier: notifier.clone(),
        };
        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            mailer,
            notifier,
            config,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Let every in-process publication delivery finish.
    pub async fn settle(&self) {
        self.notifier.wait_idle().await;
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn upload_with_token(
        &self,
        path: &str,
        file_name: &str,
        mime: &str,
        file_bytes: Vec<u8>,
        collection: Option<&str>,
        token: &str,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .expect("Failed to set MIME type");
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(collection) = collection {
            form = form.text("collection", collection.to_string());
        }

        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart request");

        TestResponse::from_response(res).await
    }

    /// Insert a user with `role` directly and return a login token.
    pub async fn create_user_with_role(&self, email: &str, password: &str, role: &str) -> String {
        self.insert_user(email, password, role).await;
        self.login(email, password).await
    }

    pub async fn insert_user(&self, email: &str, password: &str, role: &str) -> i32 {
        let name = email.split('@').next().unwrap_or(email).to_string();
        let user = user::ActiveModel {
            name: Set(name),
            email: Set(email.to_string()),
            password: Set(hash_password(password).expect("Failed to hash password")),
            role: Set(role.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .expect("Failed to insert user");
        user.id
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let res = self
            .post_without_token(
                routes::LOGIN,
                &json!({"email": email, "password": password}),
            )
            .await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);
        res.body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.create_user_with_role("admin@example.com", "password123", "admin")
            .await
    }

    pub async fn create_category(&self, token: &str, name: &str) -> i32 {
        let res = self
            .post_with_token(routes::ADMIN_CATEGORIES, &json!({"name": name}), token)
            .await;
        assert_eq!(res.status, 201, "Create category failed: {}", res.text);
        res.body["id"].as_i64().unwrap() as i32
    }

    pub async fn create_tag(&self, token: &str, name: &str) -> i32 {
        let res = self
            .post_with_token(routes::ADMIN_TAGS, &json!({"name": name}), token)
            .await;
        assert_eq!(res.status, 201, "Create tag failed: {}", res.text);
        res.body["id"].as_i64().unwrap() as i32
    }

    /// Create an article from a JSON body, filling `content` when absent.
    pub async fn create_article(&self, token: &str, mut body: Value) -> Value {
        if body.get("content").is_none() {
            body["content"] = json!("<p>Body text.</p>");
        }
        let res = self.post_with_token(routes::ADMIN_ARTICLES, &body, token).await;
        assert_eq!(res.status, 201, "Create article failed: {}", res.text);
        res.body
    }

    pub async fn create_draft(&self, token: &str, category_id: i32, title: &str) -> Value {
        self.create_article(token, json!({"title": title, "category_id": category_id}))
            .await
    }

    pub async fn create_published(&self, token: &str, category_id: i32, title: &str) -> Value {
        self.create_article(
            token,
            json!({"title": title, "category_id": category_id, "status": "published"}),
        )
        .await
    }
}
