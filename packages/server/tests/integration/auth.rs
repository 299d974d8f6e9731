use serde_json::json;

use crate::common::{TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_can_register_with_valid_credentials() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"name": "Alice", "email": "alice@example.com", "password": "securepass"}),
            )
            .await;

        assert_eq!(res.status, 201);
        assert!(res.body["id"].is_number());
        assert_eq!(res.body["email"], "alice@example.com");
        assert!(res.body.get("password").is_none());
    }

    #[tokio::test]
    async fn cannot_register_with_an_already_taken_email() {
        let app = TestApp::spawn().await;
        let body = json!({"name": "Alice", "email": "alice@example.com", "password": "securepass"});

        let first = app.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(first.status, 201, "First registration failed: {}", first.text);

        let again = json!({"name": "Alice", "email": "ALICE@example.com", "password": "securepass"});
        let res = app.post_without_token(routes::REGISTER, &again).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn invalid_fields_are_reported_together() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({"name": "", "email": "not-an-email", "password": "short"}),
            )
            .await;

        assert_eq!(res.status, 422);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(res.body["fields"]["email"].is_array());
        assert!(res.body["fields"]["password"].is_array());
    }

    #[tokio::test]
    async fn registered_users_start_without_authoring_permissions() {
        let app = TestApp::spawn().await;
        app.post_without_token(
            routes::REGISTER,
            &json!({"name": "Reader", "email": "reader@example.com", "password": "securepass"}),
        )
        .await;
        let token = app.login("reader@example.com", "securepass").await;

        let me = app.get_with_token(routes::ME, &token).await;
        assert_eq!(me.status, 200);
        assert_eq!(me.body["role"], "subscriber");
        assert_eq!(me.body["permissions"], json!([]));

        let res = app
            .post_with_token(
                routes::ADMIN_ARTICLES,
                &json!({"title": "Nope", "content": "x", "category_id": 1}),
                &token,
            )
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn login_returns_token_role_and_permissions() {
        let app = TestApp::spawn().await;
        app.insert_user("editor@example.com", "password123", "editor").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "editor@example.com", "password": "password123"}),
            )
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(res.body["role"], "editor");
        let permissions: Vec<&str> = res.body["permissions"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p.as_str())
            .collect();
        assert!(permissions.contains(&"article:publish"));
        assert!(!permissions.contains(&"article:delete"));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let app = TestApp::spawn().await;
        app.insert_user("a@example.com", "password123", "subscriber").await;

        let wrong = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "a@example.com", "password": "wrongpass"}),
            )
            .await;
        let unknown = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "nobody@example.com", "password": "password123"}),
            )
            .await;

        assert_eq!(wrong.status, 401);
        assert_eq!(unknown.status, 401);
        assert_eq!(wrong.body["code"], "INVALID_CREDENTIALS");
        assert_eq!(wrong.body["message"], unknown.body["message"]);
    }
}

mod tokens {
    use super::*;

    #[tokio::test]
    async fn me_requires_a_token() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::ME, "not.a.jwt").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}
