#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use snapfeed::{ServerConfig, create_app, db::Database, jwt::JwtConfig};
use tower::ServiceExt;

pub const JWT_SECRET: &[u8] = b"test-jwt-secret-at-least-32-bytes-long";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

pub fn test_config(db: Database) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: JWT_SECRET.to_vec(),
        secure_cookies: false,
        api_base_url: None,
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let app = create_app(&test_config(db.clone())).expect("Failed to create app");
        Self {
            app,
            db,
            jwt: JwtConfig::new(JWT_SECRET),
        }
    }

    /// Insert a user directly and return (user_id, access_token).
    /// The stored hash is not a real password hash; use the register endpoint
    /// when a test needs to log in with a password.
    pub async fn user(&self, username: &str) -> (i64, String) {
        let id = self
            .db
            .users()
            .create(username, &format!("{}@example.com", username), "unusable")
            .await
            .unwrap();
        let access = self.jwt.generate_access_token(id, username).unwrap();
        (id, access.token)
    }

    /// Send a request through the router and return the status and JSON body
    /// (`Null` for an empty body).
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("DELETE", uri, token, None).await
    }

    /// Register through the API and return the new user's id.
    pub async fn register(&self, username: &str, password: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/register",
                None,
                serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": password,
                    "password2": password,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body["id"].as_i64().unwrap()
    }

    /// Log in through the API and return (access, refresh).
    pub async fn login(&self, username: &str, password: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/token",
                None,
                serde_json::json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        (
            body["access"].as_str().unwrap().to_string(),
            body["refresh"].as_str().unwrap().to_string(),
        )
    }

    pub async fn create_post(&self, token: &str, caption: &str) -> i64 {
        let (status, body) = self
            .post("/api/posts", Some(token), serde_json::json!({ "caption": caption }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create post failed: {}", body);
        body["id"].as_i64().unwrap()
    }
}
