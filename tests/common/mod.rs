// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use comments_api::{
    config::Config, db, routes, state::AppState, utils::clock::ManualClock,
};
use serde_json::{Value, json};
use sqlx::SqlitePool;

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub clock: ManualClock,
    pub pool: SqlitePool,
}

/// Spawns the app on a random port against a fresh in-memory database.
/// The returned clock drives every timestamp the server writes.
pub async fn spawn_app() -> TestApp {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to open in-memory SQLite");

    db::migrate(&pool).await.expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        port: 0,
        rust_log: "error".to_string(),
        db_max_connections: 1,
    };

    let clock = ManualClock::new(Utc::now());
    let state = AppState::with_clock(pool.clone(), config, Arc::new(clock.clone()));
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
        clock,
        pool,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/register"))
            .json(&json!({
                "username": username,
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Registers `username` (email `<username>@example.com`) and returns a bearer token.
    pub async fn sign_up(&self, username: &str) -> String {
        let email = format!("{username}@example.com");
        let resp = self.register(username, &email, "password123").await;
        assert_eq!(resp.status().as_u16(), 201, "register {username}");

        let body: Value = self
            .login(&email, "password123")
            .await
            .json()
            .await
            .expect("Failed to parse login json");

        body["accessToken"]
            .as_str()
            .expect("Token not found")
            .to_string()
    }

    pub async fn post_comment(
        &self,
        token: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> reqwest::Response {
        let mut body = json!({ "content": content });
        if let Some(pid) = parent_id {
            body["parentId"] = json!(pid);
        }
        self.client
            .post(self.url("/comments"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Posts a comment and returns its id, asserting 201.
    pub async fn comment_id(&self, token: &str, content: &str, parent_id: Option<&str>) -> String {
        let resp = self.post_comment(token, content, parent_id).await;
        assert_eq!(resp.status().as_u16(), 201);
        let body: Value = resp.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn edit_comment(&self, token: &str, id: &str, content: &str) -> reqwest::Response {
        self.client
            .patch(self.url(&format!("/comments/{id}")))
            .bearer_auth(token)
            .json(&json!({ "content": content }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete_comment(&self, token: &str, id: &str) -> reqwest::Response {
        self.client
            .delete(self.url(&format!("/comments/{id}")))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn restore_comment(&self, token: &str, id: &str) -> reqwest::Response {
        self.client
            .patch(self.url(&format!("/comments/{id}/restore")))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_comment(&self, id: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/comments/{id}")))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn list_comments(&self) -> Vec<Value> {
        let resp = self
            .client
            .get(self.url("/comments"))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(resp.status().as_u16(), 200);
        resp.json().await.unwrap()
    }
}
