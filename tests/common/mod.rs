#![allow(dead_code)]

use actix_web::web;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;

use session_auth::auth::{AuthService, TokenIssuer};
use session_auth::configuration::{JwtSettings, SecuritySettings};
use session_auth::startup::run;
use session_auth::store::{InMemorySessionStore, InMemoryUserStore, Role};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

/// Start the server on a random port backed by in-memory stores, with one
/// seeded admin account.
pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let jwt = JwtSettings {
        access_secret: Some("integration-access-secret".to_string()),
        refresh_secret: Some("integration-refresh-secret".to_string()),
        access_token_ttl: "15m".to_string(),
        refresh_token_ttl: "7d".to_string(),
        issuer: "session_auth".to_string(),
    };
    let issuer = Arc::new(TokenIssuer::from_settings(&jwt).expect("Invalid JWT settings"));

    let security = SecuritySettings {
        password_hash_cost: 4,
        session_hash_cost: 4,
    };
    let auth = AuthService::new(
        issuer,
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemorySessionStore::new()),
        &security,
    );
    auth.register_user(ADMIN_USERNAME, "admin@example.com", ADMIN_PASSWORD, Role::Admin)
        .await
        .expect("Failed to seed admin");

    let server = run(listener, web::Data::new(auth)).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub async fn post_login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/v1/auth/login", self.address))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/v1/auth/refresh", self.address))
            .bearer_auth(refresh_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_logout(&self, access_token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/v1/auth/logout", self.address))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_profile(&self, access_token: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}/api/v1/auth/profile", self.address))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Log in as the seeded admin and return the `data` object.
    pub async fn login_admin(&self) -> Value {
        let response = self.post_login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
        assert_eq!(201, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response");
        body["data"].clone()
    }
}
