use std::net::SocketAddr;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use fieldforms::config::Config;

pub const ADMIN_USERNAME: &str = "admin";
pub const PASSWORD: &str = "password123";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Register the bootstrap admin.
    pub async fn register(&self, username: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("register request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn login(&self, username: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Register the bootstrap admin, return its token.
    pub async fn bootstrap(&self) -> String {
        let (body, status) = self.register(ADMIN_USERNAME, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "bootstrap register failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Create a user as admin, return the user id.
    pub async fn create_user(&self, admin_token: &str, username: &str, role: &str) -> String {
        let (body, status) = self
            .post_auth(
                "/api/v1/users",
                admin_token,
                &json!({ "username": username, "password": PASSWORD, "role": role }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create user failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Create a project manager and log in as them. Returns (user_id, token).
    pub async fn project_manager(&self, admin_token: &str, username: &str) -> (String, String) {
        let id = self
            .create_user(admin_token, username, "project_manager")
            .await;
        let (body, status) = self.login(username, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "pm login failed: {body}");
        (id, body["token"].as_str().unwrap().to_string())
    }

    /// Create a project, return the project id.
    pub async fn create_project(&self, token: &str, name: &str) -> String {
        let (body, status) = self
            .post_auth("/api/v1/projects", token, &json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::OK, "create project failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn put_schema(&self, token: &str, project_id: &str, schema: &Value) -> (Value, StatusCode) {
        self.put_auth(
            &format!("/api/v1/forms/{project_id}"),
            token,
            &json!({ "schema": schema }),
        )
        .await
    }

    pub async fn assign(
        &self,
        token: &str,
        project_id: &str,
        user_id: &str,
        action: &str,
    ) -> (Value, StatusCode) {
        self.post_auth(
            &format!("/api/v1/projects/{project_id}/assign"),
            token,
            &json!({ "user_id": user_id, "action": action }),
        )
        .await
    }

    pub async fn submit(&self, token: &str, project_id: &str, data: &Value) -> (Value, StatusCode) {
        self.post_auth(
            "/api/v1/entries",
            token,
            &json!({ "project_id": project_id, "data": data }),
        )
        .await
    }

    pub async fn count_entries(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Authenticated GET returning the raw body text.
    pub async fn get_text(&self, path: &str, token: &str) -> (String, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        (resp.text().await.unwrap_or_default(), status)
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

fn database_url_for(base_url: &str, db_name: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.to_string())
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Spawn a test app with a fresh temporary database and a tweaked config.
pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let db_name = format!("fieldforms_test_{}", Uuid::now_v7().to_string().replace('-', ""));

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url_for(&base_url, "postgres"))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = database_url_for(&base_url, &db_name);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let mut config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        token_ttl_hours: 1,
        max_body_size: 1_048_576,
        trusted_proxies: vec![],
        cors_origins: vec![],
        admin_entry_override: false,
        log_level: "warn".to_string(),
    };
    configure(&mut config);

    let (app, _state) = fieldforms::build_app(pool.clone(), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    TestApp {
        addr,
        pool,
        client: Client::new(),
        db_name,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url_for(&base_url, "postgres"))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
