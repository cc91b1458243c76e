#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use blog::auth::Accounts;
use blog::auth::session::{SESSION_COOKIE, hash_password};
use blog::blog::{Blog, NewPost};
use blog::db::Database;
use blog::handler::AppState;

pub const DEFAULT_PASSWORD: &str = "senha123";

// ---------------------------------------------------------------------------
// TestApp: one in-memory database per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body_bytes: Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).into_owned()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }

    /// Token from a `Set-Cookie: session=...` header, if one was sent.
    pub fn session_token(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find_map(|pair| pair.strip_prefix(&format!("{SESSION_COOKIE}=")).map(str::to_owned))
    }
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub session: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Arc::new(Database::in_memory().await.expect("in-memory database"));
        let state = AppState::new(db, 24);
        Self {
            router: blog::app(state.clone()),
            state,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = session {
            builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)], session: Option<&str>) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(token) = session {
            builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Registers a user straight in the store and opens a session for them.
    pub async fn create_user(&self, username: &str) -> TestUser {
        let accounts = Accounts::new(self.db());
        let hash = hash_password(DEFAULT_PASSWORD).unwrap();
        let user = accounts.create_user(username, &hash).await.unwrap().unwrap();
        let session = accounts.create_session(user.id, 1).await.unwrap();

        TestUser {
            id: user.id,
            username: user.username,
            session,
        }
    }

    pub async fn create_post(&self, author: &TestUser, title: &str) -> i64 {
        Blog::new(self.db())
            .create_post(
                author.id,
                NewPost {
                    title: title.to_string(),
                    body: "test\nbody".to_string(),
                },
            )
            .await
            .unwrap()
    }
}
