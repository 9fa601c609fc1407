//! Test Harness Module
//!
//! In-memory application state for integration tests:
//! - `MemoryStore` behind every repository
//! - recording and failing mailers
//! - fake object storage that signs with predictable URLs
//! - helpers for members, tokens and router calls

#![allow(dead_code)]

mod memory;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;

use digital_house_api::config::Config;
use digital_house_api::error::{AppError, Result};
use digital_house_api::middleware::AppLifecycle;
use digital_house_api::models::{NewUser, User, UserStatus};
use digital_house_api::repository::Repositories;
use digital_house_api::security::{jwt, password};
use digital_house_api::services::{Mailer, ObjectStorage, OutgoingMail};
use digital_house_api::{build_router, AppState};

pub use memory::MemoryStore;

pub const ADMIN_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
pub const ADMIN_EMAIL: &str = "ops@digitalhouse.test";
pub const ADMIN_PASSWORD: &str = "correct horse battery";

/// Keeps every mail it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().await.clone()
    }

    /// Code from the most recent OTP mail to `email`.
    pub async fn last_code_for(&self, email: &str) -> Option<String> {
        let sent = self.sent.lock().await;
        sent.iter()
            .rev()
            .filter(|m| m.to == email)
            .find_map(|m| {
                let rest = m.body.split("code is ").nth(1)?;
                Some(rest.chars().take(6).collect())
            })
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        self.sent.lock().await.push(mail);
        Ok(())
    }
}

/// SMTP that is always down.
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _mail: OutgoingMail) -> Result<()> {
        Err(AppError::ServiceUnavailable("smtp unreachable".to_string()))
    }
}

pub struct FakeStorage;

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn presign_put(&self, key: &str, _content_type: &str) -> Result<String> {
        Ok(format!("https://upload.test/{key}?sig=put"))
    }

    async fn presign_get(&self, key: &str) -> Result<String> {
        Ok(format!("https://signed.test/{key}?sig=get"))
    }

    fn public_base_url(&self) -> &str {
        "https://cdn.test"
    }

    fn key_prefix(&self) -> &str {
        "digital-house"
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
}

static NEXT_MOBILE: AtomicU64 = AtomicU64::new(1);
static ADMIN_HASH: OnceLock<String> = OnceLock::new();

fn test_config() -> Config {
    let mut config = Config::defaults().expect("default config");
    config.jwt.secret = "integration-secret".to_string();
    config.admin.api_key = ADMIN_KEY.to_string();
    config.admin.emails = ADMIN_EMAIL.to_string();
    config.admin.password_hash = ADMIN_HASH
        .get_or_init(|| password::hash_password(ADMIN_PASSWORD).expect("hash admin password"))
        .clone();
    config.otp.hash_pepper = "integration-pepper".to_string();
    config
}

impl TestApp {
    /// Ready application with a recording mailer.
    pub fn new() -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        Self::build(mailer.clone(), mailer, AppLifecycle::ready())
    }

    pub fn with_mailer(mailer: Arc<dyn Mailer>) -> Self {
        Self::build(mailer, Arc::new(RecordingMailer::default()), AppLifecycle::ready())
    }

    pub fn starting() -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        Self::build(mailer.clone(), mailer, AppLifecycle::starting())
    }

    fn build(mailer: Arc<dyn Mailer>, recorder: Arc<RecordingMailer>, lifecycle: AppLifecycle) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState {
            config: Arc::new(test_config()),
            repos: Repositories::from_store(store.clone()),
            mailer,
            storage: Arc::new(FakeStorage),
            lifecycle,
        };
        Self {
            state,
            store,
            mailer: recorder,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn pending_member(&self, name: &str, email: &str, community: Option<&str>) -> User {
        let mobile = format!("9{:09}", NEXT_MOBILE.fetch_add(1, Ordering::Relaxed));
        self.state
            .repos
            .users
            .create(&NewUser {
                full_name: name.to_string(),
                email: email.to_string(),
                mobile: Some(mobile),
                location: Some("Salem".to_string()),
                kulam: Some("Other".to_string()),
                community: community.map(str::to_string),
                ..Default::default()
            })
            .await
            .expect("create member")
    }

    pub async fn approved_member(&self, name: &str, email: &str, community: Option<&str>) -> User {
        let user = self.pending_member(name, email, community).await;
        self.store.set_status(user.id, UserStatus::Approved).await;
        self.reload(user.id).await
    }

    pub async fn reload(&self, user_id: i64) -> User {
        self.state
            .repos
            .users
            .find_by_id(user_id)
            .await
            .expect("find user")
            .expect("user exists")
    }

    pub fn user_token(&self, user_id: i64) -> String {
        jwt::issue_user_token(&self.state.config.jwt.secret, user_id, 1).expect("issue token")
    }
}

/// Send one request through the router and decode the JSON body (Null when not JSON).
pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };

    let response = app.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
