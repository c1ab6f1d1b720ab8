// Common test utilities and helper structs
// Shared across all integration test files

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use scholarship_portal::{
    app::AppState,
    app_config::AppConfig,
    build_router,
    db::MemoryStore,
    services::{
        email::{
            sender::EmailTransport,
            types::{EmailError, EmailMessage},
        },
        webhook::{sign_payload, SIGNATURE_HEADER},
        EmailService,
    },
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use tower::util::ServiceExt;

pub const WEBHOOK_SECRET: &str = "sk_test_secret";

/// Email transport that keeps every message instead of sending it
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<EmailMessage>>,
    fail: AtomicBool,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmailTransport for RecordingTransport {
    async fn deliver(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmailError::ServiceUnavailable);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingTransport>,
}

impl TestApp {
    /// Send a POST request
    pub fn post(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "POST", uri)
    }

    /// Send a PUT request
    pub fn put(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "PUT", uri)
    }

    /// Send a GET request
    pub fn get(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "GET", uri)
    }

    /// Send a DELETE request
    pub fn delete(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "DELETE", uri)
    }

    pub fn options(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "OPTIONS", uri)
    }

    /// Deliver a webhook body signed with the configured secret
    pub async fn signed_webhook(&self, event: &Value) -> TestResponse {
        let body = serde_json::to_vec(event).unwrap();
        let signature = sign_payload(WEBHOOK_SECRET, &body);
        self.post("/v1/webhooks/paystack")
            .header(SIGNATURE_HEADER, &signature)
            .raw_json(body)
            .send()
            .await
    }

    /// Create a draft and walk it to the review step with valid answers
    pub async fn draft_at_review(&self, email: &str) -> String {
        let draft: Value = self.post("/v1/applications/drafts").send().await.json().await;
        let id = draft["id"].as_str().unwrap().to_string();

        let response = self
            .put(&format!("/v1/applications/drafts/{}/personal-info", id))
            .json(&valid_personal_info(email))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = self
            .post(&format!("/v1/applications/drafts/{}/advance", id))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = self
            .put(&format!("/v1/applications/drafts/{}/employment-info", id))
            .json(&valid_employment_info())
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = self
            .post(&format!("/v1/applications/drafts/{}/advance", id))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        id
    }

    /// Submit a complete application and return its id
    pub async fn submit_application(&self, email: &str) -> String {
        let id = self.draft_at_review(email).await;
        let response = self
            .post(&format!("/v1/applications/drafts/{}/submit", id))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let submitted: Value = response.json().await;
        submitted["applicationId"].as_str().unwrap().to_string()
    }

    /// Start a checkout and return its payment reference
    pub async fn checkout(&self, email: &str, months: i32) -> String {
        let response = self
            .post("/v1/payments/checkout")
            .json(&json!({ "email": email, "monthsToPay": months }))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let session: Value = response.json().await;
        session["payment"]["paymentReference"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

/// Test request builder
pub struct TestRequest<'a> {
    app: &'a TestApp,
    method: &'static str,
    uri: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: &'static str, uri: &str) -> Self {
        Self {
            app,
            method,
            uri: uri.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add JSON body to request
    pub fn json<T: Serialize>(self, body: &T) -> Self {
        self.raw_json(serde_json::to_vec(body).unwrap())
    }

    /// Use these exact bytes as the JSON body
    pub fn raw_json(mut self, body: Vec<u8>) -> Self {
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Send the request
    pub async fn send(self) -> TestResponse {
        let mut builder = Request::builder().method(self.method).uri(&self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let request = builder
            .body(self.body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();

        let response = self.app.app.clone().oneshot(request).await.unwrap();

        TestResponse { response }
    }
}

/// Test response wrapper
pub struct TestResponse {
    response: Response<Body>,
}

impl TestResponse {
    /// Get status code
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }

    /// Parse JSON response
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> T {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Get response body as text
    pub async fn text(self) -> String {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }
}

/// Configuration shared by the integration tests: in-memory store, signed webhooks
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::in_memory();
    config.payment.paystack_secret_key = Some(WEBHOOK_SECRET.to_string());
    config.payment.require_webhook_signature = true;
    config
}

/// Setup test application over a fresh seeded store
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config(), MemoryStore::new())
}

pub fn setup_test_app_with(config: AppConfig, store: MemoryStore) -> TestApp {
    let store = Arc::new(store);
    let mailer = Arc::new(RecordingTransport::default());
    let email_service = Arc::new(
        EmailService::with_transport(config.email.clone(), mailer.clone()).unwrap(),
    );

    let state = AppState::new(config, store.clone(), email_service);
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        store,
        mailer,
    }
}

pub fn valid_personal_info(email: &str) -> Value {
    json!({
        "fullName": "Ada Okafor",
        "email": email,
        "phoneNumber": "+234 803 555 0101",
        "dateOfBirth": "1996-04-12",
        "country": "Nigeria",
        "address": "12 Marina Road, Lagos",
        "program": "Data Science",
        "gender": "Female"
    })
}

pub fn valid_employment_info() -> Value {
    json!({
        "employmentStatus": "Employed",
        "yearsOfExperience": "3",
        "currentEmployer": "Kuda",
        "salary": "250000",
        "reasonForJoining": "Move into analytics"
    })
}

/// A `charge.success` event as the gateway sends it
pub fn charge_success(reference: &str, amount_minor: i64, email: &str) -> Value {
    json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "amount": amount_minor,
            "currency": "NGN",
            "paid_at": "2026-01-15T10:00:00Z",
            "customer": { "email": email },
            "metadata": ""
        }
    })
}
