// Payment dashboard, reference data and service plumbing

mod common;

use axum::http::StatusCode;
use common::{charge_success, setup_test_app, setup_test_app_with, test_config};
use scholarship_portal::db::MemoryStore;
use serde_json::Value;

#[tokio::test]
async fn test_dashboard_for_unpaid_application() {
    let app = setup_test_app().await;
    app.submit_application("ada@example.com").await;

    let response = app
        .get("/v1/payments/dashboard?email=ada@example.com")
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let view: Value = response.json().await;
    assert_eq!(view["paymentStatus"], "unpaid");
    assert_eq!(view["paymentStatusLabel"], "Unpaid");
    assert_eq!(view["totalMonths"], 4);
    assert_eq!(view["remainingBalance"], 40_000);
    assert_eq!(view["canPayMore"], true);
    assert_eq!(view["months"].as_array().unwrap().len(), 4);
    assert!(view["payments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dashboard_month_tiles_follow_payments() {
    let app = setup_test_app().await;
    app.submit_application("ada@example.com").await;

    let first = app.checkout("ada@example.com", 1).await;
    let rest = app.checkout("ada@example.com", 2).await;
    app.signed_webhook(&charge_success(&first, 1_000_000, "ada@example.com"))
        .await;
    app.signed_webhook(&charge_success(&rest, 2_000_000, "ada@example.com"))
        .await;

    let view: Value = app
        .get("/v1/payments/dashboard?email=ada@example.com")
        .send()
        .await
        .json()
        .await;

    let paid: Vec<bool> = view["months"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tile| tile["paid"].as_bool().unwrap())
        .collect();
    assert_eq!(paid, vec![true, true, true, false]);
    assert_eq!(view["remainingBalance"], 10_000);
    assert_eq!(view["paymentStatusLabel"], "Partially Paid");

    let last = app.checkout("ada@example.com", 1).await;
    app.signed_webhook(&charge_success(&last, 1_000_000, "ada@example.com"))
        .await;

    let view: Value = app
        .get("/v1/payments/dashboard?email=ada@example.com")
        .send()
        .await
        .json()
        .await;
    assert_eq!(view["paymentStatus"], "fully_paid");
    assert_eq!(view["canPayMore"], false);
    assert_eq!(view["remainingMonths"], 0);
}

#[tokio::test]
async fn test_dashboard_requires_known_email() {
    let app = setup_test_app().await;

    let response = app.get("/v1/payments/dashboard?email=").send().await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .get("/v1/payments/dashboard?email=ghost@example.com")
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_email_uses_latest_application() {
    let app = setup_test_app().await;
    app.submit_application("ada@example.com").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let latest = app.submit_application("ada@example.com").await;

    let view: Value = app
        .get("/v1/payments/dashboard?email=ada@example.com")
        .send()
        .await
        .json()
        .await;
    assert_eq!(view["application"]["id"], latest);
}

#[tokio::test]
async fn test_reference_data() {
    let app = setup_test_app().await;

    let programs: Value = app.get("/v1/reference/programs").send().await.json().await;
    assert_eq!(programs.as_array().unwrap().len(), 8);

    let countries: Value = app.get("/v1/reference/countries").send().await.json().await;
    assert!(countries
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["name"] == "Nigeria"));

    let plans: Value = app
        .get("/v1/reference/payment-plans")
        .send()
        .await
        .json()
        .await;
    assert_eq!(plans[0]["totalDurationMonths"], 4);
}

#[tokio::test]
async fn test_empty_reference_lists_skip_lookups() {
    let app = setup_test_app_with(test_config(), MemoryStore::empty());
    let application_id = app.submit_application("ada@example.com").await;
    assert!(!application_id.is_empty());

    // Without any plan rows the configured defaults apply
    let view: Value = app
        .get("/v1/payments/dashboard?email=ada@example.com")
        .send()
        .await
        .json()
        .await;
    assert_eq!(view["totalMonths"], 4);
    assert_eq!(view["remainingBalance"], 40_000);
}

#[tokio::test]
async fn test_health_and_docs() {
    let app = setup_test_app().await;

    let response = app.get("/v1/health").send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let health: Value = response.json().await;
    assert_eq!(health["service"], "scholarship-portal");

    let response = app.get("/v1/docs/openapi.json").send().await;
    assert_eq!(response.status(), StatusCode::OK);
    let spec: Value = response.json().await;
    assert!(spec["paths"]["/v1/webhooks/paystack"].is_object());
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = setup_test_app().await;

    let response = app
        .options("/v1/payments/checkout")
        .header("origin", "http://localhost:5173")
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.header("access-control-allow-origin").as_deref(),
        Some("http://localhost:5173")
    );
}

#[tokio::test]
async fn test_outbox_redelivers_failed_emails() {
    let app = setup_test_app().await;
    app.mailer.set_failing(true);
    app.submit_application("ada@example.com").await;

    let outbox = app.store.notifications().await;
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].status, "failed");

    app.mailer.set_failing(false);
    let report = app.state.outbox.redeliver_pending(10).await;
    assert_eq!(report.sent, 1);
    assert_eq!(app.mailer.sent().len(), 1);

    let outbox = app.store.notifications().await;
    assert_eq!(outbox[0].status, "sent");
}
