// Payment portal over HTTP: applicant lookup, bundle selection and checkout sessions

mod common;

use axum::http::StatusCode;
use common::{charge_success, setup_test_app};
use serde_json::{json, Value};

fn bundle_months(options: &Value) -> Vec<i64> {
    options["options"]["bundles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["months"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_verify_applicant() {
    let app = setup_test_app().await;
    app.submit_application("ada@example.com").await;

    let found: Value = app
        .post("/v1/payments/verify-applicant")
        .json(&json!({ "email": "  ADA@example.com" }))
        .send()
        .await
        .json()
        .await;
    assert_eq!(found["exists"], true);
    assert_eq!(found["applicationData"]["fullName"], "Ada Okafor");

    let missing: Value = app
        .post("/v1/payments/verify-applicant")
        .json(&json!({ "email": "nobody@example.com" }))
        .send()
        .await
        .json()
        .await;
    assert_eq!(missing["exists"], false);

    let response = app
        .post("/v1/payments/verify-applicant")
        .json(&json!({ "email": "   " }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fresh_application_offers_all_bundles() {
    let app = setup_test_app().await;
    app.submit_application("ada@example.com").await;

    let response = app
        .get("/v1/payments/options?email=ada@example.com")
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let options: Value = response.json().await;
    assert_eq!(bundle_months(&options), vec![1, 2, 4]);
    assert_eq!(options["priceLabel"], "₦10,000 per month");
    assert_eq!(options["options"]["remainingAmount"], 40_000);
}

#[tokio::test]
async fn test_bundles_never_exceed_remaining_months() {
    let app = setup_test_app().await;
    app.submit_application("ada@example.com").await;

    let reference = app.checkout("ada@example.com", 2).await;
    let response = app
        .signed_webhook(&charge_success(&reference, 2_000_000, "ada@example.com"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let options: Value = app
        .get("/v1/payments/options?email=ada@example.com")
        .send()
        .await
        .json()
        .await;
    assert_eq!(options["options"]["monthsPaid"], 2);
    assert_eq!(bundle_months(&options), vec![1, 2]);

    // Three months no longer fits the plan
    let response = app
        .post("/v1/payments/checkout")
        .json(&json!({ "email": "ada@example.com", "monthsToPay": 3 }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_completed_plan_offers_nothing() {
    let app = setup_test_app().await;
    app.submit_application("ada@example.com").await;

    let reference = app.checkout("ada@example.com", 4).await;
    app.signed_webhook(&charge_success(&reference, 4_000_000, "ada@example.com"))
        .await;

    let options: Value = app
        .get("/v1/payments/options?email=ada@example.com")
        .send()
        .await
        .json()
        .await;
    assert_eq!(options["options"]["planComplete"], true);
    assert!(bundle_months(&options).is_empty());
    assert!(options["options"]["message"]
        .as_str()
        .unwrap()
        .contains("All 4 months have been paid"));

    let response = app
        .post("/v1/payments/checkout")
        .json(&json!({ "email": "ada@example.com", "monthsToPay": 1 }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_checkout_creates_pending_payment_and_widget() {
    let app = setup_test_app().await;
    let application_id = app.submit_application("ada@example.com").await;

    let response = app
        .post("/v1/payments/checkout")
        .json(&json!({ "email": "ada@example.com", "monthsToPay": 2 }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let session: Value = response.json().await;
    assert_eq!(session["payment"]["paymentStatus"], "pending");
    assert_eq!(session["payment"]["amountPaid"], 20_000);
    assert_eq!(session["payment"]["monthsPaidFor"], 2);
    assert_eq!(session["widget"]["amount"], 2_000_000);
    assert_eq!(session["widget"]["currency"], "NGN");
    assert_eq!(session["widget"]["key"], "pk_test_local");
    assert_eq!(
        session["widget"]["reference"],
        session["payment"]["paymentReference"]
    );
    assert_eq!(session["widget"]["metadata"]["applicationId"], application_id);
    assert_eq!(app.store.payment_count().await, 1);
}

#[tokio::test]
async fn test_new_checkout_supersedes_pending_one() {
    let app = setup_test_app().await;
    app.submit_application("ada@example.com").await;

    let abandoned = app.checkout("ada@example.com", 4).await;
    let current = app.checkout("ada@example.com", 4).await;

    let receipt = app
        .get(&format!("/v1/payments/{}/receipt", abandoned))
        .send()
        .await
        .text()
        .await;
    assert!(receipt.contains("Status: FAILED"));

    let receipt = app
        .get(&format!("/v1/payments/{}/receipt", current))
        .send()
        .await
        .text()
        .await;
    assert!(receipt.contains("Status: PENDING"));
    assert_eq!(app.store.payment_count().await, 2);
}

#[tokio::test]
async fn test_checkout_for_unknown_applicant() {
    let app = setup_test_app().await;

    let response = app
        .post("/v1/payments/checkout")
        .json(&json!({ "email": "ghost@example.com", "monthsToPay": 1 }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.store.payment_count().await, 0);
}

#[tokio::test]
async fn test_client_confirmation_does_not_credit_payment() {
    let app = setup_test_app().await;
    app.submit_application("ada@example.com").await;
    let reference = app.checkout("ada@example.com", 1).await;

    let response = app
        .post(&format!("/v1/payments/{}/confirm", reference))
        .json(&json!({ "gatewayReference": "T123456789" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let confirmation: Value = response.json().await;
    assert_eq!(confirmation["awaitingConfirmation"], true);
    assert_eq!(confirmation["payment"]["paymentStatus"], "pending");
    assert_eq!(confirmation["payment"]["paystackReference"], "T123456789");

    let options: Value = app
        .get("/v1/payments/options?email=ada@example.com")
        .send()
        .await
        .json()
        .await;
    assert_eq!(options["options"]["monthsPaid"], 0);
}

#[tokio::test]
async fn test_cancel_marks_pending_payment_failed() {
    let app = setup_test_app().await;
    app.submit_application("ada@example.com").await;
    let reference = app.checkout("ada@example.com", 1).await;

    let payment: Value = app
        .post(&format!("/v1/payments/{}/cancel", reference))
        .send()
        .await
        .json()
        .await;
    assert_eq!(payment["paymentStatus"], "failed");

    let response = app.post("/v1/payments/NOPE-123/cancel").send().await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_receipt_download() {
    let app = setup_test_app().await;
    app.submit_application("ada@example.com").await;
    let reference = app.checkout("ada@example.com", 1).await;
    app.signed_webhook(&charge_success(&reference, 1_000_000, "ada@example.com"))
        .await;

    let response = app
        .get(&format!("/v1/payments/{}/receipt", reference))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.header("content-disposition").unwrap(),
        format!("attachment; filename=\"receipt_{}.txt\"", reference)
    );

    let text = response.text().await;
    assert!(text.contains("PAYMENT RECEIPT"));
    assert!(text.contains(&reference));
    assert!(text.contains("Status: PAID"));
}

#[tokio::test]
async fn test_program_plan_overrides_global_plan() {
    let app = setup_test_app().await;
    app.store
        .add_payment_plan(Some("Data Science"), 15_000, 6)
        .await;
    app.submit_application("ada@example.com").await;

    let options: Value = app
        .get("/v1/payments/options?email=ada@example.com")
        .send()
        .await
        .json()
        .await;
    assert_eq!(options["options"]["totalMonths"], 6);
    assert_eq!(options["options"]["monthlyAmount"], 15_000);
    assert_eq!(bundle_months(&options), vec![1, 2, 6]);
}
