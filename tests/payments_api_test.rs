mod common;

use axum::http::StatusCode;
use common::{parse_id, TestApp};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type HmacSha256 = Hmac<Sha256>;

#[tokio::test]
async fn intent_without_configured_key_reports_not_configured() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/api/create-payment-intent", json!({ "amount": "19.99" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Payment processing is not configured");
}

#[tokio::test]
async fn intent_converts_amount_to_minor_units_and_returns_client_secret() {
    let processor = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains("amount=1999"))
        .and(body_string_contains("currency=usd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pi_test_1",
            "client_secret": "pi_test_1_secret_xyz",
        })))
        .expect(1)
        .mount(&processor)
        .await;

    let uri = processor.uri();
    let app = TestApp::with_config(move |cfg| {
        cfg.stripe_secret_key = Some("sk_test_123".to_string());
        cfg.stripe_api_base = uri;
    })
    .await;

    let order_id = Uuid::new_v4();
    let (status, body) = app
        .post(
            "/api/create-payment-intent",
            json!({ "amount": "19.99", "orderId": order_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clientSecret"], "pi_test_1_secret_xyz");
    assert_eq!(body["paymentIntentId"], "pi_test_1");
}

#[tokio::test]
async fn processor_rejection_surfaces_its_message() {
    let processor = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": { "message": "Your card was declined." }
        })))
        .mount(&processor)
        .await;

    let uri = processor.uri();
    let app = TestApp::with_config(move |cfg| {
        cfg.stripe_secret_key = Some("sk_test_123".to_string());
        cfg.stripe_api_base = uri;
    })
    .await;

    let (status, body) = app
        .post("/api/create-payment-intent", json!({ "amount": "5.00" }))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Your card was declined."));
}

#[tokio::test]
async fn webhook_advances_order_to_processing() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let (_, body) = app
        .post("/api/orders", json!({ "userId": user, "total": "10.00" }))
        .await;
    let order_id = parse_id(&body);

    let (status, body) = app
        .post(
            "/api/webhook/stripe",
            json!({ "paymentIntentId": "pi_123", "orderId": order_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    let (_, body) = app.get(&format!("/api/orders/{}", order_id)).await;
    assert_eq!(body["status"], "processing");
}

#[tokio::test]
async fn webhook_without_both_fields_is_acknowledged_and_changes_nothing() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let (_, body) = app
        .post("/api/orders", json!({ "userId": user, "total": "10.00" }))
        .await;
    let order_id = parse_id(&body);

    let (status, body) = app
        .post("/api/webhook/stripe", json!({ "paymentIntentId": "pi_123" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    let (_, body) = app.get(&format!("/api/orders/{}", order_id)).await;
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn webhook_with_configured_secret_requires_a_valid_signature() {
    let app = TestApp::with_config(|cfg| {
        cfg.stripe_webhook_secret = Some("whsec_test".to_string());
    })
    .await;
    let user = Uuid::new_v4();

    let (_, body) = app
        .post("/api/orders", json!({ "userId": user, "total": "10.00" }))
        .await;
    let order_id = parse_id(&body);

    // Unsigned request is rejected.
    let (status, _) = app
        .post(
            "/api/webhook/stripe",
            json!({ "paymentIntentId": "pi_123", "orderId": order_id }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = app.get(&format!("/api/orders/{}", order_id)).await;
    assert_eq!(body["status"], "pending");

    // Properly signed request goes through.
    let payload = json!({ "paymentIntentId": "pi_123", "orderId": order_id }).to_string();
    let ts = chrono::Utc::now().timestamp();
    let mut mac = HmacSha256::new_from_slice(b"whsec_test").unwrap();
    mac.update(ts.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let request = axum::http::Request::builder()
        .method(axum::http::Method::POST)
        .uri("/api/webhook/stripe")
        .header("content-type", "application/json")
        .header("Stripe-Signature", format!("t={},v1={}", ts, signature))
        .body(axum::body::Body::from(payload))
        .unwrap();

    use tower::ServiceExt;
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, body) = app.get(&format!("/api/orders/{}", order_id)).await;
    assert_eq!(body["status"], "processing");
}
