use crate::handlers::common::{map_service_error, success_response};
use crate::{
    entities::OrderStatus,
    errors::{ApiError, ServiceError},
    services::payments::CreatePaymentIntentInput,
    AppState,
};
use axum::{
    body::Bytes,
    extract::{Json, State},
    http::HeaderMap,
    response::Response,
};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{info, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Create a payment intent and hand its client secret to the browser
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentIntentRequest>,
) -> Result<Response, ApiError> {
    let intent = state
        .services
        .payments
        .create_intent(CreatePaymentIntentInput {
            amount: payload.amount,
            currency: payload.currency,
            order_id: payload.order_id,
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(intent))
}

/// Payment confirmation callback. Given a (paymentIntentId, orderId) pair it
/// advances the order to `processing`. When a webhook secret is configured
/// the `Stripe-Signature` header is verified first; without one the payload
/// is accepted as-is (development mode only).
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    if let Some(secret) = state.config.stripe_webhook_secret.as_deref() {
        if !verify_signature(&headers, &body, secret, state.config.webhook_tolerance_secs()) {
            warn!("Payment webhook signature verification failed");
            return Err(ApiError::ServiceError(ServiceError::Unauthorized(
                "invalid webhook signature".to_string(),
            )));
        }
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::ValidationError(format!("invalid json: {}", e)))?;

    let payment_intent_id = payload.get("paymentIntentId").and_then(Value::as_str);
    let order_id = payload
        .get("orderId")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok());

    if let (Some(payment_intent_id), Some(order_id)) = (payment_intent_id, order_id) {
        match state
            .services
            .orders
            .update_status(order_id, OrderStatus::Processing)
            .await
        {
            Ok(_) => {
                info!(%order_id, payment_intent_id, "order advanced to processing");
            }
            Err(ServiceError::NotFound(_)) => {
                warn!(%order_id, "webhook referenced unknown order");
            }
            Err(e) => return Err(map_service_error(e)),
        }
    }

    Ok(success_response(json!({ "received": true })))
}

/// Verifies a `Stripe-Signature: t=<ts>,v1=<hmac>` header: HMAC-SHA256 over
/// `"{t}.{body}"` with constant-time comparison and a timestamp tolerance.
fn verify_signature(headers: &HeaderMap, payload: &[u8], secret: &str, tolerance_secs: u64) -> bool {
    let Some(sig) = headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok())
    else {
        return false;
    };

    let mut ts = "";
    let mut v1 = "";
    for part in sig.split(',') {
        let mut it = part.trim().splitn(2, '=');
        match (it.next(), it.next()) {
            (Some("t"), Some(val)) => ts = val,
            (Some("v1"), Some(val)) => v1 = val,
            _ => {}
        }
    }
    if ts.is_empty() || v1.is_empty() {
        return false;
    }

    if let Ok(ts_i) = ts.parse::<i64>() {
        let now = chrono::Utc::now().timestamp();
        if (now - ts_i).unsigned_abs() > tolerance_secs {
            return false;
        }
    } else {
        return false;
    }

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(ts.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());
    constant_time_eq(&expected, v1)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    pub amount: Decimal,
    pub currency: Option<String>,
    pub order_id: Option<Uuid>,
}
