use crate::{
    config::AppConfig,
    errors::ServiceError,
    events::{Event, EventSender},
};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Thin client for the payment processor's payment-intents API. The backend
/// only brokers the intent; the charge is confirmed browser-side through the
/// processor's own SDK.
#[derive(Clone)]
pub struct PaymentService {
    http: reqwest::Client,
    secret_key: Option<String>,
    api_base: String,
    event_sender: Arc<EventSender>,
}

impl PaymentService {
    pub fn new(config: &AppConfig, event_sender: Arc<EventSender>) -> Self {
        let secret_key = config
            .stripe_secret_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        if secret_key.is_none() {
            warn!("No payment processor secret key configured; intents will be rejected");
        }

        Self {
            http: reqwest::Client::new(),
            secret_key,
            api_base: config.stripe_api_base.trim_end_matches('/').to_string(),
            event_sender,
        }
    }

    /// True when a processor secret key is present.
    pub fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }

    /// Requests a payment intent and returns its client-usable secret.
    /// Amounts arrive in major units and are converted to the processor's
    /// minor units by rounding.
    #[instrument(skip(self), fields(amount = %input.amount))]
    pub async fn create_intent(
        &self,
        input: CreatePaymentIntentInput,
    ) -> Result<PaymentIntent, ServiceError> {
        let Some(secret_key) = self.secret_key.as_deref() else {
            return Err(ServiceError::PaymentNotConfigured);
        };

        if input.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Amount must be greater than 0".to_string(),
            ));
        }

        let amount_minor = to_minor_units(input.amount)?;
        let currency = input
            .currency
            .as_deref()
            .unwrap_or("usd")
            .to_lowercase();

        let mut form: Vec<(&str, String)> = vec![
            ("amount", amount_minor.to_string()),
            ("currency", currency),
        ];
        if let Some(order_id) = input.order_id {
            form.push(("metadata[orderId]", order_id.to_string()));
        }

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ProcessorErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.map(|e| e.message))
                .unwrap_or_else(|| format!("payment processor returned {}", status));
            return Err(ServiceError::PaymentFailed(message));
        }

        let intent: ProcessorPaymentIntent = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))?;

        self.event_sender
            .send_or_log(Event::PaymentIntentCreated {
                intent_id: intent.id.clone(),
                order_id: input.order_id,
            })
            .await;

        info!("Created payment intent {}", intent.id);
        Ok(PaymentIntent {
            client_secret: intent.client_secret,
            payment_intent_id: intent.id,
        })
    }
}

/// Converts a major-unit amount to minor units (e.g. dollars to cents),
/// rounding halves away from zero.
fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| ServiceError::ValidationError("Amount out of range".to_string()))
}

/// Input for creating a payment intent
#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentInput {
    pub amount: Decimal,
    pub currency: Option<String>,
    pub order_id: Option<Uuid>,
}

/// Client-facing intent handle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Deserialize)]
struct ProcessorPaymentIntent {
    id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ProcessorErrorBody {
    error: Option<ProcessorErrorDetails>,
}

#[derive(Debug, Deserialize)]
struct ProcessorErrorDetails {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn dollars_convert_to_cents() {
        assert_eq!(to_minor_units(dec!(19.99)).unwrap(), 1999);
        assert_eq!(to_minor_units(dec!(50)).unwrap(), 5000);
        assert_eq!(to_minor_units(dec!(0.01)).unwrap(), 1);
    }

    #[test]
    fn fractional_cents_round_half_away_from_zero() {
        assert_eq!(to_minor_units(dec!(10.005)).unwrap(), 1001);
        assert_eq!(to_minor_units(dec!(10.004)).unwrap(), 1000);
    }

    #[test]
    fn intent_serializes_camel_case() {
        let intent = PaymentIntent {
            client_secret: "pi_123_secret_abc".to_string(),
            payment_intent_id: "pi_123".to_string(),
        };
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["clientSecret"], "pi_123_secret_abc");
        assert_eq!(json["paymentIntentId"], "pi_123");
    }
}
