use crate::errors::{ApiError, ServiceError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// Accepts an optional integer encoded either as a JSON number or as a
/// string ("5"), the way storefront admin forms submit counts.
pub fn lenient_option_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i32),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Payload {
        #[serde(default, deserialize_with = "lenient_option_i32")]
        stock: Option<i32>,
    }

    #[test]
    fn lenient_i32_accepts_number_and_string() {
        let p: Payload = serde_json::from_str(r#"{"stock": 5}"#).unwrap();
        assert_eq!(p.stock, Some(5));

        let p: Payload = serde_json::from_str(r#"{"stock": "5"}"#).unwrap();
        assert_eq!(p.stock, Some(5));

        let p: Payload = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(p.stock, None);
    }

    #[test]
    fn lenient_i32_rejects_garbage() {
        assert!(serde_json::from_str::<Payload>(r#"{"stock": "five"}"#).is_err());
    }
}
