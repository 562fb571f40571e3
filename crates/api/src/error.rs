//! Domain error to HTTP response mapping.
//!
//! Every failure leaves the API as `{"error": CODE, "message": text}`.
//! Internal failures are logged and their detail withheld from the body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use creditship_core::account::AccountError;
use creditship_core::batch::BatchError;
use creditship_core::ledger::LedgerError;
use creditship_core::shipment::ShipmentError;
use creditship_shared::{ErrorCategory, JwtError};
use serde_json::{Map, Value, json};
use tracing::error;

/// An error ready to be written as a JSON response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Map<String, Value>,
}

impl ApiError {
    /// Build an error with an explicit status.
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: Map::new(),
        }
    }

    /// 401 with the given code.
    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, message)
    }

    fn categorized(category: ErrorCategory, code: &'static str, message: String) -> Self {
        let status = StatusCode::from_u16(category.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let internal = category == ErrorCategory::Internal;
        if internal {
            error!(code, error = %message, "Request failed with internal error");
        }
        Self::new(
            status,
            code,
            if internal {
                "An internal error occurred".to_string()
            } else {
                message
            },
        )
    }

    fn with_detail(mut self, key: &str, value: Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }

    /// HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = self.details;
        body.insert("error".to_string(), json!(self.code));
        body.insert("message".to_string(), json!(self.message));
        (self.status, Json(Value::Object(body))).into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        if e.is_authentication_failure() {
            return Self::unauthorized(e.error_code(), e.to_string());
        }
        Self::categorized(e.category(), e.error_code(), e.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self::categorized(e.category(), e.error_code(), e.to_string())
    }
}

impl From<ShipmentError> for ApiError {
    fn from(e: ShipmentError) -> Self {
        let err = Self::categorized(e.category(), e.error_code(), e.to_string());
        match e {
            ShipmentError::ReconciliationPending {
                shipment_id,
                status,
                ..
            } => err
                .with_detail("shipment_id", json!(shipment_id))
                .with_detail("status", json!(status)),
            _ => err,
        }
    }
}

impl From<BatchError> for ApiError {
    fn from(e: BatchError) -> Self {
        let err = Self::categorized(e.category(), e.error_code(), e.to_string());
        match e {
            BatchError::MissingColumns(columns) => {
                err.with_detail("missing_columns", json!(columns))
            }
            _ => err,
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => Self::unauthorized("TOKEN_EXPIRED", "Token has expired"),
            JwtError::DecodingError(_) => {
                Self::unauthorized("INVALID_TOKEN", "Invalid or malformed token")
            }
            JwtError::EncodingError(msg) => {
                Self::categorized(ErrorCategory::Internal, "TOKEN_ERROR", msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use creditship_core::shipment::ShipmentStatus;
    use creditship_core::store::StoreError;
    use creditship_shared::types::{AccountId, ShipmentId};
    use http_body_util::BodyExt;
    use rust_decimal_macros::dec;

    use super::*;

    async fn body_of(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn insufficient_credits_is_payment_required() {
        let err: ApiError = LedgerError::InsufficientCredits {
            balance: dec!(5),
            required: dec!(7.25),
        }
        .into();

        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["error"], "INSUFFICIENT_CREDITS");
        assert!(body["message"].as_str().unwrap().contains("7.25"));
    }

    #[tokio::test]
    async fn reconciliation_carries_shipment_and_status() {
        let shipment_id = ShipmentId::new();
        let err: ApiError = ShipmentError::ReconciliationPending {
            shipment_id,
            status: ShipmentStatus::PurchasedUnbilled,
            reason: "storage unavailable".to_string(),
        }
        .into();

        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "RECONCILIATION_PENDING");
        assert_eq!(body["shipment_id"], json!(shipment_id));
        assert_eq!(body["status"], "purchased_unbilled");
    }

    #[tokio::test]
    async fn internal_detail_is_withheld() {
        let err: ApiError =
            LedgerError::Store(StoreError::Unavailable("password=hunter2".into())).into();

        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "DATABASE_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("hunter2"));
    }

    #[tokio::test]
    async fn inactive_actor_is_unauthorized() {
        let err: ApiError = AccountError::Inactive(AccountId::new()).into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "ACCOUNT_INACTIVE");
    }

    #[tokio::test]
    async fn missing_columns_are_listed() {
        let err: ApiError =
            BatchError::MissingColumns(vec!["to_zip".to_string(), "weight".to_string()]).into();

        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["missing_columns"], json!(["to_zip", "weight"]));
    }
}
