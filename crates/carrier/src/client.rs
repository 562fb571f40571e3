//! Reqwest-backed carrier gateway.

use std::time::Duration;

use async_trait::async_trait;
use creditship_core::shipment::{
    CarrierError, CarrierGateway, LabelPurchase, LabelRefund, RateQuote, ShipmentDetails,
};
use creditship_shared::config::CarrierConfig;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, InvalidHeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dto::{
    RateDto, RefundRequestDto, RefundResponseDto, ShipmentRequestDto, ShipmentResponseDto,
    TransactionRequestDto, TransactionResponseDto,
};

/// Gateway construction failures.
#[derive(Debug, Error)]
pub enum CarrierSetupError {
    /// The API token cannot be sent as a header value.
    #[error("carrier API token is not a valid header value")]
    InvalidToken(#[from] InvalidHeaderValue),

    /// The HTTP client could not be built.
    #[error("failed to build carrier HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Carrier gateway speaking to a Shippo-compatible REST API.
#[derive(Debug, Clone)]
pub struct HttpCarrierGateway {
    client: Client,
    base_url: String,
}

impl HttpCarrierGateway {
    /// Build a gateway with the configured token and per-request timeout.
    pub fn new(config: &CarrierConfig) -> Result<Self, CarrierSetupError> {
        let mut auth = HeaderValue::from_str(&format!("ShippoToken {}", config.api_token))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CarrierError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        serde_json::from_slice(&body).map_err(|e| CarrierError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CarrierGateway for HttpCarrierGateway {
    async fn fetch_rate(&self, rate_ref: &str) -> Result<RateQuote, CarrierError> {
        let rate: RateDto = self
            .send(self.client.get(self.url(&format!("rates/{rate_ref}"))))
            .await?;
        Ok(rate.into_quote())
    }

    async fn shop_rate(&self, details: &ShipmentDetails) -> Result<RateQuote, CarrierError> {
        let response: ShipmentResponseDto = self
            .send(
                self.client
                    .post(self.url("shipments/"))
                    .json(&ShipmentRequestDto::new(details)),
            )
            .await?;
        let quote = response.into_cheapest()?;
        debug!(rate_ref = %quote.rate_ref, amount = %quote.amount, "Carrier rate selected");
        Ok(quote)
    }

    /// Re-reads the rate before buying so the charged amount is known without
    /// another call once the carrier has charged.
    async fn purchase_label(&self, rate_ref: &str) -> Result<LabelPurchase, CarrierError> {
        let quote = self.fetch_rate(rate_ref).await?;
        let response: TransactionResponseDto = self
            .send(
                self.client
                    .post(self.url("transactions/"))
                    .json(&TransactionRequestDto::new(rate_ref)),
            )
            .await?;
        let purchase = response.into_purchase(quote).inspect_err(|e| {
            warn!(rate_ref, error = %e, "Carrier transaction not completed");
        })?;
        info!(
            purchase_ref = %purchase.purchase_ref,
            tracking_id = %purchase.tracking_id,
            cost = %purchase.cost,
            "Carrier label bought"
        );
        Ok(purchase)
    }

    async fn refund_label(&self, purchase_ref: &str) -> Result<LabelRefund, CarrierError> {
        let response: RefundResponseDto = self
            .send(
                self.client
                    .post(self.url("refunds/"))
                    .json(&RefundRequestDto::new(purchase_ref)),
            )
            .await?;
        let refund = response.into_refund()?;
        info!(purchase_ref, refund_ref = %refund.refund_ref, "Carrier refund requested");
        Ok(refund)
    }
}

fn map_transport_error(error: reqwest::Error) -> CarrierError {
    if error.is_timeout() {
        CarrierError::Unreachable(format!("timed out: {error}"))
    } else if error.is_decode() {
        CarrierError::InvalidResponse(error.to_string())
    } else {
        CarrierError::Unreachable(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> CarrierError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    };

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            CarrierError::Unreachable(message)
        }
        _ if status.is_client_error() => CarrierError::Rejected(message),
        _ => CarrierError::Unreachable(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 200;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
