//! Wire types for the carrier REST API.
//!
//! Requests borrow the domain types; responses decode into transport DTOs and
//! are mapped into domain quotes and purchases in one pass.

use creditship_core::shipment::{
    Address, CarrierError, LabelPurchase, LabelRefund, Parcel, RateQuote, ShipmentDetails,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct ShipmentRequestDto<'a> {
    address_from: &'a Address,
    address_to: &'a Address,
    parcels: [&'a Parcel; 1],
    #[serde(rename = "async")]
    asynchronous: bool,
}

impl<'a> ShipmentRequestDto<'a> {
    pub(crate) const fn new(details: &'a ShipmentDetails) -> Self {
        Self {
            address_from: &details.from_address,
            address_to: &details.to_address,
            parcels: [&details.parcel],
            asynchronous: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TransactionRequestDto<'a> {
    rate: &'a str,
    label_file_type: &'static str,
    #[serde(rename = "async")]
    asynchronous: bool,
}

impl<'a> TransactionRequestDto<'a> {
    pub(crate) const fn new(rate: &'a str) -> Self {
        Self {
            rate,
            label_file_type: "PDF",
            asynchronous: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RefundRequestDto<'a> {
    transaction: &'a str,
    #[serde(rename = "async")]
    asynchronous: bool,
}

impl<'a> RefundRequestDto<'a> {
    pub(crate) const fn new(transaction: &'a str) -> Self {
        Self {
            transaction,
            asynchronous: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageDto {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    text: String,
}

fn join_messages(messages: &[MessageDto]) -> String {
    messages
        .iter()
        .filter(|m| !m.text.trim().is_empty())
        .map(|m| match &m.source {
            Some(source) => format!("{source}: {}", m.text.trim()),
            None => m.text.trim().to_owned(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServiceLevelDto {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateDto {
    object_id: String,
    amount: Decimal,
    #[serde(default)]
    provider: String,
    #[serde(default)]
    servicelevel: Option<ServiceLevelDto>,
}

impl RateDto {
    pub(crate) fn into_quote(self) -> RateQuote {
        RateQuote {
            rate_ref: self.object_id,
            amount: self.amount,
            carrier: self.provider,
            service_level: self.servicelevel.map(|s| s.name).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShipmentResponseDto {
    object_id: String,
    #[serde(default)]
    rates: Vec<RateDto>,
    #[serde(default)]
    messages: Vec<MessageDto>,
}

impl ShipmentResponseDto {
    /// Cheapest offered rate. Ties keep the carrier's ordering.
    pub(crate) fn into_cheapest(self) -> Result<RateQuote, CarrierError> {
        let reason = join_messages(&self.messages);
        let shipment_ref = self.object_id;
        self.rates
            .into_iter()
            .reduce(|best, rate| if rate.amount < best.amount { rate } else { best })
            .map(RateDto::into_quote)
            .ok_or_else(|| {
                let mut message = format!("no rates available for shipment {shipment_ref}");
                if !reason.is_empty() {
                    message.push_str(": ");
                    message.push_str(&reason);
                }
                CarrierError::Rejected(message)
            })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransactionResponseDto {
    object_id: String,
    status: String,
    #[serde(default)]
    tracking_number: Option<String>,
    #[serde(default)]
    label_url: Option<String>,
    #[serde(default)]
    messages: Vec<MessageDto>,
}

impl TransactionResponseDto {
    /// Maps a synchronous transaction onto the purchase, priced at `quote`.
    pub(crate) fn into_purchase(self, quote: RateQuote) -> Result<LabelPurchase, CarrierError> {
        match self.status.as_str() {
            "SUCCESS" => {}
            "ERROR" => {
                let reason = join_messages(&self.messages);
                return Err(CarrierError::Rejected(if reason.is_empty() {
                    format!("transaction {} failed", self.object_id)
                } else {
                    reason
                }));
            }
            other => {
                return Err(CarrierError::InvalidResponse(format!(
                    "transaction {} returned status {other}",
                    self.object_id
                )));
            }
        }

        let tracking_id = self
            .tracking_number
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                CarrierError::InvalidResponse(format!(
                    "transaction {} has no tracking number",
                    self.object_id
                ))
            })?;

        Ok(LabelPurchase {
            purchase_ref: self.object_id,
            rate_ref: quote.rate_ref,
            tracking_id,
            cost: quote.amount,
            label_url: self.label_url.filter(|u| !u.is_empty()),
            carrier: quote.carrier,
            service_level: quote.service_level,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefundResponseDto {
    object_id: String,
    status: String,
}

impl RefundResponseDto {
    pub(crate) fn into_refund(self) -> Result<LabelRefund, CarrierError> {
        match self.status.as_str() {
            "ERROR" => Err(CarrierError::Rejected(format!(
                "refund {} was declined",
                self.object_id
            ))),
            _ => Ok(LabelRefund {
                refund_ref: self.object_id,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use creditship_core::shipment::{DistanceUnit, MassUnit};
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn quote() -> RateQuote {
        RateQuote {
            rate_ref: "rate_1".to_owned(),
            amount: dec!(7.25),
            carrier: "USPS".to_owned(),
            service_level: "Priority Mail".to_owned(),
        }
    }

    fn address(name: &str) -> Address {
        Address {
            name: name.to_owned(),
            company: None,
            street1: "1 Main St".to_owned(),
            street2: None,
            city: "Springfield".to_owned(),
            state: "IL".to_owned(),
            zip: "62701".to_owned(),
            country: "US".to_owned(),
            phone: None,
            email: None,
        }
    }

    #[test]
    fn shipment_request_sends_one_parcel_synchronously() {
        let details = ShipmentDetails {
            from_address: address("Sender"),
            to_address: address("Recipient"),
            parcel: Parcel {
                length: dec!(10),
                width: dec!(6),
                height: dec!(4),
                distance_unit: DistanceUnit::In,
                weight: dec!(2.5),
                mass_unit: MassUnit::Lb,
            },
        };

        let body = serde_json::to_value(ShipmentRequestDto::new(&details)).unwrap();

        assert_eq!(body["async"], json!(false));
        assert_eq!(body["address_from"]["name"], json!("Sender"));
        assert_eq!(body["address_to"]["name"], json!("Recipient"));
        assert_eq!(body["parcels"].as_array().unwrap().len(), 1);
        assert_eq!(body["parcels"][0]["mass_unit"], json!("lb"));
        assert!(body["address_from"].get("street2").is_none());
    }

    #[test]
    fn cheapest_rate_wins() {
        let response: ShipmentResponseDto = serde_json::from_value(json!({
            "object_id": "shp_1",
            "rates": [
                {"object_id": "r_a", "amount": "12.40", "provider": "UPS", "servicelevel": {"name": "Ground"}},
                {"object_id": "r_b", "amount": "8.10", "provider": "USPS", "servicelevel": {"name": "Priority"}},
                {"object_id": "r_c", "amount": "9.00", "provider": "FedEx"}
            ]
        }))
        .unwrap();

        let quote = response.into_cheapest().unwrap();

        assert_eq!(quote.rate_ref, "r_b");
        assert_eq!(quote.amount, dec!(8.10));
        assert_eq!(quote.carrier, "USPS");
        assert_eq!(quote.service_level, "Priority");
    }

    #[test]
    fn empty_rate_list_is_rejected_with_carrier_messages() {
        let response: ShipmentResponseDto = serde_json::from_value(json!({
            "object_id": "shp_2",
            "rates": [],
            "messages": [{"source": "USPS", "text": "Invalid destination zip"}]
        }))
        .unwrap();

        let err = response.into_cheapest().unwrap_err();

        match err {
            CarrierError::Rejected(message) => {
                assert!(message.contains("shp_2"));
                assert!(message.contains("USPS: Invalid destination zip"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn successful_transaction_is_priced_at_the_quote() {
        let response: TransactionResponseDto = serde_json::from_value(json!({
            "object_id": "txn_1",
            "status": "SUCCESS",
            "tracking_number": "9400100000000000000000",
            "label_url": "https://labels.example/txn_1.pdf",
            "rate": "rate_1"
        }))
        .unwrap();

        let purchase = response.into_purchase(quote()).unwrap();

        assert_eq!(purchase.purchase_ref, "txn_1");
        assert_eq!(purchase.rate_ref, "rate_1");
        assert_eq!(purchase.cost, dec!(7.25));
        assert_eq!(purchase.tracking_id, "9400100000000000000000");
        assert_eq!(
            purchase.label_url.as_deref(),
            Some("https://labels.example/txn_1.pdf")
        );
    }

    #[test]
    fn failed_transaction_is_rejected() {
        let response: TransactionResponseDto = serde_json::from_value(json!({
            "object_id": "txn_2",
            "status": "ERROR",
            "messages": [{"text": "Rate expired"}]
        }))
        .unwrap();

        let err = response.into_purchase(quote()).unwrap_err();

        assert!(matches!(err, CarrierError::Rejected(ref m) if m == "Rate expired"));
    }

    #[test]
    fn success_without_tracking_number_is_invalid() {
        let response: TransactionResponseDto = serde_json::from_value(json!({
            "object_id": "txn_3",
            "status": "SUCCESS",
            "tracking_number": ""
        }))
        .unwrap();

        let err = response.into_purchase(quote()).unwrap_err();

        assert!(matches!(err, CarrierError::InvalidResponse(_)));
    }

    #[test]
    fn queued_transaction_is_invalid() {
        let response: TransactionResponseDto =
            serde_json::from_value(json!({"object_id": "txn_4", "status": "QUEUED"})).unwrap();

        let err = response.into_purchase(quote()).unwrap_err();

        assert!(matches!(err, CarrierError::InvalidResponse(ref m) if m.contains("QUEUED")));
    }

    #[test]
    fn refund_status_mapping() {
        let queued: RefundResponseDto =
            serde_json::from_value(json!({"object_id": "rf_1", "status": "QUEUED"})).unwrap();
        let declined: RefundResponseDto =
            serde_json::from_value(json!({"object_id": "rf_2", "status": "ERROR"})).unwrap();

        assert_eq!(queued.into_refund().unwrap().refund_ref, "rf_1");
        assert!(matches!(
            declined.into_refund(),
            Err(CarrierError::Rejected(_))
        ));
    }
}
