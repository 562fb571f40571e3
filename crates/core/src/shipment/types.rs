//! Shipment domain types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use creditship_shared::types::{AccountId, BatchJobId, ShipmentId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::carrier::LabelPurchase;

/// Lifecycle state of a shipping label.
///
/// `Pending -> Purchased -> Refunded`, `Pending -> Error`, and
/// `Pending -> PurchasedUnbilled -> Purchased` when a ledger write failed
/// after the carrier already charged, and `Pending -> Interrupted` when the
/// process stopped mid-purchase and the carrier outcome is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    /// Staged, carrier not yet charged.
    Pending,
    /// Carrier charged and ledger debited.
    Purchased,
    /// Carrier charged but the ledger debit did not commit.
    PurchasedUnbilled,
    /// Carrier refunded and ledger credited.
    Refunded,
    /// Purchase failed before any credits moved.
    Error,
    /// Purchase was cut off; the carrier may have charged. Needs operator review.
    Interrupted,
}

impl ShipmentStatus {
    /// Wire and database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Purchased => "purchased",
            Self::PurchasedUnbilled => "purchased_unbilled",
            Self::Refunded => "refunded",
            Self::Error => "error",
            Self::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Postal address as sent to the carrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Contact name.
    pub name: String,
    /// Company.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// First street line.
    pub street1: String,
    /// Second street line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street2: Option<String>,
    /// City.
    pub city: String,
    /// State or province.
    pub state: String,
    /// Postal code.
    pub zip: String,
    /// ISO country code.
    pub country: String,
    /// Phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Address {
    fn missing_fields(&self, prefix: &str, out: &mut Vec<String>) {
        let required = [
            ("name", &self.name),
            ("street1", &self.street1),
            ("city", &self.city),
            ("state", &self.state),
            ("zip", &self.zip),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                out.push(format!("{prefix}_{field}"));
            }
        }
    }
}

/// Length unit accepted by the carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    /// Centimeters.
    Cm,
    /// Inches.
    In,
    /// Feet.
    Ft,
    /// Millimeters.
    Mm,
    /// Meters.
    M,
    /// Yards.
    Yd,
}

/// Weight unit accepted by the carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MassUnit {
    /// Grams.
    G,
    /// Ounces.
    Oz,
    /// Pounds.
    Lb,
    /// Kilograms.
    Kg,
}

impl DistanceUnit {
    /// Carrier name of the unit.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cm => "cm",
            Self::In => "in",
            Self::Ft => "ft",
            Self::Mm => "mm",
            Self::M => "m",
            Self::Yd => "yd",
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cm" => Ok(Self::Cm),
            "in" => Ok(Self::In),
            "ft" => Ok(Self::Ft),
            "mm" => Ok(Self::Mm),
            "m" => Ok(Self::M),
            "yd" => Ok(Self::Yd),
            other => Err(format!("unknown distance unit '{other}'")),
        }
    }
}

impl MassUnit {
    /// Carrier name of the unit.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::G => "g",
            Self::Oz => "oz",
            Self::Lb => "lb",
            Self::Kg => "kg",
        }
    }
}

impl FromStr for MassUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "g" => Ok(Self::G),
            "oz" => Ok(Self::Oz),
            "lb" => Ok(Self::Lb),
            "kg" => Ok(Self::Kg),
            other => Err(format!("unknown mass unit '{other}'")),
        }
    }
}

/// Package dimensions and weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Length.
    pub length: Decimal,
    /// Width.
    pub width: Decimal,
    /// Height.
    pub height: Decimal,
    /// Unit for length, width and height.
    pub distance_unit: DistanceUnit,
    /// Weight.
    pub weight: Decimal,
    /// Unit for weight.
    pub mass_unit: MassUnit,
}

/// Everything the carrier needs to rate and buy a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentDetails {
    /// Sender.
    pub from_address: Address,
    /// Recipient.
    pub to_address: Address,
    /// Package.
    pub parcel: Parcel,
}

impl ShipmentDetails {
    /// Checks required fields and positive parcel measurements.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message naming every offending field.
    pub fn validate(&self) -> Result<(), String> {
        let mut missing = Vec::new();
        self.from_address.missing_fields("from", &mut missing);
        self.to_address.missing_fields("to", &mut missing);
        if !missing.is_empty() {
            return Err(format!("missing required fields: {}", missing.join(", ")));
        }

        let measurements = [
            ("length", self.parcel.length),
            ("width", self.parcel.width),
            ("height", self.parcel.height),
            ("weight", self.parcel.weight),
        ];
        let non_positive: Vec<&str> = measurements
            .iter()
            .filter(|(_, value)| *value <= Decimal::ZERO)
            .map(|(field, _)| *field)
            .collect();
        if !non_positive.is_empty() {
            return Err(format!(
                "parcel measurements must be positive: {}",
                non_positive.join(", ")
            ));
        }
        Ok(())
    }
}

/// How the rate for a purchase is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateSelection {
    /// A rate previously quoted by the carrier.
    Quoted(String),
    /// Let the carrier pick its cheapest rate for the details.
    Cheapest,
}

/// Position of a shipment inside a batch upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRowRef {
    /// Owning batch job.
    pub job_id: BatchJobId,
    /// Zero-based index of the data row.
    pub row_index: u32,
}

/// A label purchase request.
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    /// Addresses and parcel.
    pub details: ShipmentDetails,
    /// Rate choice.
    pub rate: RateSelection,
    /// Set when the purchase comes from a batch row.
    pub batch: Option<BatchRowRef>,
}

/// A shipping label and its billing state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shipment {
    /// Unique shipment ID.
    pub id: ShipmentId,
    /// Owner whose balance pays for the label.
    pub account_id: AccountId,
    /// Current state.
    pub status: ShipmentStatus,
    /// Rate the purchase was made against.
    pub rate_ref: Option<String>,
    /// Carrier transaction ID, set once purchased.
    pub external_purchase_ref: Option<String>,
    /// Tracking number.
    pub tracking_id: Option<String>,
    /// Printable label location.
    pub label_url: Option<String>,
    /// Cost locked at purchase; the refund amount.
    pub cost: Option<Decimal>,
    /// Carrier name.
    pub carrier: Option<String>,
    /// Service level name.
    pub service_level: Option<String>,
    /// Carrier refund ID.
    pub refund_ref: Option<String>,
    /// Addresses and parcel.
    pub details: ShipmentDetails,
    /// Batch origin, if any.
    pub batch: Option<BatchRowRef>,
    /// Failure reason for `Error` and `PurchasedUnbilled`.
    pub error_message: Option<String>,
    /// Staging time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// When the carrier charge happened.
    pub purchased_at: Option<DateTime<Utc>>,
    /// When the refund was recorded.
    pub refunded_at: Option<DateTime<Utc>>,
}

impl Shipment {
    /// Copies carrier purchase fields onto the shipment.
    pub fn record_purchase(&mut self, purchase: &LabelPurchase, at: DateTime<Utc>) {
        self.rate_ref = Some(purchase.rate_ref.clone());
        self.external_purchase_ref = Some(purchase.purchase_ref.clone());
        self.tracking_id = Some(purchase.tracking_id.clone());
        self.label_url.clone_from(&purchase.label_url);
        self.cost = Some(purchase.cost);
        self.carrier = Some(purchase.carrier.clone());
        self.service_level = Some(purchase.service_level.clone());
        self.purchased_at = Some(at);
        self.updated_at = at;
    }
}

/// A staged shipment to insert as `Pending`.
#[derive(Debug, Clone)]
pub struct NewShipment {
    /// Pre-generated ID.
    pub id: ShipmentId,
    /// Owner.
    pub account_id: AccountId,
    /// Addresses and parcel.
    pub details: ShipmentDetails,
    /// Batch origin.
    pub batch: Option<BatchRowRef>,
}

/// Guarded status change applied together with ledger postings.
#[derive(Debug, Clone)]
pub struct ShipmentTransition {
    /// Shipment to update.
    pub shipment_id: ShipmentId,
    /// Status the shipment must currently have.
    pub from: ShipmentStatus,
    /// Status to set.
    pub to: ShipmentStatus,
    /// Carrier purchase fields to record.
    pub purchase: Option<LabelPurchase>,
    /// Carrier refund ID to record.
    pub refund_ref: Option<String>,
}

/// Filter for shipment listings.
#[derive(Debug, Clone, Default)]
pub struct ShipmentFilter {
    /// Restrict to these owners. `None` means no restriction.
    pub account_ids: Option<Vec<AccountId>>,
    /// Restrict to one status.
    pub status: Option<ShipmentStatus>,
    /// Restrict to one batch job.
    pub batch_job_id: Option<BatchJobId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn address(name: &str) -> Address {
        Address {
            name: name.to_string(),
            company: None,
            street1: "215 Clayton St".to_string(),
            street2: None,
            city: "San Francisco".to_string(),
            state: "CA".to_string(),
            zip: "94117".to_string(),
            country: "US".to_string(),
            phone: None,
            email: None,
        }
    }

    fn details() -> ShipmentDetails {
        ShipmentDetails {
            from_address: address("Warehouse"),
            to_address: address("Customer"),
            parcel: Parcel {
                length: dec!(10),
                width: dec!(8),
                height: dec!(4),
                distance_unit: DistanceUnit::In,
                weight: dec!(2),
                mass_unit: MassUnit::Lb,
            },
        }
    }

    #[test]
    fn test_valid_details() {
        assert!(details().validate().is_ok());
    }

    #[test]
    fn test_missing_fields_are_named() {
        let mut d = details();
        d.to_address.zip = "  ".to_string();
        d.from_address.city = String::new();
        let err = d.validate().unwrap_err();
        assert!(err.contains("from_city"));
        assert!(err.contains("to_zip"));
    }

    #[test]
    fn test_non_positive_parcel_rejected() {
        let mut d = details();
        d.parcel.weight = Decimal::ZERO;
        assert!(d.validate().unwrap_err().contains("weight"));
    }

    #[test]
    fn test_units_parse_case_insensitive() {
        assert_eq!("LB".parse::<MassUnit>().unwrap(), MassUnit::Lb);
        assert_eq!(" cm ".parse::<DistanceUnit>().unwrap(), DistanceUnit::Cm);
        assert!("stone".parse::<MassUnit>().is_err());
    }
}
