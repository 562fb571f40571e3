//! Batch row validation and parsing.
//!
//! Rows arrive already split into `column -> value` maps. The header is the
//! key set of the first row.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::types::RawRow;
use crate::shipment::{Address, DistanceUnit, MassUnit, Parcel, RateSelection, ShipmentDetails};

/// Largest number of rows accepted in one upload.
pub const MAX_BATCH_ROWS: usize = 5_000;

/// Columns every upload must carry.
pub const REQUIRED_COLUMNS: [&str; 18] = [
    "from_name",
    "from_street1",
    "from_city",
    "from_state",
    "from_zip",
    "from_country",
    "to_name",
    "to_street1",
    "to_city",
    "to_state",
    "to_zip",
    "to_country",
    "length",
    "width",
    "height",
    "distance_unit",
    "weight",
    "mass_unit",
];

/// Required columns absent from `header`, in canonical order.
#[must_use]
pub fn missing_columns(header: &RawRow) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|column| !header.contains_key(**column))
        .map(|column| (*column).to_string())
        .collect()
}

/// Turns a row into purchase inputs.
///
/// A `rate_ref` column selects a quoted rate; without it the carrier's
/// cheapest rate is used.
///
/// # Errors
///
/// Returns the message recorded in the batch error log.
pub fn parse_row(row: &RawRow) -> Result<(ShipmentDetails, RateSelection), String> {
    let details = ShipmentDetails {
        from_address: address(row, "from")?,
        to_address: address(row, "to")?,
        parcel: Parcel {
            length: decimal(row, "length")?,
            width: decimal(row, "width")?,
            height: decimal(row, "height")?,
            distance_unit: DistanceUnit::from_str(required(row, "distance_unit")?)?,
            weight: decimal(row, "weight")?,
            mass_unit: MassUnit::from_str(required(row, "mass_unit")?)?,
        },
    };
    details.validate()?;

    let rate = optional(row, "rate_ref").map_or(RateSelection::Cheapest, RateSelection::Quoted);
    Ok((details, rate))
}

fn required<'a>(row: &'a RawRow, column: &str) -> Result<&'a str, String> {
    row.get(column)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| format!("missing value for {column}"))
}

fn optional(row: &RawRow, column: &str) -> Option<String> {
    row.get(column)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

fn decimal(row: &RawRow, column: &str) -> Result<Decimal, String> {
    let raw = required(row, column)?;
    Decimal::from_str(raw).map_err(|_| format!("invalid number for {column}: '{raw}'"))
}

fn address(row: &RawRow, prefix: &str) -> Result<Address, String> {
    let field = |name: &str| required(row, &format!("{prefix}_{name}")).map(ToString::to_string);
    let extra = |name: &str| optional(row, &format!("{prefix}_{name}"));
    Ok(Address {
        name: field("name")?,
        company: extra("company"),
        street1: field("street1")?,
        street2: extra("street2"),
        city: field("city")?,
        state: field("state")?,
        zip: field("zip")?,
        country: field("country")?,
        phone: extra("phone"),
        email: extra("email"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::csv_row as sample_row;
    use rust_decimal_macros::dec;

    #[test]
    fn test_complete_header() {
        assert!(missing_columns(&sample_row()).is_empty());
    }

    #[test]
    fn test_missing_columns_listed() {
        let mut row = sample_row();
        row.remove("to_zip");
        row.remove("mass_unit");
        assert_eq!(missing_columns(&row), vec!["to_zip", "mass_unit"]);
    }

    #[test]
    fn test_parse_row() {
        let (details, rate) = parse_row(&sample_row()).unwrap();
        assert_eq!(details.to_address.street2, None);
        assert_eq!(details.parcel.weight, dec!(2.5));
        assert_eq!(details.parcel.mass_unit, MassUnit::Lb);
        assert_eq!(rate, RateSelection::Cheapest);
    }

    #[test]
    fn test_rate_ref_column_selects_quote() {
        let mut row = sample_row();
        row.insert("rate_ref".into(), " rate_abc ".into());
        let (_, rate) = parse_row(&row).unwrap();
        assert_eq!(rate, RateSelection::Quoted("rate_abc".into()));
    }

    #[test]
    fn test_row_level_failures() {
        let mut empty_city = sample_row();
        empty_city.insert("from_city".into(), "  ".into());
        assert_eq!(parse_row(&empty_city).unwrap_err(), "missing value for from_city");

        let mut bad_weight = sample_row();
        bad_weight.insert("weight".into(), "heavy".into());
        assert!(parse_row(&bad_weight).unwrap_err().contains("weight"));

        let mut zero_height = sample_row();
        zero_height.insert("height".into(), "0".into());
        assert!(parse_row(&zero_height).unwrap_err().contains("height"));

        let mut bad_unit = sample_row();
        bad_unit.insert("distance_unit".into(), "furlong".into());
        assert!(parse_row(&bad_unit).unwrap_err().contains("furlong"));
    }
}
