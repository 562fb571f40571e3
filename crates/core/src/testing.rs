//! Shared fixtures for unit tests.

use std::sync::Arc;

use rust_decimal_macros::dec;

use crate::access::Role;
use crate::batch::RawRow;
use crate::account::Account;
use crate::ledger::Ledger;
use crate::memory::{MemoryCarrier, MemoryStore};
use crate::shipment::{
    Address, DistanceUnit, MassUnit, Parcel, PurchaseRequest, RateSelection, ShipmentDetails,
    ShipmentLifecycle,
};

pub fn address(name: &str, zip: &str) -> Address {
    Address {
        name: name.to_string(),
        company: None,
        street1: "215 Clayton St".to_string(),
        street2: None,
        city: "San Francisco".to_string(),
        state: "CA".to_string(),
        zip: zip.to_string(),
        country: "US".to_string(),
        phone: None,
        email: None,
    }
}

pub fn details() -> ShipmentDetails {
    ShipmentDetails {
        from_address: address("Shippo Warehouse", "94117"),
        to_address: address("Mr Hippo", "94105"),
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

pub fn quoted(rate_ref: &str) -> PurchaseRequest {
    PurchaseRequest {
        details: details(),
        rate: RateSelection::Quoted(rate_ref.to_string()),
        batch: None,
    }
}

pub fn csv_row() -> RawRow {
    [
        ("from_name", "Warehouse"),
        ("from_street1", "215 Clayton St"),
        ("from_city", "San Francisco"),
        ("from_state", "CA"),
        ("from_zip", "94117"),
        ("from_country", "US"),
        ("to_name", "Mr Hippo"),
        ("to_street1", "965 Mission St"),
        ("to_street2", ""),
        ("to_city", "San Francisco"),
        ("to_state", "CA"),
        ("to_zip", "94105"),
        ("to_country", "US"),
        ("length", "10"),
        ("width", "8"),
        ("height", "4"),
        ("distance_unit", "in"),
        ("weight", "2.5"),
        ("mass_unit", "lb"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub struct World {
    pub store: Arc<MemoryStore>,
    pub carrier: Arc<MemoryCarrier>,
    pub ledger: Arc<Ledger<MemoryStore>>,
    pub lifecycle: Arc<ShipmentLifecycle<MemoryStore>>,
    pub admin: Account,
    pub reseller: Account,
    pub user: Account,
}

pub fn world_with(carrier: MemoryCarrier) -> World {
    let store = Arc::new(MemoryStore::new());
    let carrier = Arc::new(carrier);
    let ledger = Arc::new(Ledger::new(Arc::clone(&store)));
    let lifecycle = Arc::new(ShipmentLifecycle::new(
        Arc::clone(&store),
        Arc::clone(&ledger),
        carrier.clone(),
    ));
    let admin = store.seed_account(Role::Admin, None);
    let reseller = store.seed_account(Role::Reseller, Some(admin.id));
    let user = store.seed_account(Role::User, Some(reseller.id));
    World {
        store,
        carrier,
        ledger,
        lifecycle,
        admin,
        reseller,
        user,
    }
}

pub fn world() -> World {
    world_with(MemoryCarrier::new())
}
