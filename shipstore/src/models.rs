use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a record travels to the customer or back to the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    /// Path segment used by the warehouse APIs ("outbounds" / "inbounds").
    /// The same key names the list in search responses.
    pub fn plural(&self) -> &'static str {
        match self {
            Direction::Outbound => "outbounds",
            Direction::Inbound => "inbounds",
        }
    }

    /// Document collection backing this direction.
    pub fn collection(&self) -> &'static str {
        match self {
            Direction::Outbound => "outbound-records",
            Direction::Inbound => "inbound-records",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Outbound => write!(f, "outbound"),
            Direction::Inbound => write!(f, "inbound"),
        }
    }
}

/// Direction constraint on a search. Outbound is always probed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionFilter {
    Outbound,
    Inbound,
    Both,
}

impl DirectionFilter {
    pub fn directions(&self) -> &'static [Direction] {
        match self {
            DirectionFilter::Outbound => &[Direction::Outbound],
            DirectionFilter::Inbound => &[Direction::Inbound],
            DirectionFilter::Both => &[Direction::Outbound, Direction::Inbound],
        }
    }

    pub fn matches(&self, direction: Direction) -> bool {
        self.directions().contains(&direction)
    }
}

/// One order line on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub name: String,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

/// The canonical shipment/return entity.
///
/// Documents are stored with camelCase field names so the gateway's indexed
/// lookups (`storeOrderId`, `customerName`, `trackingNumber`, `channelId`)
/// address them directly. `id` is the shipment identifier: the vendor's
/// client-supplied order id when present, its internal id otherwise, never
/// empty. Vendor fields the normalizer does not recognize survive in
/// `extra` verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub direction: Direction,
    pub store: String,
    #[serde(default)]
    pub store_order_id: String,
    #[serde(default)]
    pub channel_id: String,
    pub ordered_at: DateTime<Utc>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub status: String,
    pub status_at: DateTime<Utc>,
    #[serde(default)]
    pub courier: String,
    #[serde(default)]
    pub tracking_number: String,
    #[serde(default)]
    pub tracking_url: String,
    #[serde(default)]
    pub address1: String,
    #[serde(default)]
    pub address2: String,
    #[serde(default)]
    pub suburb: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
