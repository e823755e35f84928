//! Vendor payload normalization.
//!
//! The warehouse services are inconsistent between endpoints: the same
//! logical field appears under different names, nested under different
//! sub-objects, sometimes as a number and sometimes as a string. Each
//! canonical attribute therefore resolves through an explicit ordered list
//! of candidate source keys, taking the first non-empty value. Nothing in
//! this module fails: an unparseable sub-structure degrades to an empty or
//! default value for that field only.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use shipstore::models::{Direction, Item, Record};

const UNKNOWN_STATUS: &str = "Unknown";

const IDENTITY_KEYS: &[&str] = &["clientId", "id"];
const ORDER_DATE_KEYS: &[&str] = &["orderDate", "captureDate", "createDate"];
const CHANNEL_KEYS: &[&str] = &["channelId", "channelOrderId"];
const EVENT_DESCRIPTION_KEYS: &[&str] = &["description", "eventDescription", "statusDescription"];
const EVENT_TIMESTAMP_KEYS: &[&str] = &["timestamp", "eventDate", "date"];
const DELIVERY_CONTAINER_KEYS: &[&str] = &["deliveryInfo", "deliveryAddress", "customer"];
const CUSTOMER_NAME_KEYS: &[&str] = &["customerName", "contactName", "name"];
const EMAIL_KEYS: &[&str] = &["email", "contactEmail", "emailAddress"];
const ADDRESS1_KEYS: &[&str] = &["addressLine1", "address1", "street"];
const ADDRESS2_KEYS: &[&str] = &["addressLine2", "address2", "complex"];
const SUBURB_KEYS: &[&str] = &["suburb", "area"];
const CITY_KEYS: &[&str] = &["city", "town"];
const POSTAL_CODE_KEYS: &[&str] = &["postalCode", "postCode", "zip"];
const COUNTRY_KEYS: &[&str] = &["country", "countryCode"];
const TRACKING_NUMBER_KEYS: &[&str] = &["trackingNo", "trackingNumber", "waybillNumber"];
const TRACKING_URL_KEYS: &[&str] = &["trackingURL", "trackingUrl"];
const ITEM_NAME_KEYS: &[&str] = &["description", "name", "itemDescription"];
const ITEM_SKU_KEYS: &[&str] = &["sku", "itemNo", "barcode"];
const ITEM_QTY_KEYS: &[&str] = &["qty", "quantity"];

/// Top-level keys the normalizer interprets. Everything else is preserved
/// verbatim in the record's extra-field bag.
const CONSUMED_KEYS: &[&str] = &[
    "clientId",
    "id",
    "channelId",
    "channelOrderId",
    "orderDate",
    "captureDate",
    "createDate",
    "status",
    "statusDescription",
    "events",
    "items",
    "deliveryInfo",
    "deliveryAddress",
    "customer",
    "courier",
    "courierName",
    "trackingNo",
    "trackingNumber",
    "waybillNumber",
    "trackingURL",
    "trackingUrl",
];

/// Convert one vendor-shaped payload into the canonical record.
pub fn normalize_record(raw: &Value, direction: Direction, store: &str) -> Record {
    let (status, status_at) = status_fields(raw);
    let ordered_at = timestamp_or_now(&first_scalar(raw, ORDER_DATE_KEYS));

    Record {
        id: first_scalar(raw, IDENTITY_KEYS),
        direction,
        store: store.to_string(),
        store_order_id: first_scalar(raw, &["id"]),
        channel_id: first_scalar(raw, CHANNEL_KEYS),
        ordered_at,
        customer_name: delivery_field(raw, CUSTOMER_NAME_KEYS),
        customer_email: delivery_field(raw, EMAIL_KEYS),
        status,
        status_at,
        courier: courier_name(raw),
        tracking_number: delivery_field(raw, TRACKING_NUMBER_KEYS),
        tracking_url: delivery_field(raw, TRACKING_URL_KEYS),
        address1: delivery_field(raw, ADDRESS1_KEYS),
        address2: delivery_field(raw, ADDRESS2_KEYS),
        suburb: delivery_field(raw, SUBURB_KEYS),
        city: delivery_field(raw, CITY_KEYS),
        postal_code: delivery_field(raw, POSTAL_CODE_KEYS),
        country: delivery_field(raw, COUNTRY_KEYS),
        items: map_items(raw),
        extra: extra_fields(raw),
        updated_at: None,
    }
}

/// Render a scalar JSON value as a trimmed string; null and compound
/// values render empty.
pub fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// First non-empty scalar among the candidate keys of one object.
pub fn first_scalar(container: &Value, keys: &[&str]) -> String {
    for key in keys {
        if let Some(value) = container.get(key) {
            let rendered = scalar_string(value);
            if !rendered.is_empty() {
                return rendered;
            }
        }
    }
    String::new()
}

/// Parse a compact `YYYYMMDD[HHMMSS]` stamp into a UTC instant. An
/// 8-character value is truncated to midnight UTC.
pub fn parse_compact_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match trimmed.len() {
        14 => NaiveDateTime::parse_from_str(trimmed, "%Y%m%d%H%M%S")
            .ok()
            .map(|dt| dt.and_utc()),
        8 => NaiveDate::parse_from_str(trimmed, "%Y%m%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc()),
        _ => None,
    }
}

/// Malformed or absent source timestamps fail soft to the current time:
/// a bad date must never block a record.
fn timestamp_or_now(input: &str) -> DateTime<Utc> {
    parse_compact_timestamp(input).unwrap_or_else(Utc::now)
}

fn event_timestamp_raw(event: &Value) -> Option<String> {
    let raw = first_scalar(event, EVENT_TIMESTAMP_KEYS);
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

/// The event with the numerically greatest timestamp. Strictly-greater
/// wins, so the first-seen event is kept on a tie.
fn latest_event(raw: &Value) -> Option<(&Value, String)> {
    let events = raw.get("events")?.as_array()?;
    let mut best: Option<(&Value, String, i64)> = None;
    for event in events {
        let Some(ts_raw) = event_timestamp_raw(event) else {
            continue;
        };
        let Ok(ts) = ts_raw.parse::<i64>() else {
            continue;
        };
        let replace = match &best {
            None => true,
            Some((_, _, best_ts)) => ts > *best_ts,
        };
        if replace {
            best = Some((event, ts_raw, ts));
        }
    }
    best.map(|(event, ts_raw, _)| (event, ts_raw))
}

fn fallback_status(raw: &Value) -> String {
    let direct = first_scalar(raw, &["statusDescription"]);
    if !direct.is_empty() {
        return direct;
    }
    let status = match raw.get("status") {
        Some(value @ Value::Object(_)) => first_scalar(value, &["description", "name"]),
        Some(other) => scalar_string(other),
        None => String::new(),
    };
    if status.is_empty() {
        UNKNOWN_STATUS.to_string()
    } else {
        status
    }
}

fn status_fields(raw: &Value) -> (String, DateTime<Utc>) {
    if let Some((event, ts_raw)) = latest_event(raw) {
        let description = first_scalar(event, EVENT_DESCRIPTION_KEYS);
        let status = if description.is_empty() {
            fallback_status(raw)
        } else {
            description
        };
        return (status, timestamp_or_now(&ts_raw));
    }
    (fallback_status(raw), Utc::now())
}

/// Resolve a field that some endpoints nest under a delivery-info
/// sub-object and others inline at the top level.
fn delivery_field(raw: &Value, keys: &[&str]) -> String {
    for container in DELIVERY_CONTAINER_KEYS {
        if let Some(inner) = raw.get(container) {
            let value = first_scalar(inner, keys);
            if !value.is_empty() {
                return value;
            }
        }
    }
    first_scalar(raw, keys)
}

fn courier_name(raw: &Value) -> String {
    let direct = first_scalar(raw, &["courierName"]);
    if !direct.is_empty() {
        return direct;
    }
    match raw.get("courier") {
        Some(value @ Value::Object(_)) => first_scalar(value, &["name", "description"]),
        Some(other) => scalar_string(other),
        None => String::new(),
    }
}

fn map_items(raw: &Value) -> Vec<Item> {
    let Some(list) = raw.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };
    list.iter()
        .map(|entry| {
            let sku = first_scalar(entry, ITEM_SKU_KEYS);
            Item {
                name: first_scalar(entry, ITEM_NAME_KEYS),
                quantity: first_scalar(entry, ITEM_QTY_KEYS).parse().unwrap_or(0),
                sku: (!sku.is_empty()).then_some(sku),
            }
        })
        .collect()
}

fn extra_fields(raw: &Value) -> BTreeMap<String, String> {
    let mut extra = BTreeMap::new();
    let Some(object) = raw.as_object() else {
        return extra;
    };
    for (key, value) in object {
        if CONSUMED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let rendered = match value {
            Value::Object(_) | Value::Array(_) => {
                serde_json::to_string(value).unwrap_or_default()
            }
            scalar => scalar_string(scalar),
        };
        extra.insert(key.clone(), rendered);
    }
    extra
}
