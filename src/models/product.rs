use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// City recorded for products whose catalog entry carries none.
pub const UNKNOWN_CITY: &str = "Unknown";

/// Catalog identifier.
///
/// Older catalog records carry numeric ids while records created by this
/// client carry UUID strings; both shapes are accepted on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Number(i64),
    Text(String),
}

impl ProductId {
    /// Generates a fresh identifier for a product about to be created.
    pub fn generate() -> Self {
        ProductId::Text(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Number(n) => write!(f, "{}", n),
            ProductId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ProductId {
    fn from(value: i64) -> Self {
        ProductId::Number(value)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        match value.parse::<i64>() {
            Ok(n) => ProductId::Number(n),
            Err(_) => ProductId::Text(value.to_string()),
        }
    }
}

/// Stock held for a product at one warehouse or location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quantity: i64,
    /// Warehouse or location name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Keys this crate does not model, written back untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Stock {
    pub fn new(id: i64, quantity: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            quantity,
            name: name.into(),
            extra: Map::new(),
        }
    }
}

/// What a product's catalog record held beyond the modelled fields.
///
/// Updates are sent as the full record, so anything the catalog stored
/// that this crate does not understand must survive the round trip, and
/// values filled in only for display must not be written back.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordExtras {
    /// Unknown top-level keys, e.g. `editedBy`
    pub fields: Map<String, Value>,
    /// The record had no (or a blank) city
    pub city_defaulted: bool,
    /// The record had no stock list
    pub stocks_defaulted: bool,
}

/// A product as exposed to the rest of the crate.
///
/// Optional catalog fields have already been defaulted by the time a
/// `Product` exists: `stocks` is never missing and `city` is never empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub barcode: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub supplier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub stocks: Vec<Stock>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub extras: RecordExtras,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        !self.stocks.is_empty()
    }

    /// Total units across every stock entry.
    pub fn total_quantity(&self) -> i64 {
        self.stocks.iter().map(|s| s.quantity).sum()
    }

    pub fn stock(&self, stock_id: i64) -> Option<&Stock> {
        self.stocks.iter().find(|s| s.id == stock_id)
    }
}

/// Raw catalog record. Only used while decoding responses.
///
/// Older records may carry `null` where a value is expected (a price that
/// failed to parse is stored as `null`), so scalar fields accept it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductRecord {
    id: ProductId,
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    product_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    barcode: String,
    #[serde(default, deserialize_with = "null_as_default")]
    price: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    supplier: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    stocks: Option<Vec<Stock>>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<ProductRecord> for Product {
    fn from(record: ProductRecord) -> Self {
        let city = record.city.filter(|c| !c.trim().is_empty());
        let extras = RecordExtras {
            fields: record.extra,
            city_defaulted: city.is_none(),
            stocks_defaulted: record.stocks.is_none(),
        };

        Self {
            id: record.id,
            name: record.name,
            product_type: record.product_type,
            barcode: record.barcode,
            price: record.price,
            supplier: record.supplier,
            image: record.image.filter(|i| !i.is_empty()),
            stocks: record.stocks.unwrap_or_default(),
            city: city.unwrap_or_else(|| UNKNOWN_CITY.to_string()),
            created_at: record.created_at,
            extras,
        }
    }
}

/// Body of an update request: the stored record with local edits applied.
///
/// Display defaults are left out unless the value was changed and unknown
/// keys are carried back as they were read.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecordBody<'a> {
    id: &'a ProductId,
    name: &'a str,
    #[serde(rename = "type")]
    product_type: &'a str,
    barcode: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
    supplier: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stocks: Option<&'a [Stock]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

impl<'a> From<&'a Product> for RecordBody<'a> {
    fn from(product: &'a Product) -> Self {
        let extras = &product.extras;
        let city = (!extras.city_defaulted || product.city != UNKNOWN_CITY)
            .then_some(product.city.as_str());
        let stocks = (!extras.stocks_defaulted || !product.stocks.is_empty())
            .then_some(product.stocks.as_slice());

        Self {
            id: &product.id,
            name: &product.name,
            product_type: &product.product_type,
            barcode: &product.barcode,
            price: product.price,
            supplier: &product.supplier,
            image: product.image.as_deref(),
            stocks,
            city,
            created_at: product.created_at,
            extra: &extras.fields,
        }
    }
}

/// Body of a create request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub barcode: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub supplier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub stocks: Vec<Stock>,
    pub created_at: DateTime<Utc>,
}
