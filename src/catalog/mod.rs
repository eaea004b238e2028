/*!
 * # Product Catalog
 *
 * Client side of the remote product catalog. The catalog is a plain REST
 * resource (`/products`) backed by a JSON file on the server; this module
 * only knows how to read and write it.
 */

use async_trait::async_trait;

use crate::{
    errors::CatalogError,
    models::{NewProduct, Product, ProductId},
};

pub mod http;
pub mod lookup;

pub use http::HttpCatalogClient;
pub use lookup::{CatalogLookup, LookupOutcome, DEFAULT_LOOKUP_TIMEOUT};

/// Server-side filter for product reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub barcode: Option<String>,
    pub supplier: Option<String>,
    pub product_type: Option<String>,
}

impl ProductFilter {
    pub fn by_barcode(barcode: impl Into<String>) -> Self {
        Self {
            barcode: Some(barcode.into()),
            ..Self::default()
        }
    }

    /// Query pairs in wire naming.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        if let Some(barcode) = &self.barcode {
            pairs.push(("barcode", barcode.as_str()));
        }
        if let Some(supplier) = &self.supplier {
            pairs.push(("supplier", supplier.as_str()));
        }
        if let Some(product_type) = &self.product_type {
            pairs.push(("type", product_type.as_str()));
        }
        pairs
    }

    /// Client-side counterpart of the server filter.
    pub fn matches(&self, product: &Product) -> bool {
        self.barcode.as_deref().map_or(true, |b| product.barcode == b)
            && self.supplier.as_deref().map_or(true, |s| product.supplier == s)
            && self
                .product_type
                .as_deref()
                .map_or(true, |t| product.product_type == t)
    }
}

/// Operations against the remote catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError>;
    async fn find_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError>;
    /// `Ok(None)` when the catalog has no record with that id.
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;
    async fn create_product(&self, product: &NewProduct) -> Result<Product, CatalogError>;
    async fn update_product(&self, product: &Product) -> Result<Product, CatalogError>;
    async fn delete_product(&self, id: &ProductId) -> Result<(), CatalogError>;
}
