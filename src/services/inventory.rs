use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, sync::Arc};
use tracing::{info, instrument, warn};

use crate::{
    catalog::CatalogClient,
    errors::InventoryError,
    models::{Product, ProductId, Stock},
    scan::PendingNewProduct,
    services::statistics::InventoryStats,
};

/// Field used to order the product list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Name,
    Price,
    /// Number of stock entries
    Stock,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Client-side search and ordering of the product list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl ProductQuery {
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        let mut products = match self.search.as_deref() {
            Some(term) => search_products(products, term),
            None => products,
        };
        sort_products(&mut products, self.sort, self.direction);
        products
    }
}

/// Keeps products whose name, type or supplier contains `term` (ignoring
/// case) or whose price contains it as text.
pub fn search_products(products: Vec<Product>, term: &str) -> Vec<Product> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return products;
    }

    products
        .into_iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.product_type.to_lowercase().contains(&needle)
                || p.supplier.to_lowercase().contains(&needle)
                || p.price.normalize().to_string().contains(&needle)
        })
        .collect()
}

/// Stable sort; equal keys keep their relative order in both directions.
pub fn sort_products(products: &mut [Product], field: SortField, direction: SortDirection) {
    let compare = |a: &Product, b: &Product| -> Ordering {
        match field {
            SortField::Name => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name)),
            SortField::Price => a.price.cmp(&b.price),
            SortField::Stock => a.stocks.len().cmp(&b.stocks.len()),
        }
    };

    match direction {
        SortDirection::Asc => products.sort_by(compare),
        SortDirection::Desc => products.sort_by(|a, b| compare(b, a)),
    }
}

/// Changes to an existing product. `None` keeps the current value; the
/// barcode is not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub product_type: Option<String>,
    pub price: Option<Decimal>,
    pub supplier: Option<String>,
    pub image: Option<String>,
    pub city: Option<String>,
}

/// List, edit and stock operations on top of the catalog client.
#[derive(Clone)]
pub struct InventoryService {
    catalog: Arc<dyn CatalogClient>,
}

impl InventoryService {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self { catalog }
    }

    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, InventoryError> {
        let products = self.catalog.list_products().await?;
        Ok(query.apply(products))
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, InventoryError> {
        self.catalog
            .get_product(id)
            .await?
            .ok_or_else(|| InventoryError::NotFound(id.clone()))
    }

    /// Creates a product from a completed form, optionally with one initial
    /// stock entry.
    #[instrument(skip(self, draft), fields(barcode = %draft.barcode()))]
    pub async fn create_product(
        &self,
        draft: &PendingNewProduct,
        initial_stock: Option<Stock>,
    ) -> Result<Product, InventoryError> {
        let mut body = draft.to_new_product(ProductId::generate(), chrono::Utc::now())?;
        if let Some(stock) = initial_stock {
            if stock.quantity < 0 {
                return Err(InventoryError::NegativeQuantity {
                    stock_id: stock.id,
                    quantity: stock.quantity,
                });
            }
            body.stocks.push(stock);
        }

        let product = self.catalog.create_product(&body).await?;
        info!(product_id = %product.id, "product created");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        update: ProductUpdate,
    ) -> Result<Product, InventoryError> {
        if update.price.map_or(false, |p| p.is_sign_negative()) {
            return Err(InventoryError::ValidationError(
                "price must not be negative".to_string(),
            ));
        }

        let mut product = self.get_product(id).await?;
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(product_type) = update.product_type {
            product.product_type = product_type;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(supplier) = update.supplier {
            product.supplier = supplier;
        }
        if let Some(image) = update.image {
            product.image = Some(image).filter(|i| !i.trim().is_empty());
        }
        if let Some(city) = update.city {
            product.city = city;
        }

        Ok(self.catalog.update_product(&product).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), InventoryError> {
        self.catalog.delete_product(id).await?;
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Adds `delta` (which may be negative) to one stock entry and commits
    /// the product. Nothing is written when the result would go below zero.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        product_id: &ProductId,
        stock_id: i64,
        delta: i64,
    ) -> Result<Product, InventoryError> {
        let mut product = self.get_product(product_id).await?;
        let stock = product
            .stocks
            .iter_mut()
            .find(|s| s.id == stock_id)
            .ok_or_else(|| InventoryError::UnknownStock {
                product: product_id.clone(),
                stock_id,
            })?;

        let quantity = stock.quantity.saturating_add(delta);
        if quantity < 0 {
            warn!(stock_id, quantity, "stock adjustment would go negative");
            return Err(InventoryError::NegativeQuantity { stock_id, quantity });
        }
        stock.quantity = quantity;

        let updated = self.catalog.update_product(&product).await?;
        info!(product_id = %product_id, stock_id, quantity, "stock adjusted");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn statistics(&self) -> Result<InventoryStats, InventoryError> {
        let products = self.catalog.list_products().await?;
        Ok(InventoryStats::compute(&products))
    }
}
