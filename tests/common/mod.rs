#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, OnceLock,
};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use inventory_scan::{
    catalog::{CatalogClient, CatalogLookup, ProductFilter},
    errors::CatalogError,
    models::{NewProduct, Product, ProductId, RecordExtras, Stock, UNKNOWN_CITY},
    scan::{ScanController, ScanEvent},
};
use rust_decimal::Decimal;
use tokio::time::Instant;

pub const COOLDOWN: Duration = Duration::from_millis(2000);
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory catalog with call counters, an optional response delay and
/// failure injection.
#[derive(Default)]
pub struct FakeCatalog {
    products: Mutex<Vec<Product>>,
    created: Mutex<Vec<NewProduct>>,
    delay: Mutex<Option<Duration>>,
    failure: Mutex<Option<CatalogError>>,
    find_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(products: Vec<Product>) -> Arc<Self> {
        Arc::new(Self {
            products: Mutex::new(products),
            ..Self::default()
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }

    /// Every call sleeps this long before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Every call fails with `failure` until cleared.
    pub fn set_failure(&self, failure: Option<CatalogError>) {
        *self.failure.lock().unwrap() = failure;
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> Vec<NewProduct> {
        self.created.lock().unwrap().clone()
    }

    pub fn products(&self) -> Vec<Product> {
        self.products.lock().unwrap().clone()
    }

    async fn respond(&self) -> Result<(), CatalogError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.respond().await?;
        Ok(self.products())
    }

    async fn find_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(self
            .products()
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect())
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(self.products().into_iter().find(|p| &p.id == id))
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, CatalogError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        self.created.lock().unwrap().push(product.clone());

        let created = Product {
            id: product.id.clone(),
            name: product.name.clone(),
            product_type: product.product_type.clone(),
            barcode: product.barcode.clone(),
            price: product.price,
            supplier: product.supplier.clone(),
            image: product.image.clone(),
            stocks: product.stocks.clone(),
            city: UNKNOWN_CITY.to_string(),
            created_at: Some(product.created_at),
            extras: RecordExtras {
                city_defaulted: true,
                ..RecordExtras::default()
            },
        };
        self.products.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_product(&self, product: &Product) -> Result<Product, CatalogError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        let mut products = self.products.lock().unwrap();
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(product.clone())
            }
            None => Err(CatalogError::Status {
                status: 404,
                body: String::new(),
            }),
        }
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), CatalogError> {
        self.respond().await?;
        self.products.lock().unwrap().retain(|p| &p.id != id);
        Ok(())
    }
}

pub fn product(id: i64, name: &str, barcode: &str, price: Decimal) -> Product {
    Product {
        id: ProductId::Number(id),
        name: name.to_string(),
        product_type: "Tools".to_string(),
        barcode: barcode.to_string(),
        price,
        supplier: "Acme".to_string(),
        image: None,
        stocks: vec![Stock::new(1, 4, "Main")],
        city: "Rabat".to_string(),
        created_at: None,
        extras: RecordExtras::default(),
    }
}

pub fn controller(catalog: Arc<FakeCatalog>) -> ScanController {
    let lookup = CatalogLookup::with_timeout(catalog, LOOKUP_TIMEOUT);
    let mut controller = ScanController::new(lookup, COOLDOWN);
    controller.activate();
    controller
}

/// Fixed wall-clock base for scan timestamps.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

static BASE: OnceLock<std::time::Instant> = OnceLock::new();

/// Monotonic instant `offset_ms` after a base shared by the test binary.
pub fn received(offset_ms: u64) -> Instant {
    Instant::from_std(*BASE.get_or_init(std::time::Instant::now)) + Duration::from_millis(offset_ms)
}

/// Scan whose wall-clock and monotonic stamps both sit `offset_ms` after
/// their bases.
pub fn scan_at(raw: impl Into<String>, offset_ms: u64) -> ScanEvent {
    let at = t0() + chrono::Duration::milliseconds(offset_ms as i64);
    ScanEvent::new(raw, at, received(offset_ms))
}
