use std::{sync::Arc, time::Duration};
use tracing::{debug, info, instrument, warn};

use super::{CatalogClient, ProductFilter};
use crate::{errors::CatalogError, models::Product, scan::barcode::Barcode};

/// Upper bound for one barcode lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a successful lookup round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(Product),
    NotFound,
}

/// Resolves a barcode to a catalog product.
#[derive(Clone)]
pub struct CatalogLookup {
    catalog: Arc<dyn CatalogClient>,
    timeout: Duration,
}

impl CatalogLookup {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self::with_timeout(catalog, DEFAULT_LOOKUP_TIMEOUT)
    }

    pub fn with_timeout(catalog: Arc<dyn CatalogClient>, timeout: Duration) -> Self {
        Self { catalog, timeout }
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogClient> {
        &self.catalog
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Queries the catalog filtered by `barcode` and keeps the first record
    /// whose barcode is an exact match. The whole call, including decoding,
    /// must finish within the lookup timeout.
    #[instrument(skip(self), fields(barcode = %barcode))]
    pub async fn lookup(&self, barcode: &Barcode) -> Result<LookupOutcome, CatalogError> {
        let filter = ProductFilter::by_barcode(barcode.as_str());
        let candidates = tokio::time::timeout(self.timeout, self.catalog.find_products(&filter))
            .await
            .map_err(|_| {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "lookup timed out");
                CatalogError::Timeout
            })??;

        debug!(candidates = candidates.len(), "lookup returned");
        match candidates
            .into_iter()
            .find(|p| p.barcode == barcode.as_str())
        {
            Some(product) => {
                info!(product_id = %product.id, "barcode matched");
                Ok(LookupOutcome::Found(product))
            }
            None => Ok(LookupOutcome::NotFound),
        }
    }
}
