use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::{
    barcode::Barcode,
    debounce::{Gate, ScanDebouncer},
    draft::{DraftEdit, PendingNewProduct},
    ScanEvent,
};
use crate::{
    catalog::{CatalogLookup, LookupOutcome},
    errors::{CatalogError, ScanError},
    models::{Product, ProductId},
};

/// Where the scanning view currently is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Scanning,
    Validating { raw: String },
    LookingUp { barcode: String },
    Found { product: Product },
    NotFound { draft: PendingNewProduct },
    Error { barcode: String, error: ScanError },
}

impl ScanState {
    pub fn name(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::Scanning => "scanning",
            ScanState::Validating { .. } => "validating",
            ScanState::LookingUp { .. } => "looking_up",
            ScanState::Found { .. } => "found",
            ScanState::NotFound { .. } => "not_found",
            ScanState::Error { .. } => "error",
        }
    }

    /// States that wait for the operator before scanning resumes.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanState::Found { .. } | ScanState::NotFound { .. } | ScanState::Error { .. }
        )
    }
}

/// What happened to one scan event.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// The scanning view is not active
    Ignored,
    /// Dropped by the cooldown or while a cycle is in progress
    Debounced,
    Rejected(ScanError),
    Found(Product),
    NotFound(PendingNewProduct),
    Failed(ScanError),
}

/// Drives one scanning session from raw scans to a resolved product.
///
/// The controller owns its debouncer and state; nothing is shared with
/// other sessions. At most one lookup runs at a time because every
/// operation takes `&mut self` and accepted scans pause the debouncer.
pub struct ScanController {
    lookup: CatalogLookup,
    debouncer: ScanDebouncer,
    state: ScanState,
    last_barcode: Option<Barcode>,
    observer: Option<watch::Sender<ScanState>>,
}

impl ScanController {
    pub fn new(lookup: CatalogLookup, cooldown: Duration) -> Self {
        Self {
            lookup,
            debouncer: ScanDebouncer::new(cooldown),
            state: ScanState::Idle,
            last_barcode: None,
            observer: None,
        }
    }

    /// Receiver that sees every state change, including the intermediate
    /// `Validating` and `LookingUp` states.
    pub fn subscribe(&mut self) -> watch::Receiver<ScanState> {
        match &self.observer {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = watch::channel(self.state.clone());
                self.observer = Some(tx);
                rx
            }
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Whether a scan offered now could pass the gate (cooldown aside).
    pub fn is_scanning_enabled(&self) -> bool {
        matches!(self.state, ScanState::Scanning | ScanState::Error { .. })
            && !self.debouncer.is_paused()
    }

    pub fn draft(&self) -> Option<&PendingNewProduct> {
        match &self.state {
            ScanState::NotFound { draft } => Some(draft),
            _ => None,
        }
    }

    fn transition(&mut self, next: ScanState) {
        debug!(from = self.state.name(), to = next.name(), "scan state change");
        if let Some(tx) = &self.observer {
            tx.send_replace(next.clone());
        }
        self.state = next;
    }

    /// The scanning view became active.
    pub fn activate(&mut self) {
        if matches!(self.state, ScanState::Idle) {
            self.debouncer.reset();
            self.transition(ScanState::Scanning);
        }
    }

    /// Processes one scan event. Issues exactly one lookup when the scan
    /// passes both the debouncer and the validator, and none otherwise.
    #[instrument(skip(self, event), fields(raw = %event.raw))]
    pub async fn handle_scan(&mut self, event: ScanEvent) -> ScanOutcome {
        if matches!(self.state, ScanState::Idle) {
            return ScanOutcome::Ignored;
        }

        match self.debouncer.offer(event.received) {
            Gate::Accepted => {}
            Gate::CoolingDown | Gate::Paused => return ScanOutcome::Debounced,
        }

        self.transition(ScanState::Validating {
            raw: event.raw.clone(),
        });

        match Barcode::parse(&event.raw) {
            Ok(barcode) => self.resolve(barcode).await,
            Err(err) => {
                info!("scan rejected");
                self.debouncer.resume();
                self.transition(ScanState::Scanning);
                ScanOutcome::Rejected(err)
            }
        }
    }

    /// Repeats the lookup that failed. Returns `None` unless the controller
    /// is showing a lookup error.
    pub async fn retry(&mut self) -> Option<ScanOutcome> {
        if !matches!(self.state, ScanState::Error { .. }) {
            return None;
        }
        let barcode = self.last_barcode.clone()?;

        self.debouncer.pause();
        Some(self.resolve(barcode).await)
    }

    async fn resolve(&mut self, barcode: Barcode) -> ScanOutcome {
        self.transition(ScanState::LookingUp {
            barcode: barcode.to_string(),
        });
        self.last_barcode = Some(barcode.clone());

        match self.lookup.lookup(&barcode).await {
            Ok(LookupOutcome::Found(product)) => {
                self.transition(ScanState::Found {
                    product: product.clone(),
                });
                ScanOutcome::Found(product)
            }
            Ok(LookupOutcome::NotFound) => {
                let draft = PendingNewProduct::for_barcode(&barcode);
                self.transition(ScanState::NotFound {
                    draft: draft.clone(),
                });
                ScanOutcome::NotFound(draft)
            }
            Err(err) => {
                let error = ScanError::from(err);
                warn!(error = %error, "lookup failed");
                self.debouncer.resume();
                self.transition(ScanState::Error {
                    barcode: barcode.to_string(),
                    error: error.clone(),
                });
                ScanOutcome::Failed(error)
            }
        }
    }

    /// Closes the product view, the creation form or the error and goes
    /// back to scanning.
    pub fn dismiss(&mut self) {
        if self.state.is_terminal() {
            self.debouncer.resume();
            self.transition(ScanState::Scanning);
        }
    }

    /// Discards the pending draft.
    pub fn cancel_form(&mut self) {
        if matches!(self.state, ScanState::NotFound { .. }) {
            self.dismiss();
        }
    }

    /// Applies an edit to the pending draft. Returns false when no form is open.
    pub fn edit_draft(&mut self, edit: DraftEdit) -> bool {
        let ScanState::NotFound { draft } = &mut self.state else {
            return false;
        };
        draft.apply(edit);
        if let Some(tx) = &self.observer {
            tx.send_replace(self.state.clone());
        }
        true
    }

    /// Submits the pending draft to the catalog.
    ///
    /// Returns `None` when no form is open. An incomplete draft is rejected
    /// without any network call; a failed create keeps the draft so it can
    /// be submitted again.
    #[instrument(skip(self))]
    pub async fn submit_draft(&mut self) -> Option<Result<Product, ScanError>> {
        let draft = self.draft()?;

        let body = match draft.to_new_product(ProductId::generate(), Utc::now()) {
            Ok(body) => body,
            Err(err) => {
                debug!(error = %err, "draft incomplete");
                return Some(Err(err));
            }
        };

        let created = tokio::time::timeout(
            self.lookup.timeout(),
            self.lookup.catalog().create_product(&body),
        )
        .await
        .unwrap_or(Err(CatalogError::Timeout));

        match created {
            Ok(product) => {
                info!(product_id = %product.id, barcode = %product.barcode, "product created from scan");
                self.debouncer.resume();
                self.transition(ScanState::Scanning);
                Some(Ok(product))
            }
            Err(err) => {
                warn!(error = %err, "product creation failed");
                Some(Err(err.into()))
            }
        }
    }

    /// The scanning view is going away.
    pub fn teardown(&mut self) {
        self.debouncer.reset();
        self.last_barcode = None;
        self.transition(ScanState::Idle);
    }
}
