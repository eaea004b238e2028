/*!
 * # Barcode Scan Resolution
 *
 * Turns raw camera decodes into either an existing catalog product or a
 * draft for a new one:
 *
 * scan event → [`debounce`] → [`barcode`] validation → catalog lookup →
 * `Found` / `NotFound` / `Error`.
 */

use chrono::{DateTime, Utc};
use tokio::time::Instant;

pub mod barcode;
pub mod controller;
pub mod debounce;
pub mod draft;
pub mod session;

pub use barcode::{validate_barcode, Barcode, Symbology};
pub use controller::{ScanController, ScanOutcome, ScanState};
pub use debounce::{Gate, ScanDebouncer, DEFAULT_SCAN_COOLDOWN_MS};
pub use draft::{DraftEdit, PendingNewProduct};
pub use session::{ScanSession, SessionClosed};

/// One decoded scan as delivered by the camera.
///
/// `at` is the wall-clock stamp shown to the operator; the cooldown is
/// measured on the monotonic `received` instant so clock steps cannot
/// block scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub raw: String,
    pub at: DateTime<Utc>,
    pub received: Instant,
}

impl ScanEvent {
    pub fn new(raw: impl Into<String>, at: DateTime<Utc>, received: Instant) -> Self {
        Self {
            raw: raw.into(),
            at,
            received,
        }
    }

    /// Event stamped with the current time.
    pub fn now(raw: impl Into<String>) -> Self {
        Self::new(raw, Utc::now(), Instant::now())
    }
}
