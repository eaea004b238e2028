use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Default minimum gap between two accepted scans.
pub const DEFAULT_SCAN_COOLDOWN_MS: u64 = 2000;

/// Decision for one offered scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Accepted,
    /// Inside the cooldown window of the last accepted scan
    CoolingDown,
    /// A resolution cycle is still running
    Paused,
}

/// Cooldown gate for scan events, measured on the monotonic clock.
///
/// Accepting a scan pauses the gate until [`ScanDebouncer::resume`] is called
/// at the end of the resolution cycle.
#[derive(Debug, Clone)]
pub struct ScanDebouncer {
    cooldown: Duration,
    last_accepted: Option<Instant>,
    paused: bool,
}

impl Default for ScanDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_SCAN_COOLDOWN_MS))
    }
}

impl ScanDebouncer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted: None,
            paused: false,
        }
    }

    /// Offers a scan received at `at`. An instant earlier than the last
    /// accepted scan (events delivered out of order) counts as inside the
    /// window.
    pub fn offer(&mut self, at: Instant) -> Gate {
        if self.paused {
            trace!("scan offered while paused");
            return Gate::Paused;
        }

        if let Some(last) = self.last_accepted {
            let elapsed = at.saturating_duration_since(last);
            if elapsed < self.cooldown {
                trace!(elapsed_ms = elapsed.as_millis() as u64, "scan inside cooldown");
                return Gate::CoolingDown;
            }
        }

        self.last_accepted = Some(at);
        self.paused = true;
        Gate::Accepted
    }

    /// Disables scanning without recording an accepted scan.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Re-enables scanning once a resolution cycle has completed or failed.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn last_accepted(&self) -> Option<Instant> {
        self.last_accepted
    }

    /// Forgets everything; used when the scanning view goes away.
    pub fn reset(&mut self) {
        self.last_accepted = None;
        self.paused = false;
    }
}
