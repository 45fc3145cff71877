//! Bounded discovery scans over point lookups.
//!
//! Ids are dense but records may be missing or inactive, so a scan probes
//! every id in range and never stops at the first miss. A probe ceiling bounds
//! the work of a single scan; a scan that hits it reports where it stopped so
//! the caller can page.

use crate::types::{Event, EventId, Listing, TokenId};
use serde::{Deserialize, Serialize};

/// Probes allowed per scan unless configured otherwise.
pub const DEFAULT_SCAN_CEILING: u64 = 1000;

/// Point lookups a scan is built from.
pub trait PointLookup {
    /// The event with this id, active or not.
    fn event(&self, event_id: EventId) -> Option<&Event>;

    /// The token's active listing, if any.
    fn active_listing_for(&self, token_id: TokenId) -> Option<&Listing>;
}

/// Items found by one scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult<T> {
    /// Matches in id order
    pub items: Vec<T>,
    /// Last id probed, `None` if nothing was probed
    pub last_probed: Option<u64>,
    /// Whether the ceiling stopped the scan before the end of the range
    pub truncated: bool,
}

impl<T> ScanResult<T> {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            last_probed: None,
            truncated: false,
        }
    }

    /// Where to resume a truncated scan.
    #[must_use]
    pub fn next_from(&self) -> Option<u64> {
        if self.truncated {
            self.last_probed.map(|id| id.saturating_add(1))
        } else {
            None
        }
    }
}

/// Linear prober with a hard ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscoveryScanner {
    ceiling: u64,
}

impl Default for DiscoveryScanner {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_CEILING)
    }
}

impl DiscoveryScanner {
    /// Creates a scanner that probes at most `ceiling` ids per scan
    #[must_use]
    pub const fn new(ceiling: u64) -> Self {
        Self { ceiling }
    }

    /// Probe budget per scan.
    #[must_use]
    pub const fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Active events with ids in `from..=to`.
    #[must_use]
    pub fn scan_events<L: PointLookup + ?Sized>(&self, lookup: &L, from: u64, to: u64) -> ScanResult<Event> {
        self.probe(from, to, |id| {
            lookup
                .event(EventId::new(id))
                .filter(|event| event.is_active)
                .cloned()
        })
    }

    /// Active listings for token ids `1..=max_token_id`.
    #[must_use]
    pub fn scan_listings<L: PointLookup + ?Sized>(&self, lookup: &L, max_token_id: u64) -> ScanResult<Listing> {
        self.probe(1, max_token_id, |id| {
            lookup.active_listing_for(TokenId::new(id)).cloned()
        })
    }

    fn probe<T>(&self, from: u64, to: u64, mut lookup: impl FnMut(u64) -> Option<T>) -> ScanResult<T> {
        let mut result = ScanResult::empty();
        if from > to {
            return result;
        }

        let mut probes = 0;
        for id in from..=to {
            if probes == self.ceiling {
                result.truncated = true;
                break;
            }
            probes += 1;
            result.last_probed = Some(id);
            if let Some(item) = lookup(id) {
                result.items.push(item);
            }
        }

        tracing::debug!(
            from,
            to,
            probes,
            found = result.items.len(),
            truncated = result.truncated,
            "Discovery scan finished"
        );
        result
    }
}
