//! Business metrics for the marketplace engine.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `nfticket_events_created_total` - Total events created
//! - `nfticket_tickets_minted_total` - Total tickets minted
//! - `nfticket_tickets_used_total` - Total tickets checked in
//! - `nfticket_listings_total{status}` - Listings by status (created, cancelled)
//! - `nfticket_resales_total` - Completed resales
//! - `nfticket_royalties_base_units_total` - Royalties paid to organizers, in base units
//! - `nfticket_commands_rejected_total{kind}` - Rejected commands by error kind
//!
//! ## Histograms
//! - `nfticket_ledger_submit_duration_seconds` - Time spent waiting on the ledger

use crate::error::ErrorKind;
use crate::types::Amount;
use metrics::{describe_counter, describe_histogram};

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!("nfticket_events_created_total", "Total number of events created");
    describe_counter!("nfticket_tickets_minted_total", "Total number of tickets minted");
    describe_counter!("nfticket_tickets_used_total", "Total number of tickets checked in");
    describe_counter!(
        "nfticket_listings_total",
        "Total number of resale listings by status (created, cancelled)"
    );
    describe_counter!("nfticket_resales_total", "Total number of completed resales");
    describe_counter!(
        "nfticket_royalties_base_units_total",
        "Total royalties credited to organizers, in base units"
    );
    describe_counter!(
        "nfticket_commands_rejected_total",
        "Total number of rejected commands by error kind"
    );
    describe_histogram!(
        "nfticket_ledger_submit_duration_seconds",
        "Time taken by the ledger to accept or reject a transaction"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record an event created.
pub fn record_event_created() {
    metrics::counter!("nfticket_events_created_total").increment(1);
}

/// Record a ticket minted.
pub fn record_ticket_minted() {
    metrics::counter!("nfticket_tickets_minted_total").increment(1);
}

/// Record a ticket checked in.
pub fn record_ticket_used() {
    metrics::counter!("nfticket_tickets_used_total").increment(1);
}

/// Record a listing created.
pub fn record_listing_created() {
    metrics::counter!("nfticket_listings_total", "status" => "created").increment(1);
}

/// Record a listing cancelled.
pub fn record_listing_cancelled() {
    metrics::counter!("nfticket_listings_total", "status" => "cancelled").increment(1);
}

/// Record a completed resale and the royalty it paid.
pub fn record_resale(royalty: Amount) {
    metrics::counter!("nfticket_resales_total").increment(1);
    // Counters are u64; clamp rather than wrap.
    let units = u64::try_from(royalty.base_units()).unwrap_or(u64::MAX);
    metrics::counter!("nfticket_royalties_base_units_total").increment(units);
    tracing::debug!(%royalty, "Recorded resale metric");
}

/// Record a rejected command.
pub fn record_rejected(kind: ErrorKind) {
    metrics::counter!("nfticket_commands_rejected_total", "kind" => kind.as_str()).increment(1);
}

/// Record how long a ledger submission took.
pub fn record_ledger_submit(duration_secs: f64) {
    metrics::histogram!("nfticket_ledger_submit_duration_seconds").record(duration_secs);
}
