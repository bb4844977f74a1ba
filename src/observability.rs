use std::net::SocketAddr;

// ── Scheduling ──────────────────────────────────────────────────

/// Counter: allocation attempts. Labels: outcome (`allocated`, `no_bay`).
pub const ALLOCATIONS_TOTAL: &str = "baysched_allocations_total";

/// Counter: appointments whose bay was dropped after an edit left no free bay.
pub const ALLOCATIONS_RELEASED_TOTAL: &str = "baysched_allocations_released_total";

/// Counter: slot-capacity queries.
pub const SLOT_QUERIES_TOTAL: &str = "baysched_slot_queries_total";

/// Counter: slots rejected by the appointment-count pre-filter.
pub const SLOT_PREFILTER_REJECTS_TOTAL: &str = "baysched_slot_prefilter_rejects_total";

/// Histogram: free-bay resolution latency in seconds.
pub const FREE_BAYS_DURATION_SECONDS: &str = "baysched_free_bays_duration_seconds";

/// Counter: occupancy status changes outside the forward lifecycle.
pub const ILLEGAL_TRANSITIONS_TOTAL: &str = "baysched_illegal_transitions_total";

// ── Storage ─────────────────────────────────────────────────────

/// Counter: journal appends.
pub const JOURNAL_APPENDS_TOTAL: &str = "baysched_journal_appends_total";

/// Counter: journal compactions.
pub const JOURNAL_COMPACTIONS_TOTAL: &str = "baysched_journal_compactions_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
