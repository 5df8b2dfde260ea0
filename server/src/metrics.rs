//! Prometheus exporter and metric descriptions.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `ticketing.purchases` - Completed purchases
//! - `ticketing.purchases.rejected{kind}` - Failed purchases by error kind
//! - `ticketing.cancellations{initiator}` - Completed cancellations
//! - `ticketing.cancellations.rejected{kind}` - Failed cancellations by error kind
//! - `ticketing.transactions.retried{operation}` - Transaction attempts after the first
//! - `ticketing.notifications.failed` - Best-effort notifications that were dropped

use metrics::describe_counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder and start its scrape listener.
///
/// Must run inside a tokio runtime.
///
/// # Errors
///
/// Returns [`BuildError`] if a recorder is already installed or the
/// listener cannot bind.
pub fn install_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_metrics();
    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}

fn register_metrics() {
    describe_counter!("ticketing.purchases", "Completed ticket purchases");
    describe_counter!(
        "ticketing.purchases.rejected",
        "Failed ticket purchases by error kind"
    );
    describe_counter!(
        "ticketing.cancellations",
        "Completed ticket cancellations by initiator (owner, organizer)"
    );
    describe_counter!(
        "ticketing.cancellations.rejected",
        "Failed ticket cancellations by operation (cancel, cancel_as_organizer) and error kind"
    );
    describe_counter!(
        "ticketing.transactions.retried",
        "Transaction attempts beyond the first, by operation"
    );
    describe_counter!(
        "ticketing.notifications.failed",
        "Notifications dropped after a failed enqueue"
    );
}
