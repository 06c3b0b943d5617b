use std::net::IpAddr;

use chrono::Utc;

/// Target used by the dedicated successful-query log stream, kept distinct
/// from the crate's general logging so an operator can route it to its own
/// sink (spec.md §1: "formatting, files, and rotation are delegated").
pub const QUERY_LOG_TARGET: &str = "query_log";

/// Emits one event per successful A/AAAA NOERROR response carrying at
/// least one address, per spec.md §6's successful-query log stream
/// contract. The core only emits the structured event; turning it into the
/// exact `{"datetime": ..., "domain": ..., "ip_address": [...]}` line is a
/// formatting concern for whatever subscriber layer is attached.
pub fn log_successful_query(domain: &str, addresses: &[IpAddr]) {
    let datetime = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    tracing::info!(
        target: QUERY_LOG_TARGET,
        datetime = %datetime,
        domain = %domain,
        ip_address = ?addresses,
    );
}
