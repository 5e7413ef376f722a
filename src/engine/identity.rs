//! Work-order identity resolution.
//!
//! A ticket resolves to an order key when it carries a usable `nr_os`;
//! otherwise the ticket name becomes a deterministic synthetic key so the
//! job still renders and identical snapshots produce identical output.

use chrono::{DateTime, Datelike, Utc};

use crate::adapter::NormalizedTicket;
use crate::engine::model::JobKey;

/// Placeholder order numbers some upstream exports emit instead of null.
const INVALID_NR_OS: &[&str] = &["0", "00000"];

pub fn is_valid_nr_os(nr_os: &str) -> bool {
    !nr_os.is_empty() && !INVALID_NR_OS.contains(&nr_os)
}

/// Resolve the job key for a ticket.
///
/// Order of preference: explicit `nr_os`/`ano` fields, then numbers
/// recovered from the ticket name, then a synthetic key from the name.
/// A missing year is backfilled from the creation timestamp when there
/// is one.
pub fn resolve_ticket_identity(ticket: &NormalizedTicket) -> JobKey {
    let explicit = ticket
        .nr_os
        .as_deref()
        .filter(|nr| is_valid_nr_os(nr))
        .map(|nr| (nr.to_string(), ticket.ano.clone()));

    let inferred = explicit.or_else(|| infer_os_from_name(&ticket.name));

    match inferred {
        Some((nr_os, ano)) => JobKey::Os {
            nr_os,
            ano: ano.or_else(|| year_of(ticket.created_at)),
        },
        None => JobKey::Synthetic(ticket.name.clone()),
    }
}

/// Recover `(nr_os, ano)` from a ticket name.
///
/// Disabled: shop floor ticket names encode page ranges (`06558-06572`)
/// that are indistinguishable from order numbers, and guessing wrong
/// merges unrelated work orders. Kept as an explicit extension point.
pub fn infer_os_from_name(_name: &str) -> Option<(String, Option<String>)> {
    None
}

fn year_of(created_at: Option<DateTime<Utc>>) -> Option<String> {
    created_at.map(|dt| dt.year().to_string())
}
