//! Per-job progress and ETA derivation.

use chrono::{DateTime, Duration, Utc};

use crate::adapter::NormalizedPlate;
use crate::engine::model::Metrics;

/// Compute metrics for one job's plates.
///
/// The ETA is the average of this job's own completed-plate durations
/// multiplied by the remaining count. Jobs with no valid duration sample
/// get no ETA at all; a job with everything done gets an ETA of zero,
/// not a missing one. `now` is passed in so a whole pipeline run shares
/// a single clock reading.
pub fn compute(plates: &[NormalizedPlate], now: DateTime<Utc>) -> Metrics {
    let plates_total = plates.len();
    let plates_printed = plates.iter().filter(|p| p.is_completed()).count();

    let progress_pct = if plates_total > 0 {
        let pct = (plates_printed as f64 / plates_total as f64) * 100.0;
        Some(pct.round() as u8)
    } else {
        None
    };

    let durations: Vec<f64> = plates.iter().filter_map(|p| p.duration_seconds()).collect();
    let avg_seconds = if durations.is_empty() {
        None
    } else {
        Some(durations.iter().sum::<f64>() / durations.len() as f64)
    };

    let remaining = plates_total.saturating_sub(plates_printed);
    let eta_seconds = avg_seconds.map(|avg| avg * remaining as f64);
    // garbage timestamps can produce spans past the representable date
    // range; an ETA date that far out is dropped, not panicked on
    let eta_at = eta_seconds.and_then(|eta| {
        now.checked_add_signed(Duration::milliseconds((eta * 1000.0).round() as i64))
    });

    Metrics {
        plates_total,
        plates_printed,
        progress_pct,
        avg_seconds,
        eta_seconds,
        eta_at,
    }
}
