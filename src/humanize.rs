//! Human-readable duration formatting for the rendering layer

/// Format a duration in seconds the way the operator displays expect:
/// `"2h 15m"`, `"3m 40s"`, `"12s"`. Sub-second values round to `"0s"`.
///
/// Negative inputs are clamped to zero rather than formatted; a negative
/// elapsed time only ever comes from clock skew upstream.
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "—".to_string();
    }
    let s = seconds.round().max(0.0) as u64;
    let h = s / 3600;
    let m = (s % 3600) / 60;
    let rem = s % 60;

    let mut parts = Vec::new();
    if h > 0 {
        parts.push(format!("{h}h"));
    }
    if m > 0 {
        parts.push(format!("{m}m"));
    }
    if h == 0 && rem > 0 {
        parts.push(format!("{rem}s"));
    }

    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}
