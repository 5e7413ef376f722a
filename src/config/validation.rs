use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("upstream.base_url must be an http(s) URL, got: {0}")]
    InvalidBaseUrl(String),

    #[error("upstream.ws_url must be a ws(s) URL, got: {0}")]
    InvalidWsUrl(String),

    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },
}

/// Validate a loaded configuration.
///
/// Catches the mistakes that would otherwise surface as a silently dead
/// pump: empty or non-http base URLs and zero-length timers (a zero poll
/// interval would spin, a zero reconnect delay would hammer the backend).
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    let base = config.upstream.base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(ValidationError::InvalidBaseUrl(base.to_string()));
    }

    if let Some(ref ws) = config.upstream.ws_url {
        if !(ws.starts_with("ws://") || ws.starts_with("wss://")) {
            return Err(ValidationError::InvalidWsUrl(ws.clone()));
        }
    }

    for (field, value) in [
        ("pump.poll_interval_secs", config.pump.poll_interval_secs),
        ("pump.reconnect_delay_secs", config.pump.reconnect_delay_secs),
        (
            "pump.heartbeat_interval_secs",
            config.pump.heartbeat_interval_secs,
        ),
        (
            "upstream.connect_timeout_secs",
            config.upstream.connect_timeout_secs,
        ),
        (
            "upstream.request_timeout_secs",
            config.upstream.request_timeout_secs,
        ),
    ] {
        if value == 0 {
            return Err(ValidationError::ZeroInterval { field });
        }
    }

    Ok(())
}
