//! Miscellaneous helper utilities.

use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize `tracing` subscriber with env-based filter.
///
/// If `RUST_LOG` is not set, defaults to `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Current wall-clock time in unix seconds.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Shorten an address or hash for log lines, e.g. `0x10ed…024e`.
pub fn short_hex(value: &str) -> String {
    if value.len() <= 12 {
        return value.to_string();
    }
    format!("{}…{}", &value[..6], &value[value.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_after_2020() {
        assert!(now_unix() > 1_577_836_800);
    }

    #[test]
    fn shortens_long_hex() {
        assert_eq!(
            short_hex("0x10ED43C718714eb63d5aA57B78B54704E256024E"),
            "0x10ED…024E"
        );
        assert_eq!(short_hex("0xabc"), "0xabc");
    }
}
