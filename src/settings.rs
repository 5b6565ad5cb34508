//! User swap preferences, persisted to a small JSON file.

use crate::errors::{AppError, Result, SwapError};
use ethers::types::{U256, U512};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_SLIPPAGE_PERCENT: f64 = 0.5;
pub const MAX_SLIPPAGE_PERCENT: f64 = 50.0;
pub const DEFAULT_DEADLINE_SECS: u64 = 1200;
pub const MIN_DEADLINE_SECS: u64 = 60;
pub const MAX_DEADLINE_SECS: u64 = 86_400;

const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapSettings {
    pub slippage_percent: f64,
    pub deadline_secs: u64,
}

impl Default for SwapSettings {
    fn default() -> Self {
        Self {
            slippage_percent: DEFAULT_SLIPPAGE_PERCENT,
            deadline_secs: DEFAULT_DEADLINE_SECS,
        }
    }
}

impl SwapSettings {
    /// Read settings from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "[SETTINGS] no settings file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&raw)
            .map_err(|e| AppError::Settings(format!("{}: {e}", path.display())))?;
        validate_slippage(settings.slippage_percent)
            .map_err(|e| AppError::Settings(e.to_string()))?;
        validate_deadline(settings.deadline_secs)?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        info!(
            path = %path.display(),
            slippage = self.slippage_percent,
            deadline_secs = self.deadline_secs,
            "[SETTINGS] saved"
        );
        Ok(())
    }

    /// Update the tolerance; out-of-range values leave the current one in place.
    pub fn set_slippage(&mut self, percent: f64) -> std::result::Result<(), SwapError> {
        validate_slippage(percent)?;
        self.slippage_percent = percent;
        Ok(())
    }

    pub fn set_deadline_secs(&mut self, secs: u64) -> Result<()> {
        validate_deadline(secs)?;
        self.deadline_secs = secs;
        Ok(())
    }
}

pub fn validate_slippage(percent: f64) -> std::result::Result<(), SwapError> {
    if percent.is_finite() && (0.0..=MAX_SLIPPAGE_PERCENT).contains(&percent) {
        Ok(())
    } else {
        Err(SwapError::InvalidSlippage(percent))
    }
}

fn validate_deadline(secs: u64) -> Result<()> {
    if (MIN_DEADLINE_SECS..=MAX_DEADLINE_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(AppError::Settings(format!(
            "deadline {secs}s outside [{MIN_DEADLINE_SECS}, {MAX_DEADLINE_SECS}]"
        )))
    }
}

/// Slippage percent as whole basis points, rounded down.
pub fn slippage_bps(percent: f64) -> u64 {
    ((percent * 100.0).floor() as u64).min(BPS_DENOMINATOR)
}

/// Minimum acceptable output: `quoted * (10000 - floor(percent * 100)) / 10000`.
pub fn min_amount_out(quoted: U256, percent: f64) -> U256 {
    let keep = BPS_DENOMINATOR - slippage_bps(percent);
    let scaled = quoted.full_mul(U256::from(keep)) / U512::from(BPS_DENOMINATOR);
    // keep <= 10000, so the quotient never exceeds `quoted`
    U256::try_from(scaled).unwrap_or(quoted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_out_at_half_percent() {
        assert_eq!(min_amount_out(U256::from(1000u64), 0.5), U256::from(995u64));
    }

    #[test]
    fn min_out_never_exceeds_quote() {
        for pct in [0.0, 0.01, 0.1, 0.5, 1.0, 3.3, 12.0, 50.0] {
            for q in [0u64, 1, 7, 999, 1_000_000_007] {
                let quoted = U256::from(q);
                assert!(min_amount_out(quoted, pct) <= quoted);
            }
        }
        assert_eq!(min_amount_out(U256::from(1000u64), 0.0), U256::from(1000u64));
        assert_eq!(min_amount_out(U256::from(1000u64), 50.0), U256::from(500u64));
    }

    #[test]
    fn min_out_holds_for_huge_quotes() {
        for quoted in [U256::MAX, U256::MAX / 2, U256::MAX / 10_000 + 1] {
            for pct in [0.0, 0.5, 50.0] {
                assert!(min_amount_out(quoted, pct) <= quoted);
            }
        }
        assert_eq!(min_amount_out(U256::MAX, 0.0), U256::MAX);
        assert_eq!(min_amount_out(U256::MAX, 50.0), U256::MAX / 2);
    }

    #[test]
    fn fractional_bps_round_down() {
        // 0.555% -> 55 bps
        assert_eq!(slippage_bps(0.555), 55);
        assert_eq!(min_amount_out(U256::from(10_000u64), 0.555), U256::from(9_945u64));
    }

    #[test]
    fn out_of_range_slippage_keeps_previous() {
        let mut s = SwapSettings::default();
        s.set_slippage(1.0).unwrap();
        assert_eq!(s.set_slippage(50.5), Err(SwapError::InvalidSlippage(50.5)));
        assert!(s.set_slippage(-0.1).is_err());
        assert!(s.set_slippage(f64::NAN).is_err());
        assert_eq!(s.slippage_percent, 1.0);
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        assert_eq!(SwapSettings::load(&path).unwrap(), SwapSettings::default());

        let mut s = SwapSettings::default();
        s.set_slippage(2.5).unwrap();
        s.set_deadline_secs(600).unwrap();
        s.save(&path).unwrap();

        let loaded = SwapSettings::load(&path).unwrap();
        assert_eq!(loaded.slippage_percent, 2.5);
        assert_eq!(loaded.deadline_secs, 600);
    }

    #[test]
    fn rejects_tampered_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"slippage_percent": 75.0}"#).unwrap();
        assert!(matches!(SwapSettings::load(&path), Err(AppError::Settings(_))));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(SwapSettings::load(&path), Err(AppError::Settings(_))));
    }

    #[test]
    fn deadline_bounds() {
        let mut s = SwapSettings::default();
        assert!(s.set_deadline_secs(10).is_err());
        assert_eq!(s.deadline_secs, DEFAULT_DEADLINE_SECS);
    }
}
