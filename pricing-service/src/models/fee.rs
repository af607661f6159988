//! Dual-currency fee amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Largest USD amount accepted on any rule.
pub fn max_fee_usd() -> Decimal {
    Decimal::new(1_000_000, 0)
}

/// Largest LBP amount accepted on any rule.
pub const MAX_FEE_LBP: i64 = 1_000_000_000_000;

/// Decimal places the rule tables keep for USD amounts.
pub const MAX_FEE_USD_SCALE: u32 = 4;

/// A fee expressed in both currencies. The pair always travels together,
/// even when one side is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FeePair {
    pub usd: Decimal,
    pub lbp: i64,
}

impl FeePair {
    pub const ZERO: FeePair = FeePair {
        usd: Decimal::ZERO,
        lbp: 0,
    };

    pub fn new(usd: Decimal, lbp: i64) -> Self {
        Self { usd, lbp }
    }

    pub fn is_zero(&self) -> bool {
        self.usd.is_zero() && self.lbp == 0
    }

    /// Check the non-negativity and upper-bound constraints shared by all rules.
    pub fn check_bounds(&self) -> Result<(), String> {
        if self.usd < Decimal::ZERO {
            return Err(format!("fee_usd must be non-negative (got {})", self.usd));
        }
        if self.usd > max_fee_usd() {
            return Err(format!(
                "fee_usd must not exceed {} (got {})",
                max_fee_usd(),
                self.usd
            ));
        }
        if self.usd.normalize().scale() > MAX_FEE_USD_SCALE {
            return Err(format!(
                "fee_usd must have at most {} decimal places (got {})",
                MAX_FEE_USD_SCALE, self.usd
            ));
        }
        if self.lbp < 0 {
            return Err(format!("fee_lbp must be non-negative (got {})", self.lbp));
        }
        if self.lbp > MAX_FEE_LBP {
            return Err(format!(
                "fee_lbp must not exceed {} (got {})",
                MAX_FEE_LBP, self.lbp
            ));
        }
        Ok(())
    }
}

impl Add for FeePair {
    type Output = FeePair;

    fn add(self, rhs: FeePair) -> FeePair {
        FeePair {
            usd: self.usd + rhs.usd,
            lbp: self.lbp + rhs.lbp,
        }
    }
}

impl std::fmt::Display for FeePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} USD / {} LBP", self.usd, self.lbp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_exact_per_currency() {
        let base = FeePair::new(Decimal::new(300, 2), 100_000);
        let extra = FeePair::new(Decimal::new(100, 2), 20_000);
        let total = base + extra;
        assert_eq!(total.usd, Decimal::new(400, 2));
        assert_eq!(total.lbp, 120_000);
    }

    #[test]
    fn test_negative_fees_rejected() {
        assert!(FeePair::new(Decimal::new(-1, 2), 0).check_bounds().is_err());
        assert!(FeePair::new(Decimal::ZERO, -5).check_bounds().is_err());
    }

    #[test]
    fn test_usd_precision_limited_to_four_places() {
        assert!(FeePair::new(Decimal::new(12_345, 4), 0).check_bounds().is_ok());
        assert!(FeePair::new(Decimal::new(450_000, 5), 0).check_bounds().is_ok());
        assert!(FeePair::new(Decimal::new(123_456, 5), 0)
            .check_bounds()
            .is_err());
    }

    #[test]
    fn test_bounds_accept_zero_and_limits() {
        assert!(FeePair::ZERO.check_bounds().is_ok());
        assert!(FeePair::new(max_fee_usd(), MAX_FEE_LBP).check_bounds().is_ok());
        assert!(FeePair::new(max_fee_usd() + Decimal::ONE, 0)
            .check_bounds()
            .is_err());
    }
}
