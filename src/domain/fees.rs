//! Trading fee records and the injectable fee schedule.
//!
//! Fees are carved out of every CPMM purchase before the curve update;
//! DPM markets instead deduct a fee from realized profit at resolution.
//! The exact split between liquidity providers, the platform, and the
//! market creator is a policy choice, so the fractions live in
//! [`FeeSchedule`] and are loaded from configuration rather than
//! hardcoded in the math.

use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Additive fee record attached to bets and contracts.
///
/// Combines component-wise; [`Fees::default`] is the zero identity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fees {
    /// Fee returned to the liquidity pool.
    pub liquidity_fee: f64,
    /// Fee retained by the platform.
    pub platform_fee: f64,
    /// Fee owed to the market creator.
    pub creator_fee: f64,
}

impl Fees {
    /// Sum of all components.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.liquidity_fee + self.platform_fee + self.creator_fee
    }
}

impl Add for Fees {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            liquidity_fee: self.liquidity_fee + rhs.liquidity_fee,
            platform_fee: self.platform_fee + rhs.platform_fee,
            creator_fee: self.creator_fee + rhs.creator_fee,
        }
    }
}

impl AddAssign for Fees {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Fee fractions applied by the pricing and payout components.
///
/// CPMM fractions are taken per trade against the price of the side
/// the buyer is taking from; DPM fractions are taken against realized
/// profit at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// CPMM per-trade fraction returned to the pool as liquidity.
    pub cpmm_liquidity_fraction: f64,
    /// CPMM per-trade fraction retained by the platform.
    pub cpmm_platform_fraction: f64,
    /// CPMM per-trade fraction owed to the creator.
    pub cpmm_creator_fraction: f64,
    /// DPM fraction of profit retained by the platform at resolution.
    pub dpm_platform_fraction: f64,
    /// DPM fraction of profit owed to the creator at resolution.
    pub dpm_creator_fraction: f64,
}

impl FeeSchedule {
    /// A schedule with every fraction zero. Used by conservation tests.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            cpmm_liquidity_fraction: 0.0,
            cpmm_platform_fraction: 0.0,
            cpmm_creator_fraction: 0.0,
            dpm_platform_fraction: 0.0,
            dpm_creator_fraction: 0.0,
        }
    }

    /// Total DPM fee fraction deducted from profit.
    #[must_use]
    pub fn dpm_fee_total(&self) -> f64 {
        self.dpm_platform_fraction + self.dpm_creator_fraction
    }
}

impl Default for FeeSchedule {
    /// Documented defaults: 2% liquidity / 3% platform / 5% creator on
    /// the taken side of CPMM trades, 1% platform / 4% creator on DPM
    /// profit.
    fn default() -> Self {
        Self {
            cpmm_liquidity_fraction: 0.02,
            cpmm_platform_fraction: 0.03,
            cpmm_creator_fraction: 0.05,
            dpm_platform_fraction: 0.01,
            dpm_creator_fraction: 0.04,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_identity() {
        let fees = Fees {
            liquidity_fee: 1.0,
            platform_fee: 2.0,
            creator_fee: 3.0,
        };
        assert_eq!(fees + Fees::default(), fees);
        assert_eq!(fees.total(), 6.0);
    }

    #[test]
    fn test_componentwise_addition() {
        let a = Fees {
            liquidity_fee: 0.5,
            platform_fee: 0.25,
            creator_fee: 0.0,
        };
        let mut b = Fees {
            liquidity_fee: 0.5,
            platform_fee: 0.75,
            creator_fee: 1.0,
        };
        b += a;
        assert_eq!(b.liquidity_fee, 1.0);
        assert_eq!(b.platform_fee, 1.0);
        assert_eq!(b.creator_fee, 1.0);
    }

    #[test]
    fn test_default_schedule_fractions_sum_below_one() {
        let schedule = FeeSchedule::default();
        let cpmm_total = schedule.cpmm_liquidity_fraction
            + schedule.cpmm_platform_fraction
            + schedule.cpmm_creator_fraction;
        assert!(cpmm_total < 1.0);
        assert!(schedule.dpm_fee_total() < 1.0);
    }
}
