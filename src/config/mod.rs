//! Configuration Module - TOML-based Engine Configuration
//!
//! Loads and validates configuration from `engine.toml`. Every fee
//! fraction and trading limit is externalized here - nothing is
//! hardcoded in the domain layer beyond the constants the math itself
//! requires.

pub mod loader;

use serde::Deserialize;

use crate::domain::fees::FeeSchedule;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Fee fractions per mechanism.
    #[serde(default)]
    pub fees: FeesConfig,
    /// Loan limits.
    #[serde(default)]
    pub loans: LoanConfig,
    /// Transaction-retry behavior.
    #[serde(default)]
    pub trading: TradingConfig,
}

/// Fee fractions. CPMM fees are charged per trade against the taken
/// side's price; DPM fees are charged against profit at resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct FeesConfig {
    /// CPMM fraction reinvested into the pool.
    #[serde(default = "default_cpmm_liquidity")]
    pub cpmm_liquidity_fraction: f64,
    /// CPMM fraction retained by the platform.
    #[serde(default = "default_cpmm_platform")]
    pub cpmm_platform_fraction: f64,
    /// CPMM fraction owed to the market creator.
    #[serde(default = "default_cpmm_creator")]
    pub cpmm_creator_fraction: f64,
    /// DPM profit fraction retained by the platform.
    #[serde(default = "default_dpm_platform")]
    pub dpm_platform_fraction: f64,
    /// DPM profit fraction owed to the market creator.
    #[serde(default = "default_dpm_creator")]
    pub dpm_creator_fraction: f64,
}

impl FeesConfig {
    /// The schedule consumed by the pricing and payout components.
    #[must_use]
    pub fn schedule(&self) -> FeeSchedule {
        FeeSchedule {
            cpmm_liquidity_fraction: self.cpmm_liquidity_fraction,
            cpmm_platform_fraction: self.cpmm_platform_fraction,
            cpmm_creator_fraction: self.cpmm_creator_fraction,
            dpm_platform_fraction: self.dpm_platform_fraction,
            dpm_creator_fraction: self.dpm_creator_fraction,
        }
    }
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            cpmm_liquidity_fraction: default_cpmm_liquidity(),
            cpmm_platform_fraction: default_cpmm_platform(),
            cpmm_creator_fraction: default_cpmm_creator(),
            dpm_platform_fraction: default_dpm_platform(),
            dpm_creator_fraction: default_dpm_creator(),
        }
    }
}

/// Loan limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LoanConfig {
    /// Ceiling on a user's combined open loans per contract.
    #[serde(default = "default_loan_ceiling")]
    pub max_loan_per_contract: f64,
}

impl Default for LoanConfig {
    fn default() -> Self {
        Self {
            max_loan_per_contract: default_loan_ceiling(),
        }
    }
}

/// Transaction-retry behavior of the trading wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// How many fresh-snapshot attempts a commit gets before giving up.
    #[serde(default = "default_commit_attempts")]
    pub max_commit_attempts: u32,
    /// Base delay between attempts (exponential backoff).
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: default_commit_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

// Default value functions for serde

fn default_cpmm_liquidity() -> f64 {
    0.02
}

fn default_cpmm_platform() -> f64 {
    0.03
}

fn default_cpmm_creator() -> f64 {
    0.05
}

fn default_dpm_platform() -> f64 {
    0.01
}

fn default_dpm_creator() -> f64 {
    0.04
}

fn default_loan_ceiling() -> f64 {
    20.0
}

fn default_commit_attempts() -> u32 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    20
}
