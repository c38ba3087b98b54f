//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `engine.toml`, validating all parameters, and
//! providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::EngineConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<EngineConfig> {
    let path = Path::new(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: EngineConfig = toml::from_str(&content)
        .with_context(|| "Failed to parse engine config")?;

    validate_config(&config)?;

    info!(
        loan_ceiling = config.loans.max_loan_per_contract,
        commit_attempts = config.trading.max_commit_attempts,
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Fee fractions individually in [0, 1) and summing below 1
/// - Non-negative loan ceiling
/// - At least one commit attempt
pub fn validate_config(config: &EngineConfig) -> Result<()> {
    let fees = &config.fees;
    for (name, fraction) in [
        ("cpmm_liquidity_fraction", fees.cpmm_liquidity_fraction),
        ("cpmm_platform_fraction", fees.cpmm_platform_fraction),
        ("cpmm_creator_fraction", fees.cpmm_creator_fraction),
        ("dpm_platform_fraction", fees.dpm_platform_fraction),
        ("dpm_creator_fraction", fees.dpm_creator_fraction),
    ] {
        anyhow::ensure!(
            (0.0..1.0).contains(&fraction),
            "{} must be in [0, 1), got {}",
            name,
            fraction
        );
    }

    let cpmm_total = fees.cpmm_liquidity_fraction
        + fees.cpmm_platform_fraction
        + fees.cpmm_creator_fraction;
    anyhow::ensure!(
        cpmm_total < 1.0,
        "CPMM fee fractions must sum below 1, got {cpmm_total}"
    );

    let dpm_total = fees.dpm_platform_fraction + fees.dpm_creator_fraction;
    anyhow::ensure!(
        dpm_total < 1.0,
        "DPM fee fractions must sum below 1, got {dpm_total}"
    );

    anyhow::ensure!(
        config.loans.max_loan_per_contract >= 0.0,
        "max_loan_per_contract must be non-negative, got {}",
        config.loans.max_loan_per_contract
    );

    anyhow::ensure!(
        config.trading.max_commit_attempts >= 1,
        "max_commit_attempts must be at least 1"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_fee_fraction_out_of_range() {
        let mut config = EngineConfig::default();
        config.fees.cpmm_creator_fraction = 1.2;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_fee_sum_at_or_above_one() {
        let mut config = EngineConfig::default();
        config.fees.cpmm_liquidity_fraction = 0.5;
        config.fees.cpmm_platform_fraction = 0.3;
        config.fees.cpmm_creator_fraction = 0.25;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_negative_loan_ceiling() {
        let mut config = EngineConfig::default();
        config.loans.max_loan_per_contract = -1.0;
        assert!(validate_config(&config).is_err());
    }
}
