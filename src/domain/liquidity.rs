//! Liquidity-provision records.

use serde::{Deserialize, Serialize};

use super::cpmm::CpmmPool;

/// A deposit into (or withdrawal from) a CPMM pool by one user.
///
/// Consumed only at resolution time, where the pool's residual value
/// is apportioned to providers pro-rata by the liquidity units they
/// created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityProvision {
    pub id: String,
    pub user_id: String,
    pub contract_id: String,
    /// Money deposited; negative for a withdrawal.
    pub amount: f64,
    /// Liquidity units created: the change in the pool's curve
    /// constant when this provision was applied.
    pub liquidity: f64,
    /// Pool reserves after the provision, for audit.
    pub pool: CpmmPool,
    /// Curve weight after the provision.
    pub p: f64,
    pub created_time: i64,
}
