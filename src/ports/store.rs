//! Storage port - transactional boundary with the market database.
//!
//! The engine computes deltas; a `MarketStore` implementation applies
//! them atomically. Optimistic concurrency: every contract snapshot
//! carries a version token, commits fail with [`StoreError::Conflict`]
//! when the contract moved underneath, and the caller re-runs the
//! whole computation from a fresh read. The engine itself keeps no
//! retry state.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::bet::{Bet, CandidateBet, LimitBet};
use crate::domain::cpmm::CpmmPool;
use crate::domain::fees::Fees;
use crate::domain::liquidity::LiquidityProvision;
use crate::domain::market::{Contract, ResolvedOutcome};
use crate::usecases::matching::MakerFill;
use crate::usecases::resolution::PayoutInfo;

/// Failures at the storage boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("contract `{0}` not found")]
    NotFound(String),
    /// The snapshot the commit was computed from is stale. Recoverable:
    /// retry the whole computation from a fresh read.
    #[error("write conflict on contract `{0}`")]
    Conflict(String),
    /// Resolution payouts were already applied; re-running them would
    /// double-pay.
    #[error("contract `{0}` is already resolved")]
    AlreadyResolved(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// A contract read together with its optimistic-concurrency token.
#[derive(Debug, Clone)]
pub struct ContractSnapshot {
    pub contract: Contract,
    pub version: u64,
}

/// Mechanism fields a committed bet rewrites on the contract.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractUpdate {
    Cpmm {
        pool: CpmmPool,
        p: f64,
        total_liquidity: f64,
        collected_fees: Fees,
    },
    Dpm {
        pool: HashMap<String, f64>,
        total_shares: HashMap<String, f64>,
        total_bets: HashMap<String, f64>,
    },
}

/// Everything a resolution commit must apply atomically.
#[derive(Debug, Clone)]
pub struct ResolutionUpdate {
    pub outcome: ResolvedOutcome,
    pub resolution_probability: Option<f64>,
    pub resolutions: Option<HashMap<String, f64>>,
    pub payouts: PayoutInfo,
}

/// Trait for the market database.
///
/// Reads return point-in-time snapshots; the two commit methods are
/// the only writes and must be atomic per contract.
#[async_trait]
pub trait MarketStore: Send + Sync + 'static {
    /// Read a contract document and its version token.
    async fn load_contract(&self, contract_id: &str) -> Result<ContractSnapshot, StoreError>;

    /// Read the full bet history of a contract.
    async fn load_bets(&self, contract_id: &str) -> Result<Vec<Bet>, StoreError>;

    /// Read one user's bets on a contract (loan accounting).
    async fn load_user_bets(
        &self,
        contract_id: &str,
        user_id: &str,
    ) -> Result<Vec<Bet>, StoreError>;

    /// Read the currently unfilled, uncancelled limit orders.
    async fn load_unfilled_limit_bets(
        &self,
        contract_id: &str,
    ) -> Result<Vec<LimitBet>, StoreError>;

    /// Read the liquidity-provision history.
    async fn load_liquidity(
        &self,
        contract_id: &str,
    ) -> Result<Vec<LiquidityProvision>, StoreError>;

    /// Atomically write a new bet, the contract deltas, and the fill
    /// bookkeeping on matched resting orders. Fails with `Conflict`
    /// when `version` is stale. Returns the stored bet with its id.
    async fn commit_bet(
        &self,
        version: u64,
        contract_id: &str,
        update: ContractUpdate,
        user_id: &str,
        bet: CandidateBet,
        maker_fills: &[MakerFill],
    ) -> Result<Bet, StoreError>;

    /// Atomically resolve the contract and apply the payout batch as
    /// balance transfers. Must never apply twice: a resolved contract
    /// answers `AlreadyResolved`.
    async fn commit_resolution(
        &self,
        version: u64,
        contract_id: &str,
        update: ResolutionUpdate,
    ) -> Result<(), StoreError>;
}
