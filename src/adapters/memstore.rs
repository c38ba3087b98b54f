//! In-Memory Store - Concrete Adapter for the MarketStore Port
//!
//! Versioned contract documents behind a mutex, with user balances
//! applied on resolution. Faithful to the transactional contract the
//! real database must honor: commits check the snapshot version and
//! answer `Conflict` when the document moved, and a resolved contract
//! refuses a second resolution.
//!
//! Used by integration tests and as the reference implementation for
//! database adapters.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::bet::{Bet, CandidateBet, Fill, LimitBet};
use crate::domain::liquidity::LiquidityProvision;
use crate::domain::market::{BinaryOutcome, Contract};
use crate::domain::math::float_gte;
use crate::ports::store::{
    ContractSnapshot, ContractUpdate, MarketStore, ResolutionUpdate, StoreError,
};
use crate::usecases::matching::MakerFill;

struct ContractDoc {
    contract: Contract,
    version: u64,
    bets: Vec<Bet>,
    liquidity: Vec<LiquidityProvision>,
}

/// In-memory market database.
#[derive(Default)]
pub struct MemStore {
    docs: Mutex<HashMap<String, ContractDoc>>,
    balances: Mutex<HashMap<String, f64>>,
}

impl MemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a contract document at version 0.
    pub fn insert_contract(&self, contract: Contract) {
        let mut docs = self.docs.lock().expect("memstore mutex poisoned");
        docs.insert(
            contract.id().to_string(),
            ContractDoc {
                contract,
                version: 0,
                bets: Vec::new(),
                liquidity: Vec::new(),
            },
        );
    }

    /// Record a liquidity provision (minting an id if absent) and bump
    /// the contract version, like a real write would.
    pub fn insert_liquidity(&self, mut provision: LiquidityProvision) {
        let mut docs = self.docs.lock().expect("memstore mutex poisoned");
        if let Some(doc) = docs.get_mut(&provision.contract_id) {
            if provision.id.is_empty() {
                provision.id = Uuid::new_v4().to_string();
            }
            doc.liquidity.push(provision);
            doc.version += 1;
        }
    }

    /// A user's applied balance (resolution transfers only).
    #[must_use]
    pub fn balance(&self, user_id: &str) -> f64 {
        let balances = self.balances.lock().expect("memstore mutex poisoned");
        balances.get(user_id).copied().unwrap_or(0.0)
    }

    /// Snapshot of a contract's committed bets, for test assertions.
    #[must_use]
    pub fn committed_bets(&self, contract_id: &str) -> Vec<Bet> {
        let docs = self.docs.lock().expect("memstore mutex poisoned");
        docs
            .get(contract_id)
            .map(|doc| doc.bets.clone())
            .unwrap_or_default()
    }

    /// Bump a contract's version without changing it. Lets tests force
    /// the Conflict path deterministically.
    pub fn touch(&self, contract_id: &str) {
        let mut docs = self.docs.lock().expect("memstore mutex poisoned");
        if let Some(doc) = docs.get_mut(contract_id) {
            doc.version += 1;
        }
    }

    fn credit(&self, user_id: &str, amount: f64) {
        let mut balances = self.balances.lock().expect("memstore mutex poisoned");
        *balances.entry(user_id.to_string()).or_insert(0.0) += amount;
    }
}

#[async_trait]
impl MarketStore for MemStore {
    async fn load_contract(&self, contract_id: &str) -> Result<ContractSnapshot, StoreError> {
        let docs = self.docs.lock().expect("memstore mutex poisoned");
        docs
            .get(contract_id)
            .map(|doc| ContractSnapshot {
                contract: doc.contract.clone(),
                version: doc.version,
            })
            .ok_or_else(|| StoreError::NotFound(contract_id.to_string()))
    }

    async fn load_bets(&self, contract_id: &str) -> Result<Vec<Bet>, StoreError> {
        let docs = self.docs.lock().expect("memstore mutex poisoned");
        docs
            .get(contract_id)
            .map(|doc| doc.bets.clone())
            .ok_or_else(|| StoreError::NotFound(contract_id.to_string()))
    }

    async fn load_user_bets(
        &self,
        contract_id: &str,
        user_id: &str,
    ) -> Result<Vec<Bet>, StoreError> {
        let bets = self.load_bets(contract_id).await?;
        Ok(bets.into_iter().filter(|b| b.user_id == user_id).collect())
    }

    async fn load_unfilled_limit_bets(
        &self,
        contract_id: &str,
    ) -> Result<Vec<LimitBet>, StoreError> {
        let bets = self.load_bets(contract_id).await?;
        Ok(
            bets
                .iter()
                .filter(|bet| {
                    bet.body.is_filled == Some(false) && bet.body.is_cancelled == Some(false)
                })
                .filter_map(|bet| {
                    let outcome = BinaryOutcome::parse(&bet.body.outcome)?;
                    Some(LimitBet {
                        id: bet.id.clone(),
                        user_id: bet.user_id.clone(),
                        outcome,
                        limit_prob: bet.body.limit_prob?,
                        order_amount: bet.body.order_amount?,
                        amount: bet.body.amount,
                        created_time: bet.body.created_time,
                    })
                })
                .collect(),
        )
    }

    async fn load_liquidity(
        &self,
        contract_id: &str,
    ) -> Result<Vec<LiquidityProvision>, StoreError> {
        let docs = self.docs.lock().expect("memstore mutex poisoned");
        docs
            .get(contract_id)
            .map(|doc| doc.liquidity.clone())
            .ok_or_else(|| StoreError::NotFound(contract_id.to_string()))
    }

    async fn commit_bet(
        &self,
        version: u64,
        contract_id: &str,
        update: ContractUpdate,
        user_id: &str,
        bet: CandidateBet,
        maker_fills: &[MakerFill],
    ) -> Result<Bet, StoreError> {
        let mut docs = self.docs.lock().expect("memstore mutex poisoned");
        let doc = docs
            .get_mut(contract_id)
            .ok_or_else(|| StoreError::NotFound(contract_id.to_string()))?;

        if doc.version != version {
            return Err(StoreError::Conflict(contract_id.to_string()));
        }

        match (update, &mut doc.contract) {
            (
                ContractUpdate::Cpmm {
                    pool,
                    p,
                    total_liquidity,
                    collected_fees,
                },
                Contract::CpmmBinary(market) | Contract::CpmmPseudoNumeric { market, .. },
            ) => {
                market.pool = pool;
                market.p = p;
                market.total_liquidity = total_liquidity;
                market.collected_fees = collected_fees;
            }
            (
                ContractUpdate::Dpm {
                    pool,
                    total_shares,
                    total_bets,
                },
                Contract::DpmBinary(market)
                | Contract::DpmFreeResponse(market)
                | Contract::DpmNumeric { market, .. },
            ) => {
                market.pool = pool;
                market.total_shares = total_shares;
                market.total_bets = total_bets;
            }
            _ => {
                return Err(StoreError::Backend(anyhow::anyhow!(
                    "mechanism mismatch between update and contract `{contract_id}`"
                )));
            }
        }

        let stored = bet.into_bet(Uuid::new_v4().to_string(), user_id);

        for fill in maker_fills {
            let Some(maker) = doc.bets.iter_mut().find(|b| b.id == fill.bet_id) else {
                return Err(StoreError::Backend(anyhow::anyhow!(
                    "maker bet `{}` not found on `{contract_id}`",
                    fill.bet_id
                )));
            };
            maker.body.amount += fill.amount;
            maker.body.shares += fill.shares;
            if let Some(fills) = maker.body.fills.as_mut() {
                fills.push(Fill {
                    matched_bet_id: Some(stored.id.clone()),
                    amount: fill.amount,
                    shares: fill.shares,
                    timestamp: fill.timestamp,
                });
            }
            if let Some(order_amount) = maker.body.order_amount {
                maker.body.is_filled = Some(float_gte(maker.body.amount, order_amount));
            }
        }

        doc.bets.push(stored.clone());
        doc.version += 1;
        Ok(stored)
    }

    async fn commit_resolution(
        &self,
        version: u64,
        contract_id: &str,
        update: ResolutionUpdate,
    ) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().expect("memstore mutex poisoned");
        let doc = docs
            .get_mut(contract_id)
            .ok_or_else(|| StoreError::NotFound(contract_id.to_string()))?;

        if doc.contract.is_resolved() {
            return Err(StoreError::AlreadyResolved(contract_id.to_string()));
        }
        if doc.version != version {
            return Err(StoreError::Conflict(contract_id.to_string()));
        }

        let creator_id = doc.contract.creator_id().to_string();
        match &mut doc.contract {
            Contract::CpmmBinary(m) | Contract::CpmmPseudoNumeric { market: m, .. } => {
                m.is_resolved = true;
                m.resolution = Some(update.outcome.clone());
                m.resolution_probability = update.resolution_probability;
                m.collected_fees = update.payouts.collected_fees;
            }
            Contract::DpmBinary(m)
            | Contract::DpmFreeResponse(m)
            | Contract::DpmNumeric { market: m, .. } => {
                m.is_resolved = true;
                m.resolution = Some(update.outcome.clone());
                m.resolution_probability = update.resolution_probability;
                m.resolutions = update.resolutions.clone();
                m.collected_fees = update.payouts.collected_fees;
            }
        }
        doc.version += 1;
        drop(docs);

        for payout in &update.payouts.payouts {
            self.credit(&payout.user_id, payout.payout);
        }
        for payout in &update.payouts.liquidity_payouts {
            self.credit(&payout.user_id, payout.payout);
        }
        self.credit(&creator_id, update.payouts.creator_payout);

        Ok(())
    }
}
