//! Trading wrapper - read-compute-commit with conflict retry.
//!
//! Glues the pure engine to the storage port: every bet and every
//! resolution runs as a fresh-snapshot computation followed by a
//! version-checked commit. A stale snapshot surfaces as
//! [`StoreError::Conflict`] and the whole computation is re-run from
//! a new read, up to a configured attempt limit. Resolutions apply
//! exactly once; the store refuses a second commit.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::domain::bet::Bet;
use crate::domain::fees::FeeSchedule;
use crate::domain::market::{BinaryOutcome, Contract, ResolvedOutcome};
use crate::ports::store::{ContractUpdate, MarketStore, ResolutionUpdate, StoreError};
use crate::usecases::betting::{self, BetError};
use crate::usecases::resolution::{self, PayoutInfo, ResolutionError};

/// A trade request as the API layer hands it over.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    pub contract_id: String,
    pub user_id: String,
    /// Outcome label: `"YES"`/`"NO"`, an answer id, or a bucket id.
    pub outcome: String,
    /// Money to spend.
    pub amount: f64,
    /// Optional worst acceptable probability (CPMM limit orders).
    pub limit_prob: Option<f64>,
    /// Value picked on a numeric market.
    pub value: Option<f64>,
}

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("bet amount must be a positive finite number, got {0}")]
    InvalidAmount(f64),
    #[error("market `{0}` is closed to trading")]
    MarketClosed(String),
    #[error("market `{0}` is already resolved")]
    MarketResolved(String),
    #[error("outcome `{outcome}` is not valid for market `{contract_id}`")]
    InvalidOutcome {
        contract_id: String,
        outcome: String,
    },
    #[error("numeric markets require a bet value")]
    MissingValue,
    #[error("conflicting writes on `{contract_id}` after {attempts} attempts")]
    RetriesExhausted {
        contract_id: String,
        attempts: u32,
    },
    #[error(transparent)]
    Bet(#[from] BetError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The exchange facade: one instance per store, shared by all callers.
pub struct Exchange<S> {
    store: S,
    schedule: FeeSchedule,
    loan_ceiling: f64,
    max_commit_attempts: u32,
    retry_base_delay: Duration,
}

impl<S: MarketStore> Exchange<S> {
    /// Create an exchange over a store with the given configuration.
    pub fn new(store: S, config: &EngineConfig) -> Self {
        Self {
            store,
            schedule: config.fees.schedule(),
            loan_ceiling: config.loans.max_loan_per_contract,
            max_commit_attempts: config.trading.max_commit_attempts,
            retry_base_delay: Duration::from_millis(config.trading.retry_base_delay_ms),
        }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Exponential backoff between commit attempts.
    async fn backoff(&self, attempt: u32) {
        if attempt > 1 {
            let delay = self.retry_base_delay * 2u32.pow(attempt - 2);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off before retry");
            sleep(delay).await;
        }
    }

    /// Place a bet, retrying the read-compute-commit cycle on conflict.
    pub async fn place_bet(
        &self,
        request: &TradeRequest,
        now_ms: i64,
    ) -> Result<Bet, TradeError> {
        if !request.amount.is_finite() || request.amount <= 0.0 {
            return Err(TradeError::InvalidAmount(request.amount));
        }

        for attempt in 1..=self.max_commit_attempts {
            self.backoff(attempt).await;
            let snapshot = self.store.load_contract(&request.contract_id).await?;
            let contract = snapshot.contract;
            check_tradeable(&contract, now_ms)?;

            let committed = match &contract {
                Contract::CpmmBinary(market)
                | Contract::CpmmPseudoNumeric { market, .. } => {
                    let outcome = parse_binary_outcome(request)?;
                    let unfilled = self
                        .store
                        .load_unfilled_limit_bets(&request.contract_id)
                        .await?;
                    let result = betting::cpmm_bet(
                        market,
                        outcome,
                        request.amount,
                        request.limit_prob,
                        &unfilled,
                        &self.schedule,
                        now_ms,
                    )?;
                    let update = ContractUpdate::Cpmm {
                        pool: result.pool,
                        p: result.p,
                        total_liquidity: result.total_liquidity,
                        collected_fees: market.collected_fees + result.bet.fees,
                    };
                    self
                        .store
                        .commit_bet(
                            snapshot.version,
                            &request.contract_id,
                            update,
                            &request.user_id,
                            result.bet,
                            &result.makers,
                        )
                        .await
                }

                Contract::DpmBinary(market) => {
                    let outcome = parse_binary_outcome(request)?;
                    let loan = self.available_loan(request).await?;
                    let result =
                        betting::dpm_binary_bet(market, outcome, request.amount, loan, now_ms);
                    self.commit_dpm_bet(snapshot.version, request, result).await
                }

                Contract::DpmFreeResponse(market) => {
                    let loan = self.available_loan(request).await?;
                    let result = betting::dpm_free_response_bet(
                        market,
                        &request.outcome,
                        request.amount,
                        loan,
                        now_ms,
                    );
                    self.commit_dpm_bet(snapshot.version, request, result).await
                }

                Contract::DpmNumeric {
                    market,
                    bucket_count,
                    ..
                } => {
                    let value = request.value.ok_or(TradeError::MissingValue)?;
                    let result = betting::dpm_numeric_bet(
                        market,
                        *bucket_count,
                        value,
                        &request.outcome,
                        request.amount,
                        now_ms,
                    )?;
                    self.commit_dpm_bet(snapshot.version, request, result).await
                }
            };

            match committed {
                Ok(bet) => {
                    info!(
                        contract_id = %request.contract_id,
                        user_id = %request.user_id,
                        outcome = %request.outcome,
                        amount = bet.body.amount,
                        shares = bet.body.shares,
                        attempt,
                        "Bet committed"
                    );
                    return Ok(bet);
                }
                Err(StoreError::Conflict(_)) => {
                    warn!(
                        contract_id = %request.contract_id,
                        attempt,
                        "Commit conflict, retrying from fresh snapshot"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(TradeError::RetriesExhausted {
            contract_id: request.contract_id.clone(),
            attempts: self.max_commit_attempts,
        })
    }

    /// Resolve a market and apply its payouts, exactly once.
    pub async fn resolve_market(
        &self,
        contract_id: &str,
        outcome: ResolvedOutcome,
        resolution_probability: Option<f64>,
        resolutions: Option<HashMap<String, f64>>,
    ) -> Result<PayoutInfo, TradeError> {
        for attempt in 1..=self.max_commit_attempts {
            self.backoff(attempt).await;
            let snapshot = self.store.load_contract(contract_id).await?;
            if snapshot.contract.is_resolved() {
                return Err(TradeError::MarketResolved(contract_id.to_string()));
            }

            let bets = self.store.load_bets(contract_id).await?;
            let liquidities = self.store.load_liquidity(contract_id).await?;

            let payouts = resolution::compute_payouts(
                &outcome,
                &snapshot.contract,
                &bets,
                &liquidities,
                resolutions.as_ref(),
                resolution_probability,
                &self.schedule,
            )?;

            let update = ResolutionUpdate {
                outcome: outcome.clone(),
                resolution_probability,
                resolutions: resolutions.clone(),
                payouts: payouts.clone(),
            };

            match self
                .store
                .commit_resolution(snapshot.version, contract_id, update)
                .await
            {
                Ok(()) => {
                    info!(
                        contract_id,
                        outcome = %outcome,
                        payout_count = payouts.payouts.len(),
                        attempt,
                        "Market resolved"
                    );
                    return Ok(payouts);
                }
                Err(StoreError::Conflict(_)) => {
                    warn!(contract_id, attempt, "Resolution conflict, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(TradeError::RetriesExhausted {
            contract_id: contract_id.to_string(),
            attempts: self.max_commit_attempts,
        })
    }

    async fn available_loan(&self, request: &TradeRequest) -> Result<f64, StoreError> {
        let prior = self
            .store
            .load_user_bets(&request.contract_id, &request.user_id)
            .await?;
        Ok(betting::loan_amount(
            &prior,
            request.amount,
            self.loan_ceiling,
        ))
    }

    async fn commit_dpm_bet(
        &self,
        version: u64,
        request: &TradeRequest,
        result: betting::DpmBetResult,
    ) -> Result<Bet, StoreError> {
        let update = ContractUpdate::Dpm {
            pool: result.pool,
            total_shares: result.total_shares,
            total_bets: result.total_bets,
        };
        self
            .store
            .commit_bet(
                version,
                &request.contract_id,
                update,
                &request.user_id,
                result.bet,
                &[],
            )
            .await
    }
}

fn check_tradeable(contract: &Contract, now_ms: i64) -> Result<(), TradeError> {
    if contract.is_resolved() {
        return Err(TradeError::MarketResolved(contract.id().to_string()));
    }
    let close_time = match contract {
        Contract::CpmmBinary(m) | Contract::CpmmPseudoNumeric { market: m, .. } => m.close_time,
        Contract::DpmBinary(m)
        | Contract::DpmFreeResponse(m)
        | Contract::DpmNumeric { market: m, .. } => m.close_time,
    };
    if let Some(close) = close_time {
        if now_ms >= close {
            return Err(TradeError::MarketClosed(contract.id().to_string()));
        }
    }
    Ok(())
}

fn parse_binary_outcome(request: &TradeRequest) -> Result<BinaryOutcome, TradeError> {
    BinaryOutcome::parse(&request.outcome).ok_or_else(|| TradeError::InvalidOutcome {
        contract_id: request.contract_id.clone(),
        outcome: request.outcome.clone(),
    })
}
