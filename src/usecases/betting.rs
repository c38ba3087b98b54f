//! Trade construction - turns a validated request into a candidate
//! bet plus the contract deltas the storage layer must persist.
//!
//! CPMM trades compose the fill engine; DPM trades bypass it (no
//! limit orders exist in that mechanism) and apply the share kernel
//! directly. Nothing here mutates the contract: every function
//! returns new pool/share values for the caller to commit.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::bet::{Bet, CandidateBet, Fill, LimitBet};
use crate::domain::cpmm::{self, CpmmPool};
use crate::domain::dpm::{self, NUMERIC_FIXED_VAR};
use crate::domain::fees::{FeeSchedule, Fees};
use crate::domain::liquidity::LiquidityProvision;
use crate::domain::market::{BinaryOutcome, CpmmMarket, DpmMarket};
use crate::domain::math::float_equal;
use crate::usecases::matching::{self, MakerFill, MatchingError};

#[derive(Debug, Error, PartialEq)]
pub enum BetError {
    #[error(transparent)]
    Matching(#[from] MatchingError),
    #[error("`{0}` is not a valid bucket id for this market")]
    InvalidBucket(String),
}

/// A CPMM trade: candidate bet plus pool/weight/liquidity deltas and
/// the maker fills to apply to resting orders.
#[derive(Debug, Clone, PartialEq)]
pub struct CpmmBetResult {
    pub bet: CandidateBet,
    pub pool: CpmmPool,
    pub p: f64,
    pub total_liquidity: f64,
    pub makers: Vec<MakerFill>,
}

/// A DPM trade: candidate bet plus the updated per-outcome maps.
#[derive(Debug, Clone, PartialEq)]
pub struct DpmBetResult {
    pub bet: CandidateBet,
    pub pool: HashMap<String, f64>,
    pub total_shares: HashMap<String, f64>,
    pub total_bets: HashMap<String, f64>,
}

fn blank_candidate(contract_id: &str, outcome: String, now_ms: i64) -> CandidateBet {
    CandidateBet {
        contract_id: contract_id.to_string(),
        outcome,
        amount: 0.0,
        shares: 0.0,
        prob_before: 0.0,
        prob_after: 0.0,
        fees: Fees::default(),
        loan_amount: 0.0,
        created_time: now_ms,
        is_sold: false,
        sale_amount: None,
        order_amount: None,
        limit_prob: None,
        is_filled: None,
        is_cancelled: None,
        fills: None,
        value: None,
        all_bet_amounts: None,
        all_outcome_shares: None,
    }
}

/// Construct a CPMM bet (market or limit) for a binary or
/// pseudo-numeric contract.
///
/// The bet is marked filled when the taker total tolerance-equals the
/// requested amount; the realized liquidity fee is folded into the
/// contract's `total_liquidity`.
pub fn cpmm_bet(
    market: &CpmmMarket,
    outcome: BinaryOutcome,
    bet_amount: f64,
    limit_prob: Option<f64>,
    unfilled_bets: &[LimitBet],
    schedule: &FeeSchedule,
    now_ms: i64,
) -> Result<CpmmBetResult, BetError> {
    let state = market.state();
    let outcome_fills = matching::compute_fills(
        outcome,
        bet_amount,
        &state,
        limit_prob,
        unfilled_bets,
        schedule,
        now_ms,
    )?;

    let prob_before = cpmm::probability(&state);
    let prob_after = cpmm::probability(&outcome_fills.state);
    let taker_amount: f64 = outcome_fills.takers.iter().map(|t| t.amount).sum();
    let taker_shares: f64 = outcome_fills.takers.iter().map(|t| t.shares).sum();
    let is_filled = float_equal(bet_amount, taker_amount);

    let fills = outcome_fills
        .takers
        .iter()
        .map(|t| Fill {
            matched_bet_id: t.matched_bet_id.clone(),
            amount: t.amount,
            shares: t.shares,
            timestamp: t.timestamp,
        })
        .collect();

    let bet = CandidateBet {
        amount: taker_amount,
        shares: taker_shares,
        prob_before,
        prob_after,
        fees: outcome_fills.total_fees,
        order_amount: Some(bet_amount),
        limit_prob,
        is_filled: Some(is_filled),
        is_cancelled: Some(false),
        fills: Some(fills),
        ..blank_candidate(&market.id, outcome.label().to_string(), now_ms)
    };

    Ok(CpmmBetResult {
        bet,
        pool: outcome_fills.state.pool,
        p: outcome_fills.state.p,
        total_liquidity: market.total_liquidity + outcome_fills.total_fees.liquidity_fee,
        makers: outcome_fills.makers,
    })
}

/// Construct a DPM bet on a binary market.
pub fn dpm_binary_bet(
    market: &DpmMarket,
    outcome: BinaryOutcome,
    amount: f64,
    loan_amount: f64,
    now_ms: i64,
) -> DpmBetResult {
    let mut result = dpm_bet(market, outcome.label(), amount, loan_amount, now_ms);
    // Binary markets quote the YES probability whichever side was bought.
    result.bet.prob_before = dpm::probability(&market.total_shares);
    result.bet.prob_after = dpm::probability(&result.total_shares);
    result
}

/// Construct a DPM bet on a free-response answer.
pub fn dpm_free_response_bet(
    market: &DpmMarket,
    outcome: &str,
    amount: f64,
    loan_amount: f64,
    now_ms: i64,
) -> DpmBetResult {
    dpm_bet(market, outcome, amount, loan_amount, now_ms)
}

fn dpm_bet(
    market: &DpmMarket,
    outcome: &str,
    amount: f64,
    loan_amount: f64,
    now_ms: i64,
) -> DpmBetResult {
    let shares = dpm::shares(&market.total_shares, amount, outcome);

    let mut pool = market.pool.clone();
    *pool.entry(outcome.to_string()).or_insert(0.0) += amount;

    let mut total_shares = market.total_shares.clone();
    *total_shares.entry(outcome.to_string()).or_insert(0.0) += shares;

    let mut total_bets = market.total_bets.clone();
    *total_bets.entry(outcome.to_string()).or_insert(0.0) += amount;

    let prob_before = dpm::outcome_probability(&market.total_shares, outcome);
    let prob_after = dpm::outcome_probability(&total_shares, outcome);

    let bet = CandidateBet {
        amount,
        shares,
        prob_before,
        prob_after,
        loan_amount,
        ..blank_candidate(&market.id, outcome.to_string(), now_ms)
    };

    DpmBetResult {
        bet,
        pool,
        total_shares,
        total_bets,
    }
}

/// Construct a bucketed-numeric DPM bet.
///
/// The trade is spread over buckets around the chosen one; the
/// candidate records the per-bucket stakes and shares, with the
/// headline `shares` being those of the chosen bucket.
pub fn dpm_numeric_bet(
    market: &DpmMarket,
    bucket_count: usize,
    value: f64,
    bucket: &str,
    amount: f64,
    now_ms: i64,
) -> Result<DpmBetResult, BetError> {
    let bucket_index: usize = bucket
        .parse()
        .ok()
        .filter(|i| *i < bucket_count)
        .ok_or_else(|| BetError::InvalidBucket(bucket.to_string()))?;

    let bets = dpm::bucket_bets(bucket_count, bucket_index, amount, NUMERIC_FIXED_VAR);
    let issued = dpm::numeric_shares(&market.total_shares, &bets);

    let all_bet_amounts: HashMap<String, f64> = bets.iter().cloned().collect();
    let all_outcome_shares: HashMap<String, f64> = bets
        .iter()
        .enumerate()
        .map(|(i, (b, _))| (b.clone(), issued.shares[i]))
        .collect();

    let mut pool = market.pool.clone();
    let mut total_bets = market.total_bets.clone();
    for (b, stake) in &bets {
        *pool.entry(b.clone()).or_insert(0.0) += stake;
        *total_bets.entry(b.clone()).or_insert(0.0) += stake;
    }

    let prob_before = dpm::outcome_probability(&market.total_shares, bucket);
    let prob_after = dpm::outcome_probability(&issued.total_shares, bucket);

    let bet = CandidateBet {
        amount,
        shares: all_outcome_shares.get(bucket).copied().unwrap_or(0.0),
        prob_before,
        prob_after,
        value: Some(value),
        all_bet_amounts: Some(all_bet_amounts),
        all_outcome_shares: Some(all_outcome_shares),
        ..blank_candidate(&market.id, bucket.to_string(), now_ms)
    };

    Ok(DpmBetResult {
        bet,
        pool,
        total_shares: issued.total_shares,
        total_bets,
    })
}

/// Interest-free loan available for the user's next bet on a
/// contract: capped so the user's open loans never exceed `ceiling`.
#[must_use]
pub fn loan_amount(prior_bets: &[Bet], requested: f64, ceiling: f64) -> f64 {
    let open_loans: f64 = prior_bets
        .iter()
        .filter(|bet| bet.is_open())
        .map(|bet| bet.body.loan_amount)
        .sum();
    requested.min(ceiling - open_loans).max(0.0)
}

/// Apply a liquidity deposit (or withdrawal, negative amount) to a
/// CPMM market, producing the provision record and the updated
/// mechanism fields.
#[must_use]
pub fn provide_liquidity(
    market: &CpmmMarket,
    user_id: &str,
    amount: f64,
    now_ms: i64,
) -> (LiquidityProvision, CpmmBetDeltas) {
    let change = cpmm::add_liquidity(&market.state(), amount);
    let provision = LiquidityProvision {
        id: String::new(),
        user_id: user_id.to_string(),
        contract_id: market.id.clone(),
        amount,
        liquidity: change.liquidity,
        pool: change.state.pool,
        p: change.state.p,
        created_time: now_ms,
    };
    let deltas = CpmmBetDeltas {
        pool: change.state.pool,
        p: change.state.p,
        total_liquidity: market.total_liquidity + amount,
    };
    (provision, deltas)
}

/// CPMM mechanism fields updated by a liquidity change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpmmBetDeltas {
    pub pool: CpmmPool,
    pub p: f64,
    pub total_liquidity: f64,
}
