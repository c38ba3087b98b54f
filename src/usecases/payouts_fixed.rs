//! Payout rules for fixed-payout (CPMM) markets.
//!
//! Winning shares redeem one unit of value each (or a probability
//! blend for MKT resolutions); whatever the pool holds after winners
//! are paid belongs to the liquidity providers, split pro-rata by the
//! liquidity units each provision created.

use std::collections::BTreeMap;

use crate::domain::bet::Bet;
use crate::domain::cpmm;
use crate::domain::fees::Fees;
use crate::domain::liquidity::LiquidityProvision;
use crate::domain::market::{BinaryOutcome, CpmmMarket};
use super::resolution::{Payout, PayoutInfo};

/// Residual pools below this are dust and not worth distributing.
const MIN_RESIDUAL_POOL: f64 = 1e-3;

/// YES or NO resolution: winners redeem shares 1:1.
pub(crate) fn standard_payouts(
    outcome: BinaryOutcome,
    market: &CpmmMarket,
    bets: &[&Bet],
    liquidities: &[LiquidityProvision],
) -> PayoutInfo {
    let payouts = bets
        .iter()
        .filter(|bet| bet.body.outcome == outcome.label())
        .map(|bet| Payout {
            user_id: bet.user_id.clone(),
            payout: bet.body.shares,
        })
        .collect();

    let residual = match outcome {
        BinaryOutcome::Yes => market.pool.yes,
        BinaryOutcome::No => market.pool.no,
    };

    PayoutInfo {
        payouts,
        creator_payout: market.collected_fees.creator_fee,
        liquidity_payouts: liquidity_pool_payouts(residual, liquidities),
        collected_fees: market.collected_fees,
    }
}

/// MKT resolution: every share is worth the resolved probability of
/// its side.
pub(crate) fn mkt_payouts(
    market: &CpmmMarket,
    bets: &[&Bet],
    liquidities: &[LiquidityProvision],
    resolution_probability: Option<f64>,
) -> PayoutInfo {
    let p = resolution_probability
        .or(market.resolution_probability)
        .unwrap_or_else(|| cpmm::probability(&market.state()));

    let payouts = bets
        .iter()
        .map(|bet| {
            let bet_p = if bet.body.outcome == BinaryOutcome::Yes.label() {
                p
            } else {
                1.0 - p
            };
            Payout {
                user_id: bet.user_id.clone(),
                payout: bet_p * bet.body.shares,
            }
        })
        .collect();

    let residual = p * market.pool.yes + (1.0 - p) * market.pool.no;

    PayoutInfo {
        payouts,
        creator_payout: market.collected_fees.creator_fee,
        liquidity_payouts: liquidity_pool_payouts(residual, liquidities),
        collected_fees: market.collected_fees,
    }
}

/// CANCEL resolution: bettors get their stakes back, providers their
/// deposits; no fees are collected.
pub(crate) fn cancel_payouts(
    bets: &[&Bet],
    liquidities: &[LiquidityProvision],
) -> PayoutInfo {
    let payouts = bets
        .iter()
        .map(|bet| Payout {
            user_id: bet.user_id.clone(),
            payout: bet.body.amount,
        })
        .collect();

    let liquidity_payouts = liquidities
        .iter()
        .map(|provision| Payout {
            user_id: provision.user_id.clone(),
            payout: provision.amount,
        })
        .collect();

    PayoutInfo {
        payouts,
        creator_payout: 0.0,
        liquidity_payouts,
        collected_fees: Fees::default(),
    }
}

/// Split `residual` across providers pro-rata by liquidity units.
fn liquidity_pool_payouts(
    residual: f64,
    liquidities: &[LiquidityProvision],
) -> Vec<Payout> {
    if residual < MIN_RESIDUAL_POOL {
        return Vec::new();
    }

    let mut units: BTreeMap<&str, f64> = BTreeMap::new();
    for provision in liquidities {
        *units.entry(provision.user_id.as_str()).or_insert(0.0) += provision.liquidity;
    }
    let total: f64 = units.values().sum();
    if total <= 0.0 {
        return Vec::new();
    }

    units
        .into_iter()
        .map(|(user_id, weight)| Payout {
            user_id: user_id.to_string(),
            payout: weight / total * residual,
        })
        .collect()
}
