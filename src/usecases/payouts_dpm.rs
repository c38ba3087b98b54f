//! Payout rules for parimutuel (DPM) markets.
//!
//! Winners split the combined stake pool pro-rata by their share of
//! the winning outcome's issued shares. The DPM fee is taken from
//! realized profit at resolution: everyone gets their stake back,
//! plus `(1 - fee) * profit` when they profited.

use std::collections::HashMap;

use crate::domain::bet::Bet;
use crate::domain::dpm;
use crate::domain::fees::{FeeSchedule, Fees};
use crate::domain::market::{BinaryOutcome, DpmMarket};
use super::resolution::{Payout, PayoutInfo};

/// Stake plus fee-reduced profit when the bet won money; just the
/// winnings when it paid out below stake.
fn deduct_fees(amount: f64, winnings: f64, fee_total: f64) -> f64 {
    if winnings > amount {
        amount + (1.0 - fee_total) * (winnings - amount)
    } else {
        winnings
    }
}

/// Assemble the shared fee bookkeeping: resolution-time fees are a
/// fraction of the total profit paid out.
fn with_profit_fees(
    market: &DpmMarket,
    payouts: Vec<Payout>,
    total_profit: f64,
    schedule: &FeeSchedule,
) -> PayoutInfo {
    let creator_fee = schedule.dpm_creator_fraction * total_profit;
    let platform_fee = schedule.dpm_platform_fraction * total_profit;
    let resolution_fees = Fees {
        liquidity_fee: 0.0,
        platform_fee,
        creator_fee,
    };

    PayoutInfo {
        payouts,
        creator_payout: creator_fee,
        liquidity_payouts: Vec::new(),
        collected_fees: market.collected_fees + resolution_fees,
    }
}

/// A named outcome won: its bettors split the whole pool by share.
pub(crate) fn standard_payouts(
    outcome: &str,
    market: &DpmMarket,
    bets: &[&Bet],
    schedule: &FeeSchedule,
) -> PayoutInfo {
    let winning: Vec<&&Bet> = bets.iter().filter(|b| b.body.outcome == outcome).collect();
    let total_shares: f64 = winning.iter().map(|b| b.body.shares).sum();
    if total_shares == 0.0 {
        return with_profit_fees(market, Vec::new(), 0.0, schedule);
    }

    let pool_total = market.pool_total();
    let mut total_profit = 0.0;
    let payouts = winning
        .iter()
        .map(|bet| {
            let winnings = bet.body.shares / total_shares * pool_total;
            let profit = (winnings - bet.body.amount).max(0.0);
            total_profit += profit;
            // Winning-side bettors keep at least their stake; profit can
            // still be negative against phantom seed shares.
            Payout {
                user_id: bet.user_id.clone(),
                payout: bet.body.amount + (1.0 - schedule.dpm_fee_total()) * profit,
            }
        })
        .collect();

    with_profit_fees(market, payouts, total_profit, schedule)
}

/// Binary MKT resolution: blend YES and NO sides by the resolved
/// probability on the parimutuel share basis.
pub(crate) fn mkt_payouts(
    market: &DpmMarket,
    bets: &[&Bet],
    resolution_probability: Option<f64>,
    schedule: &FeeSchedule,
) -> PayoutInfo {
    let p = resolution_probability
        .or(market.resolution_probability)
        .unwrap_or_else(|| dpm::probability(&market.total_shares));

    let side_weight = |outcome: &str| {
        if outcome == BinaryOutcome::Yes.label() {
            p
        } else {
            1.0 - p
        }
    };

    let weighted_share_total: f64 = bets
        .iter()
        .map(|b| side_weight(&b.body.outcome) * b.body.shares)
        .sum();
    if weighted_share_total == 0.0 {
        return with_profit_fees(market, Vec::new(), 0.0, schedule);
    }

    let pool_total = market.pool_total();
    let mut total_profit = 0.0;
    let payouts = bets
        .iter()
        .map(|bet| {
            let winnings =
                side_weight(&bet.body.outcome) * bet.body.shares / weighted_share_total * pool_total;
            total_profit += (winnings - bet.body.amount).max(0.0);
            Payout {
                user_id: bet.user_id.clone(),
                payout: deduct_fees(bet.body.amount, winnings, schedule.dpm_fee_total()),
            }
        })
        .collect();

    with_profit_fees(market, payouts, total_profit, schedule)
}

/// Free-response MKT resolution across an explicit weight map.
pub(crate) fn multi_outcome_payouts(
    resolutions: &HashMap<String, f64>,
    market: &DpmMarket,
    bets: &[&Bet],
    schedule: &FeeSchedule,
) -> PayoutInfo {
    let weight_total: f64 = resolutions.values().sum();
    if weight_total == 0.0 {
        return with_profit_fees(market, Vec::new(), 0.0, schedule);
    }

    let winning: Vec<&&Bet> = bets
        .iter()
        .filter(|b| resolutions.get(&b.body.outcome).copied().unwrap_or(0.0) > 0.0)
        .collect();

    let mut shares_by_outcome: HashMap<&str, f64> = HashMap::new();
    for bet in &winning {
        *shares_by_outcome.entry(bet.body.outcome.as_str()).or_insert(0.0) +=
            bet.body.shares;
    }

    let pool_total = market.pool_total();
    let mut total_profit = 0.0;
    let payouts = winning
        .iter()
        .map(|bet| {
            let weight = resolutions[&bet.body.outcome] / weight_total;
            let outcome_shares = shares_by_outcome[bet.body.outcome.as_str()];
            let winnings = bet.body.shares / outcome_shares * weight * pool_total;
            total_profit += (winnings - bet.body.amount).max(0.0);
            Payout {
                user_id: bet.user_id.clone(),
                payout: deduct_fees(bet.body.amount, winnings, schedule.dpm_fee_total()),
            }
        })
        .collect();

    with_profit_fees(market, payouts, total_profit, schedule)
}

/// CANCEL (or missing) resolution: every open bet is refunded in full.
pub(crate) fn cancel_payouts(market: &DpmMarket, bets: &[&Bet]) -> PayoutInfo {
    let payouts = bets
        .iter()
        .map(|bet| Payout {
            user_id: bet.user_id.clone(),
            payout: bet.body.amount,
        })
        .collect();

    PayoutInfo {
        payouts,
        creator_payout: 0.0,
        liquidity_payouts: Vec::new(),
        collected_fees: market.collected_fees,
    }
}

/// A numeric bucket won: pay by each bet's share of that bucket,
/// against the stake it allocated there.
pub(crate) fn numeric_payouts(
    bucket: &str,
    market: &DpmMarket,
    bets: &[&Bet],
    schedule: &FeeSchedule,
) -> PayoutInfo {
    let bucket_shares = |bet: &Bet| {
        bet
            .body
            .all_outcome_shares
            .as_ref()
            .and_then(|shares| shares.get(bucket).copied())
            .unwrap_or(0.0)
    };

    let winning: Vec<&&Bet> = bets.iter().filter(|b| bucket_shares(b) > 0.0).collect();
    let total_shares: f64 = winning.iter().map(|b| bucket_shares(b)).sum();
    if total_shares == 0.0 {
        return with_profit_fees(market, Vec::new(), 0.0, schedule);
    }

    let pool_total = market.pool_total();
    let mut total_profit = 0.0;
    let payouts = winning
        .iter()
        .map(|bet| {
            let amount = bet
                .body
                .all_bet_amounts
                .as_ref()
                .and_then(|amounts| amounts.get(bucket).copied())
                .unwrap_or(0.0);
            let winnings = bucket_shares(bet) / total_shares * pool_total;
            total_profit += (winnings - amount).max(0.0);
            Payout {
                user_id: bet.user_id.clone(),
                payout: deduct_fees(amount, winnings, schedule.dpm_fee_total()),
            }
        })
        .collect();

    with_profit_fees(market, payouts, total_profit, schedule)
}
