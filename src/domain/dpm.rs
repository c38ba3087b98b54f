//! Dynamic parimutuel share kernel.
//!
//! Legacy mechanism for binary, free-response, and bucketed-numeric
//! markets: no reserve curve, shares are a function of cumulative
//! stake per outcome. An outcome's probability is its share mass
//! squared relative to the squared mass of all outcomes, so piling
//! stake onto one outcome drives its probability toward 1 while the
//! probabilities always sum to 1.

use std::collections::HashMap;

use super::market::BinaryOutcome;
use super::math::norm_pdf;

/// Variance of the normal spread applied to numeric-bucket bets.
pub const NUMERIC_FIXED_VAR: f64 = 0.005;

/// Stake spread of a numeric bet: one `(bucket id, amount)` pair per
/// bucket that receives a share of the trade.
pub type BucketBets = Vec<(String, f64)>;

fn square_sum(total_shares: &HashMap<String, f64>) -> f64 {
    total_shares.values().map(|s| s * s).sum()
}

/// Shares issued for staking `amount` on `outcome`.
///
/// `sqrt(amount^2 + s_o^2 + 2 * amount * sqrt(sum s_i^2)) - s_o`, where
/// `s_o` is the outcome's existing share mass. Strictly positive for
/// positive stakes, including on outcomes nobody has bet on yet.
#[must_use]
pub fn shares(total_shares: &HashMap<String, f64>, amount: f64, outcome: &str) -> f64 {
    let existing = total_shares.get(outcome).copied().unwrap_or(0.0);
    let cross = 2.0 * amount * square_sum(total_shares).sqrt();
    (amount * amount + existing * existing + cross).sqrt() - existing
}

/// Probability of one outcome: `s_o^2 / sum s_i^2`.
///
/// A market with no shares at all has no price; that boundary is
/// defined as 0 rather than NaN.
#[must_use]
pub fn outcome_probability(total_shares: &HashMap<String, f64>, outcome: &str) -> f64 {
    let sq = square_sum(total_shares);
    if sq == 0.0 {
        return 0.0;
    }
    let s = total_shares.get(outcome).copied().unwrap_or(0.0);
    s * s / sq
}

/// YES probability of a binary parimutuel market.
#[must_use]
pub fn probability(total_shares: &HashMap<String, f64>) -> f64 {
    outcome_probability(total_shares, BinaryOutcome::Yes.label())
}

/// Spread one numeric trade over buckets around the chosen one.
///
/// Buckets are weighted by a normal density centred on `bucket`
/// (variance [`NUMERIC_FIXED_VAR`] in the unit-scaled bucket space),
/// dust allocations below `1 / bucket_count` are dropped, and the
/// survivors are rescaled so their stakes sum exactly to `amount`.
#[must_use]
pub fn bucket_bets(bucket_count: usize, bucket: usize, amount: f64, variance: f64) -> BucketBets {
    let scale = bucket_count as f64;
    let mean = bucket as f64 / scale;

    let densities: Vec<f64> = (0..bucket_count)
        .map(|i| norm_pdf(i as f64 / scale, mean, variance))
        .collect();
    let density_sum: f64 = densities.iter().sum();

    let raw: Vec<f64> = densities
        .iter()
        .map(|d| d / density_sum * amount)
        .map(|x| if x >= 1.0 / scale { x } else { 0.0 })
        .collect();
    let raw_sum: f64 = raw.iter().sum();

    if raw_sum == 0.0 {
        // Trade too small to clear the dust threshold anywhere; it all
        // lands on the chosen bucket.
        return vec![(bucket.to_string(), amount)];
    }

    raw.iter()
        .enumerate()
        .filter(|(_, x)| **x > 0.0)
        .map(|(i, x)| (i.to_string(), x / raw_sum * amount))
        .collect()
}

/// Shares issued for a spread numeric bet, plus the resulting totals.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericShares {
    /// Shares per entry of the input `bets`, same order.
    pub shares: Vec<f64>,
    pub total_shares: HashMap<String, f64>,
}

/// Issue shares for each bucket stake of a numeric bet.
///
/// Stakes are applied smallest-first, each seeing the totals left by
/// the previous one, so the decomposition is deterministic.
#[must_use]
pub fn numeric_shares(total_shares: &HashMap<String, f64>, bets: &BucketBets) -> NumericShares {
    let mut totals = total_shares.clone();
    let mut issued = vec![0.0; bets.len()];

    let mut order: Vec<usize> = (0..bets.len()).collect();
    order.sort_by(|&a, &b| bets[a].1.total_cmp(&bets[b].1));

    for i in order {
        let (bucket, amount) = &bets[i];
        let s = shares(&totals, *amount, bucket);
        issued[i] = s;
        *totals.entry(bucket.clone()).or_insert(0.0) += s;
    }

    NumericShares {
        shares: issued,
        total_shares: totals,
    }
}
