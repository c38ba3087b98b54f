//! Weighted constant-product pricing kernel.
//!
//! Prices a binary market by the invariant curve
//! `yes^p * no^(1-p) = k`, where `p` in (0, 1) weights the YES
//! reserve. The curve constant `k` doubles as the pool's liquidity
//! measure; it only changes when fees or liquidity deposits are folded
//! into the reserves.
//!
//! All functions are pure: callers receive a new [`CpmmState`] and
//! persist it themselves.

use serde::{Deserialize, Serialize};

use super::fees::{FeeSchedule, Fees};
use super::market::BinaryOutcome;

/// Floor on either reserve. The kernel caps any trade that would
/// drain a side past this, leaving the rest unfilled.
pub const MIN_POOL_QTY: f64 = 0.01;

/// YES/NO reserves of a constant-product pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpmmPool {
    #[serde(rename = "YES")]
    pub yes: f64,
    #[serde(rename = "NO")]
    pub no: f64,
}

/// Full pricing state: reserves plus the curve weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpmmState {
    pub pool: CpmmPool,
    pub p: f64,
}

impl CpmmState {
    #[must_use]
    pub fn new(yes: f64, no: f64, p: f64) -> Self {
        Self {
            pool: CpmmPool { yes, no },
            p,
        }
    }
}

/// Result of buying one outcome from the pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpmmPurchase {
    /// Shares issued to the buyer.
    pub shares: f64,
    /// Amount actually spent; less than requested when the reserve
    /// floor caps the trade.
    pub amount: f64,
    /// Pool state after the trade and fee reinvestment.
    pub state: CpmmState,
    /// Fees carved out of the spent amount.
    pub fees: Fees,
}

/// Result of adding liquidity to both reserves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpmmLiquidityChange {
    pub state: CpmmState,
    /// Liquidity units created: `k(after) - k(before)`.
    pub liquidity: f64,
}

/// Implied probability of YES.
///
/// `prob = p * no / ((1 - p) * yes + p * no)` — growing the YES
/// reserve relative to NO lowers the YES probability.
#[must_use]
pub fn probability(state: &CpmmState) -> f64 {
    let CpmmPool { yes, no } = state.pool;
    state.p * no / ((1.0 - state.p) * yes + state.p * no)
}

/// The curve constant `k = yes^p * no^(1-p)`, used as the pool's
/// liquidity measure.
#[must_use]
pub fn liquidity(state: &CpmmState) -> f64 {
    state.pool.yes.powf(state.p) * state.pool.no.powf(1.0 - state.p)
}

/// Shares received for a no-fee buy of `amount` on `outcome`.
///
/// Both reserves absorb the amount, then the bought side is reduced
/// back onto the curve; the reduction is the buyer's shares.
fn shares_for_amount(state: &CpmmState, amount: f64, outcome: BinaryOutcome) -> f64 {
    if amount == 0.0 {
        return 0.0;
    }
    let CpmmPool { yes, no } = state.pool;
    let p = state.p;
    let k = liquidity(state);
    match outcome {
        BinaryOutcome::Yes => yes + amount - (k * (amount + no).powf(p - 1.0)).powf(1.0 / p),
        BinaryOutcome::No => {
            no + amount - (k * (amount + yes).powf(-p)).powf(1.0 / (1.0 - p))
        }
    }
}

/// Probability after a no-fee buy of `amount`, without committing it.
/// This pre-fee price is the basis for the fee carve-out.
#[must_use]
pub fn probability_after_purchase(
    state: &CpmmState,
    amount: f64,
    outcome: BinaryOutcome,
) -> f64 {
    let shares = shares_for_amount(state, amount, outcome);
    let pool = traded_pool(&state.pool, amount, shares, outcome);
    probability(&CpmmState { pool, p: state.p })
}

fn traded_pool(pool: &CpmmPool, amount: f64, shares: f64, outcome: BinaryOutcome) -> CpmmPool {
    match outcome {
        BinaryOutcome::Yes => CpmmPool {
            yes: pool.yes - shares + amount,
            no: pool.no + amount,
        },
        BinaryOutcome::No => CpmmPool {
            yes: pool.yes + amount,
            no: pool.no - shares + amount,
        },
    }
}

/// Fee components for buying `amount` of `outcome`, each charged
/// against the post-trade price of the side being taken.
fn purchase_fees(
    state: &CpmmState,
    amount: f64,
    outcome: BinaryOutcome,
    schedule: &FeeSchedule,
) -> Fees {
    let prob = probability_after_purchase(state, amount, outcome);
    let taken_price = match outcome {
        BinaryOutcome::Yes => 1.0 - prob,
        BinaryOutcome::No => prob,
    };
    Fees {
        liquidity_fee: schedule.cpmm_liquidity_fraction * taken_price * amount,
        platform_fee: schedule.cpmm_platform_fraction * taken_price * amount,
        creator_fee: schedule.cpmm_creator_fraction * taken_price * amount,
    }
}

/// Buy `amount` of `outcome` from the pool.
///
/// Fees are carved out first, the fee-reduced amount moves the curve,
/// then the liquidity-fee component is folded back into both reserves
/// (with `p` recomputed so the post-trade probability is unchanged by
/// the fold). The trade is capped so the bought-side reserve never
/// drops below [`MIN_POOL_QTY`]; the cap shows up as
/// `CpmmPurchase::amount < requested`.
#[must_use]
pub fn purchase(
    state: &CpmmState,
    amount: f64,
    outcome: BinaryOutcome,
    schedule: &FeeSchedule,
) -> CpmmPurchase {
    let amount = amount.min(max_purchase_amount(state, outcome)).max(0.0);
    let fees = purchase_fees(state, amount, outcome, schedule);
    let remaining = amount - fees.total();
    let shares = shares_for_amount(state, remaining, outcome);
    let traded = CpmmState {
        pool: traded_pool(&state.pool, remaining, shares, outcome),
        p: state.p,
    };
    let reinvested = add_liquidity(&traded, fees.liquidity_fee);
    CpmmPurchase {
        shares,
        amount,
        state: reinvested.state,
        fees,
    }
}

/// Purchase amount of `outcome` that moves the implied probability to
/// `target`, or `+inf` when no finite amount can (target outside the
/// open unit interval). Returns 0 when the pool already sits at or
/// past the target in the direction this outcome moves it.
#[must_use]
pub fn amount_to_reach_prob(state: &CpmmState, target: f64, outcome: BinaryOutcome) -> f64 {
    if !target.is_finite() || target <= 0.0 || target >= 1.0 {
        return f64::INFINITY;
    }
    let CpmmPool { yes, no } = state.pool;
    let p = state.p;
    let k = liquidity(state);
    // Post-trade reserves satisfy no' = ratio * yes' at probability
    // `target`; substituting into the curve gives closed forms.
    let ratio = ((1.0 - p) * target) / (p * (1.0 - target));
    let amount = match outcome {
        BinaryOutcome::Yes => k * ratio.powf(p) - no,
        BinaryOutcome::No => k * ratio.powf(p - 1.0) - yes,
    };
    amount.max(0.0)
}

/// Largest buy of `outcome` that keeps the bought-side reserve at
/// [`MIN_POOL_QTY`]. The fill loop consults this before every pool
/// fill; residual demand beyond it stays unfilled.
#[must_use]
pub fn max_purchase_amount(state: &CpmmState, outcome: BinaryOutcome) -> f64 {
    let CpmmPool { yes, no } = state.pool;
    let p = state.p;
    let k = liquidity(state);
    let amount = match outcome {
        BinaryOutcome::Yes => (k / MIN_POOL_QTY.powf(p)).powf(1.0 / (1.0 - p)) - no,
        BinaryOutcome::No => (k / MIN_POOL_QTY.powf(1.0 - p)).powf(1.0 / p) - yes,
    };
    amount.max(0.0)
}

/// Add `amount` to both reserves, recomputing the weight so the
/// implied probability is preserved. Used for LP deposits and for
/// folding per-trade liquidity fees back into the pool.
#[must_use]
pub fn add_liquidity(state: &CpmmState, amount: f64) -> CpmmLiquidityChange {
    if amount == 0.0 {
        return CpmmLiquidityChange {
            state: *state,
            liquidity: 0.0,
        };
    }
    let prob = probability(state);
    let CpmmPool { yes, no } = state.pool;
    let new_p = prob * (amount + yes) / (amount - no * (prob - 1.0) + prob * yes);
    let new_state = CpmmState {
        pool: CpmmPool {
            yes: yes + amount,
            no: no + amount,
        },
        p: new_p,
    };
    let created = liquidity(&new_state) - liquidity(state);
    CpmmLiquidityChange {
        state: new_state,
        liquidity: created,
    }
}
