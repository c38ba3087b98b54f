//! Fill engine - matches an incoming order against the pool and book.
//!
//! Repeatedly applies single fill steps: against the best resting
//! limit order on the opposite outcome when its price beats the
//! pool's, otherwise against the pool itself (capped at whichever
//! limit binds first - the taker's own limit, the resting order's
//! price, or the reserve floor). Terminates when the requested amount
//! is tolerance-zero or a step produces no fill.
//!
//! Pure with respect to its inputs: the caller supplies the clock and
//! persists the returned pool state, so the whole computation can be
//! re-run verbatim inside a storage transaction retry.

use thiserror::Error;

use crate::domain::bet::LimitBet;
use crate::domain::cpmm::{self, CpmmState};
use crate::domain::fees::{FeeSchedule, Fees};
use crate::domain::market::BinaryOutcome;
use crate::domain::math::{float_equal, float_gte, float_lte};

/// Input-validation failures, reported before any computation.
#[derive(Debug, Error, PartialEq)]
pub enum MatchingError {
    #[error("bet amount must be finite, got {0}")]
    NonFiniteAmount(f64),
    #[error("limit probability must be finite, got {0}")]
    NonFiniteLimitProb(f64),
}

/// The incoming order's side of one fill step.
#[derive(Debug, Clone, PartialEq)]
pub struct TakerFill {
    /// Resting order consumed, or `None` for a pool fill.
    pub matched_bet_id: Option<String>,
    pub amount: f64,
    pub shares: f64,
    pub timestamp: i64,
}

/// The resting order's side of one fill step.
#[derive(Debug, Clone, PartialEq)]
pub struct MakerFill {
    /// Id of the resting order that was (partially) consumed.
    pub bet_id: String,
    pub amount: f64,
    pub shares: f64,
    pub timestamp: i64,
}

/// Full fill decomposition of one incoming order.
#[derive(Debug, Clone, PartialEq)]
pub struct FillOutcome {
    pub takers: Vec<TakerFill>,
    pub makers: Vec<MakerFill>,
    pub total_fees: Fees,
    /// Pool state after all pool fills.
    pub state: CpmmState,
}

enum FillStep {
    Pool {
        taker: TakerFill,
        state: CpmmState,
        fees: Fees,
    },
    Match {
        taker: TakerFill,
        maker: MakerFill,
    },
}

/// One fill step against the best remaining resting order, or the
/// pool when no order offers a better price. `None` means no legal
/// fill exists and the loop must stop.
fn compute_fill(
    amount: f64,
    outcome: BinaryOutcome,
    limit_prob: Option<f64>,
    state: &CpmmState,
    matched: Option<&LimitBet>,
    schedule: &FeeSchedule,
    timestamp: i64,
) -> Option<FillStep> {
    let prob = cpmm::probability(state);

    if let Some(lp) = limit_prob {
        // The taker's own limit already binds and no resting order offers
        // a price inside it: nothing legal to trade at.
        let blocked = match outcome {
            BinaryOutcome::Yes => {
                float_gte(prob, lp) && matched.map_or(1.0, |m| m.limit_prob) > lp
            }
            BinaryOutcome::No => {
                float_lte(prob, lp) && matched.map_or(0.0, |m| m.limit_prob) < lp
            }
        };
        if blocked {
            return None;
        }
    }

    let crossed = matched.filter(|m| match outcome {
        BinaryOutcome::Yes => float_gte(prob, m.limit_prob),
        BinaryOutcome::No => float_lte(prob, m.limit_prob),
    });

    if let Some(maker_bet) = crossed {
        // Fill against the resting order at its fixed price.
        let (taker_price, maker_price) = match outcome {
            BinaryOutcome::Yes => (maker_bet.limit_prob, 1.0 - maker_bet.limit_prob),
            BinaryOutcome::No => (1.0 - maker_bet.limit_prob, maker_bet.limit_prob),
        };
        let shares =
            (amount / taker_price).min(maker_bet.remaining() / maker_price);

        return Some(FillStep::Match {
            taker: TakerFill {
                matched_bet_id: Some(maker_bet.id.clone()),
                amount: shares * taker_price,
                shares,
                timestamp,
            },
            maker: MakerFill {
                bet_id: maker_bet.id.clone(),
                amount: shares * maker_price,
                shares,
                timestamp,
            },
        });
    }

    // Fill from the pool, up to the binding limit price.
    let limit = match matched {
        None => limit_prob,
        Some(m) => Some(match outcome {
            BinaryOutcome::Yes => m.limit_prob.min(limit_prob.unwrap_or(1.0)),
            BinaryOutcome::No => m.limit_prob.max(limit_prob.unwrap_or(0.0)),
        }),
    };
    let buy_amount = match limit {
        None => amount,
        Some(l) => amount.min(cpmm::amount_to_reach_prob(state, l, outcome)),
    };

    let purchase = cpmm::purchase(state, buy_amount, outcome, schedule);
    if float_equal(purchase.amount, 0.0) {
        // At the limit price or the reserve floor; residual stays unfilled.
        return None;
    }

    Some(FillStep::Pool {
        taker: TakerFill {
            matched_bet_id: None,
            amount: purchase.amount,
            shares: purchase.shares,
            timestamp,
        },
        state: purchase.state,
        fees: purchase.fees,
    })
}

/// Decompose an incoming order into taker and maker fills.
///
/// Resting orders on the opposite outcome are consumed best price
/// first (ascending `limit_prob` for a YES taker, descending for NO),
/// ties broken by earliest `created_time`.
pub fn compute_fills(
    outcome: BinaryOutcome,
    bet_amount: f64,
    state: &CpmmState,
    limit_prob: Option<f64>,
    unfilled_bets: &[LimitBet],
    schedule: &FeeSchedule,
    now_ms: i64,
) -> Result<FillOutcome, MatchingError> {
    if !bet_amount.is_finite() {
        return Err(MatchingError::NonFiniteAmount(bet_amount));
    }
    if let Some(lp) = limit_prob {
        if !lp.is_finite() {
            return Err(MatchingError::NonFiniteLimitProb(lp));
        }
    }

    let mut book: Vec<&LimitBet> = unfilled_bets
        .iter()
        .filter(|bet| bet.outcome != outcome)
        .collect();
    book.sort_by(|a, b| {
        let ordering = match outcome {
            BinaryOutcome::Yes => a.limit_prob.total_cmp(&b.limit_prob),
            BinaryOutcome::No => b.limit_prob.total_cmp(&a.limit_prob),
        };
        ordering.then(a.created_time.cmp(&b.created_time))
    });

    let mut takers = Vec::new();
    let mut makers = Vec::new();
    let mut total_fees = Fees::default();
    let mut amount = bet_amount;
    let mut current = *state;
    let mut i = 0;

    loop {
        let matched = book.get(i).copied();
        let Some(step) = compute_fill(
            amount, outcome, limit_prob, &current, matched, schedule, now_ms,
        ) else {
            break;
        };

        match step {
            FillStep::Pool {
                taker,
                state: next,
                fees,
            } => {
                current = next;
                total_fees += fees;
                amount -= taker.amount;
                takers.push(taker);
            }
            FillStep::Match { taker, maker } => {
                amount -= taker.amount;
                takers.push(taker);
                makers.push(maker);
                i += 1;
            }
        }

        if float_equal(amount, 0.0) {
            break;
        }
    }

    Ok(FillOutcome {
        takers,
        makers,
        total_fees,
        state: current,
    })
}
