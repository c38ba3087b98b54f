//! Bet documents: committed bets, engine-emitted candidates, and
//! resting limit orders.
//!
//! A `Bet` is an immutable fact once committed — later operations only
//! toggle its fill/cancel/sold flags. The engine itself never writes a
//! `Bet`; it emits a [`CandidateBet`] that the storage layer stamps
//! with an id and owner inside the commit transaction.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::fees::Fees;
use super::market::BinaryOutcome;

/// One realized trade event inside a bet.
///
/// `matched_bet_id` names the resting order on the other side, or
/// `None` when the counterparty was the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub matched_bet_id: Option<String>,
    /// Money moved in this fill.
    pub amount: f64,
    /// Shares moved in this fill.
    pub shares: f64,
    pub timestamp: i64,
}

/// A resting, partially fillable limit order.
///
/// Invariant: `amount <= order_amount`; once tolerance-equal the order
/// is fully filled and leaves the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitBet {
    pub id: String,
    pub user_id: String,
    pub outcome: BinaryOutcome,
    /// Worst acceptable probability for the order's owner.
    pub limit_prob: f64,
    /// Total money requested.
    pub order_amount: f64,
    /// Money filled so far.
    pub amount: f64,
    pub created_time: i64,
}

impl LimitBet {
    /// Money still available to fill.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.order_amount - self.amount
    }
}

/// A committed bet document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub body: CandidateBet,
}

impl Bet {
    /// Whether this bet still participates in loan and payout
    /// accounting. Sold or refunded bets settled their loan at sale
    /// time and are excluded everywhere.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.body.is_sold && self.body.sale_amount.is_none()
    }
}

/// Everything the engine decides about a bet; the id and owner are
/// assigned by the storage layer at commit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateBet {
    pub contract_id: String,
    /// Outcome label: `"YES"`/`"NO"`, an answer id, or a bucket id.
    pub outcome: String,
    /// Money actually spent (taker total for limit orders).
    pub amount: f64,
    /// Shares received.
    pub shares: f64,
    pub prob_before: f64,
    pub prob_after: f64,
    #[serde(default)]
    pub fees: Fees,
    #[serde(default)]
    pub loan_amount: f64,
    pub created_time: i64,
    #[serde(default)]
    pub is_sold: bool,
    /// Refund amount when the bet was sold back; set externally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_amount: Option<f64>,
    /// Total requested, for limit orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_prob: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_filled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_cancelled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fills: Option<Vec<Fill>>,
    /// Numeric markets: the value the bettor picked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Numeric markets: stake spread over buckets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_bet_amounts: Option<HashMap<String, f64>>,
    /// Numeric markets: shares issued per bucket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_outcome_shares: Option<HashMap<String, f64>>,
}

impl CandidateBet {
    /// Stamp the candidate into a committed bet.
    #[must_use]
    pub fn into_bet(self, id: impl Into<String>, user_id: impl Into<String>) -> Bet {
        Bet {
            id: id.into(),
            user_id: user_id.into(),
            body: self,
        }
    }
}
