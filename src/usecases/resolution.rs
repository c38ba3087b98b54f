//! Payout dispatch - turns a resolved outcome into balance transfers.
//!
//! Pure function of the resolution inputs: identical arguments always
//! produce the identical payout list, so the storage layer may safely
//! recompute inside a retried transaction (but must commit at most
//! once). Dispatches by mechanism, then by resolution class, then
//! merges loan recoupment into the trader payouts.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::bet::Bet;
use crate::domain::fees::{FeeSchedule, Fees};
use crate::domain::liquidity::LiquidityProvision;
use crate::domain::market::{BinaryOutcome, Contract, ResolvedOutcome};
use super::{payouts_dpm, payouts_fixed};

/// One balance transfer owed to a user. Negative for loan recoupment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub user_id: String,
    pub payout: f64,
}

/// Everything the resolution transaction must apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutInfo {
    /// Trader payouts, net of loans, one entry per user, sorted by
    /// user id.
    pub payouts: Vec<Payout>,
    /// Accumulated creator fee owed to the market creator.
    pub creator_payout: f64,
    /// Residual pool value owed to liquidity providers.
    pub liquidity_payouts: Vec<Payout>,
    /// Final fee accumulator to stamp on the resolved contract.
    pub collected_fees: Fees,
}

/// Preconditions the caller must guarantee before dispatching.
#[derive(Debug, Error, PartialEq)]
pub enum ResolutionError {
    #[error("multi-outcome MKT resolution requires an outcome weight map")]
    MissingResolutionWeights,
    #[error("outcome `{0}` cannot resolve this market")]
    UnsupportedOutcome(String),
}

/// Loan recoupment entries: each open bet with an outstanding loan
/// owes it back at resolution.
fn loan_payouts(bets: &[&Bet]) -> Vec<Payout> {
    bets
        .iter()
        .filter(|bet| bet.body.loan_amount != 0.0)
        .map(|bet| Payout {
            user_id: bet.user_id.clone(),
            payout: -bet.body.loan_amount,
        })
        .collect()
}

/// Sum payouts per user, in sorted user-id order so repeated runs
/// produce identical lists.
#[must_use]
pub fn group_payouts_by_user(payouts: impl IntoIterator<Item = Payout>) -> Vec<Payout> {
    let mut by_user: BTreeMap<String, f64> = BTreeMap::new();
    for payout in payouts {
        *by_user.entry(payout.user_id).or_insert(0.0) += payout.payout;
    }
    by_user
        .into_iter()
        .map(|(user_id, payout)| Payout { user_id, payout })
        .collect()
}

/// Compute every transfer owed for a market resolution.
///
/// `resolutions` is the explicit weight map required by free-response
/// MKT resolutions; `resolution_probability` overrides the market
/// price for binary MKT resolutions. Sold and refunded bets are
/// excluded throughout; their loans were settled at sale time.
pub fn compute_payouts(
    outcome: &ResolvedOutcome,
    contract: &Contract,
    bets: &[Bet],
    liquidities: &[LiquidityProvision],
    resolutions: Option<&HashMap<String, f64>>,
    resolution_probability: Option<f64>,
    schedule: &FeeSchedule,
) -> Result<PayoutInfo, ResolutionError> {
    let open_bets: Vec<&Bet> = bets.iter().filter(|bet| bet.is_open()).collect();

    let info = match contract {
        Contract::CpmmBinary(market) | Contract::CpmmPseudoNumeric { market, .. } => {
            match outcome {
                ResolvedOutcome::Yes => {
                    payouts_fixed::standard_payouts(BinaryOutcome::Yes, market, &open_bets, liquidities)
                }
                ResolvedOutcome::No => {
                    payouts_fixed::standard_payouts(BinaryOutcome::No, market, &open_bets, liquidities)
                }
                ResolvedOutcome::Mkt => {
                    payouts_fixed::mkt_payouts(market, &open_bets, liquidities, resolution_probability)
                }
                ResolvedOutcome::Cancel => payouts_fixed::cancel_payouts(&open_bets, liquidities),
                ResolvedOutcome::Answer(id) => {
                    return Err(ResolutionError::UnsupportedOutcome(id.clone()));
                }
            }
        }

        Contract::DpmBinary(market) => match outcome {
            ResolvedOutcome::Yes | ResolvedOutcome::No => {
                let label = outcome.to_string();
                payouts_dpm::standard_payouts(&label, market, &open_bets, schedule)
            }
            ResolvedOutcome::Mkt => {
                payouts_dpm::mkt_payouts(market, &open_bets, resolution_probability, schedule)
            }
            ResolvedOutcome::Cancel => payouts_dpm::cancel_payouts(market, &open_bets),
            ResolvedOutcome::Answer(id) => {
                return Err(ResolutionError::UnsupportedOutcome(id.clone()));
            }
        },

        Contract::DpmFreeResponse(market) => match outcome {
            ResolvedOutcome::Mkt => {
                let weights = resolutions
                    .or(market.resolutions.as_ref())
                    .ok_or(ResolutionError::MissingResolutionWeights)?;
                payouts_dpm::multi_outcome_payouts(weights, market, &open_bets, schedule)
            }
            ResolvedOutcome::Cancel => payouts_dpm::cancel_payouts(market, &open_bets),
            ResolvedOutcome::Answer(id) => {
                payouts_dpm::standard_payouts(id, market, &open_bets, schedule)
            }
            ResolvedOutcome::Yes | ResolvedOutcome::No => {
                return Err(ResolutionError::UnsupportedOutcome(outcome.to_string()));
            }
        },

        Contract::DpmNumeric { market, .. } => match outcome {
            ResolvedOutcome::Answer(bucket) => {
                payouts_dpm::numeric_payouts(bucket, market, &open_bets, schedule)
            }
            ResolvedOutcome::Mkt => {
                payouts_dpm::mkt_payouts(market, &open_bets, resolution_probability, schedule)
            }
            ResolvedOutcome::Cancel => payouts_dpm::cancel_payouts(market, &open_bets),
            ResolvedOutcome::Yes | ResolvedOutcome::No => {
                return Err(ResolutionError::UnsupportedOutcome(outcome.to_string()));
            }
        },
    };

    let PayoutInfo {
        payouts: resolution_payouts,
        creator_payout,
        liquidity_payouts,
        collected_fees,
    } = info;

    let loans = loan_payouts(&open_bets);
    let payouts = group_payouts_by_user(resolution_payouts.into_iter().chain(loans));

    info!(
        contract_id = contract.id(),
        outcome = %outcome,
        payout_count = payouts.len(),
        liquidity_payout_count = liquidity_payouts.len(),
        creator_payout,
        "Resolution payouts computed"
    );

    Ok(PayoutInfo {
        payouts,
        creator_payout,
        liquidity_payouts,
        collected_fees,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bet::CandidateBet;
    use crate::domain::cpmm::CpmmPool;
    use crate::domain::market::CpmmMarket;

    fn cpmm_contract(yes: f64, no: f64) -> Contract {
        Contract::CpmmBinary(CpmmMarket {
            id: "c1".to_string(),
            creator_id: "creator".to_string(),
            pool: CpmmPool { yes, no },
            p: 0.5,
            total_liquidity: 100.0,
            collected_fees: Fees::default(),
            is_resolved: false,
            resolution: None,
            resolution_probability: None,
            created_time: 0,
            close_time: None,
        })
    }

    fn bet(user: &str, outcome: &str, amount: f64, shares: f64, loan: f64) -> Bet {
        CandidateBet {
            contract_id: "c1".to_string(),
            outcome: outcome.to_string(),
            amount,
            shares,
            prob_before: 0.5,
            prob_after: 0.5,
            fees: Fees::default(),
            loan_amount: loan,
            created_time: 0,
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
        .into_bet(format!("bet_{user}_{outcome}"), user)
    }

    #[test]
    fn test_loans_merged_as_negative_entries() {
        let contract = cpmm_contract(50.0, 150.0);
        let bets = [
            bet("alice", "YES", 10.0, 30.0, 8.0),
            bet("bob", "NO", 10.0, 15.0, 2.0),
        ];
        let info = compute_payouts(
            &ResolvedOutcome::Yes,
            &contract,
            &bets,
            &[],
            None,
            None,
            &FeeSchedule::zero(),
        )
        .unwrap();

        // alice: 30 shares - 8 loan; bob: 0 - 2 loan.
        assert_eq!(info.payouts.len(), 2);
        assert_eq!(info.payouts[0].user_id, "alice");
        assert!((info.payouts[0].payout - 22.0).abs() < 1e-9);
        assert_eq!(info.payouts[1].user_id, "bob");
        assert!((info.payouts[1].payout - -2.0).abs() < 1e-9);
    }

    #[test]
    fn test_sold_bets_are_excluded() {
        let contract = cpmm_contract(50.0, 150.0);
        let mut sold = bet("alice", "YES", 10.0, 30.0, 5.0);
        sold.body.is_sold = true;
        let open = bet("bob", "YES", 10.0, 12.0, 0.0);

        let info = compute_payouts(
            &ResolvedOutcome::Yes,
            &contract,
            &[sold, open],
            &[],
            None,
            None,
            &FeeSchedule::zero(),
        )
        .unwrap();

        assert_eq!(info.payouts.len(), 1);
        assert_eq!(info.payouts[0].user_id, "bob");
        assert_eq!(info.payouts[0].payout, 12.0);
    }

    #[test]
    fn test_free_response_mkt_requires_weights() {
        let contract = Contract::DpmFreeResponse(crate::domain::market::DpmMarket {
            id: "d1".to_string(),
            creator_id: "creator".to_string(),
            pool: HashMap::new(),
            total_shares: HashMap::new(),
            total_bets: HashMap::new(),
            collected_fees: Fees::default(),
            is_resolved: false,
            resolution: None,
            resolution_probability: None,
            resolutions: None,
            created_time: 0,
            close_time: None,
        });

        let result = compute_payouts(
            &ResolvedOutcome::Mkt,
            &contract,
            &[],
            &[],
            None,
            None,
            &FeeSchedule::zero(),
        );
        assert_eq!(result, Err(ResolutionError::MissingResolutionWeights));
    }

    #[test]
    fn test_answer_resolution_rejected_for_binary_cpmm() {
        let contract = cpmm_contract(100.0, 100.0);
        let result = compute_payouts(
            &ResolvedOutcome::Answer("7".to_string()),
            &contract,
            &[],
            &[],
            None,
            None,
            &FeeSchedule::zero(),
        );
        assert_eq!(
            result,
            Err(ResolutionError::UnsupportedOutcome("7".to_string()))
        );
    }

    #[test]
    fn test_identical_inputs_identical_payouts() {
        let contract = cpmm_contract(80.0, 120.0);
        let bets = [
            bet("carol", "YES", 5.0, 9.0, 1.0),
            bet("alice", "YES", 10.0, 30.0, 0.0),
            bet("bob", "NO", 10.0, 15.0, 3.0),
        ];
        let run = || {
            compute_payouts(
                &ResolvedOutcome::Mkt,
                &contract,
                &bets,
                &[],
                None,
                Some(0.6),
                &FeeSchedule::zero(),
            )
            .unwrap()
        };
        assert_eq!(run(), run());
    }
}
