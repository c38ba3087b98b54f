//! Scenario Tests - Worked Market Lifecycles
//!
//! Walks the pricing, matching, and payout components through full
//! market lifecycles with hand-checked numbers: a binary CPMM market
//! with a resting limit order, a free-response market resolving
//! proportionally, and a bucketed numeric market.

use std::collections::HashMap;

use exchange_engine::domain::bet::{Bet, LimitBet};
use exchange_engine::domain::cpmm::{self, CpmmPool};
use exchange_engine::domain::fees::{FeeSchedule, Fees};
use exchange_engine::domain::market::{
    BinaryOutcome, Contract, CpmmMarket, DpmMarket, ResolvedOutcome,
};
use exchange_engine::usecases::betting::{self, DpmBetResult};
use exchange_engine::usecases::matching::compute_fills;
use exchange_engine::usecases::resolution::compute_payouts;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn cpmm_market(yes: f64, no: f64, p: f64) -> CpmmMarket {
    CpmmMarket {
        id: "market".to_string(),
        creator_id: "creator".to_string(),
        pool: CpmmPool { yes, no },
        p,
        total_liquidity: 100.0,
        collected_fees: Fees::default(),
        is_resolved: false,
        resolution: None,
        resolution_probability: None,
        created_time: 0,
        close_time: None,
    }
}

fn empty_dpm_market(id: &str) -> DpmMarket {
    DpmMarket {
        id: id.to_string(),
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
    }
}

fn apply_dpm_result(market: &mut DpmMarket, result: &DpmBetResult) {
    market.pool = result.pool.clone();
    market.total_shares = result.total_shares.clone();
    market.total_bets = result.total_bets.clone();
}

/// A symmetric pool prices YES at 0.5; buying 10 of
/// YES moves the price up and pays out more than 10 shares; a resting
/// NO order at 0.40 is then consumed by a YES taker before the pool,
/// because its price beats the pool's.
#[test]
fn test_binary_market_with_resting_order() {
    init_tracing();
    let schedule = FeeSchedule::zero();
    let state = cpmm::CpmmState::new(100.0, 100.0, 0.5);
    assert!((cpmm::probability(&state) - 0.5).abs() < 1e-12);

    // First trade: a plain YES market order for 10.
    let first = compute_fills(BinaryOutcome::Yes, 10.0, &state, None, &[], &schedule, 1_000)
        .unwrap();
    let shares: f64 = first.takers.iter().map(|t| t.shares).sum();
    assert!(shares > 10.0, "YES at even odds pays above par, got {shares}");
    let after_first = cpmm::probability(&first.state);
    assert!(after_first > 0.5);

    // Second trade: a NO limit order at 0.40. It sells the pool down
    // to its limit and rests with the remainder.
    let second = compute_fills(
        BinaryOutcome::No,
        100.0,
        &first.state,
        Some(0.4),
        &[],
        &schedule,
        2_000,
    )
    .unwrap();
    let filled: f64 = second.takers.iter().map(|t| t.amount).sum();
    assert!(filled < 100.0);
    assert!((cpmm::probability(&second.state) - 0.4).abs() < 1e-6);

    let resting = LimitBet {
        id: "no_maker".to_string(),
        user_id: "maker".to_string(),
        outcome: BinaryOutcome::No,
        limit_prob: 0.4,
        order_amount: 100.0,
        amount: filled,
        created_time: 2_000,
    };

    // Third trade: a YES buy of 50. The resting order offers YES at
    // 0.40 while the pool sits exactly there, so the book fills first.
    let third = compute_fills(
        BinaryOutcome::Yes,
        50.0,
        &second.state,
        None,
        &[resting.clone()],
        &schedule,
        3_000,
    )
    .unwrap();

    assert_eq!(third.takers[0].matched_bet_id, Some("no_maker".to_string()));
    assert_eq!(third.makers[0].bet_id, "no_maker");
    // The maker's whole remainder is consumed at its fixed price.
    assert!((third.makers[0].amount - resting.remaining()).abs() < 1e-9);
    assert!(
        (third.takers[0].amount - third.takers[0].shares * 0.4).abs() < 1e-9,
        "taker pays the maker's price per share"
    );
    // Only then does the residual demand move the pool.
    assert_eq!(third.takers[1].matched_bet_id, None);
    let total: f64 = third.takers.iter().map(|t| t.amount).sum();
    assert!((total - 50.0).abs() < 1e-9);
}

/// CPMM lifecycle with fees: two bets accumulate collected fees on
/// the contract, and a YES resolution pays winning shares, the
/// creator's fee, and nothing to the losing side.
#[test]
fn test_binary_market_resolution_with_fees() {
    init_tracing();
    let schedule = FeeSchedule::default();
    let mut market = cpmm_market(100.0, 100.0, 0.5);

    let alice = betting::cpmm_bet(
        &market,
        BinaryOutcome::Yes,
        50.0,
        None,
        &[],
        &schedule,
        1_000,
    )
    .unwrap();
    market.pool = alice.pool;
    market.p = alice.p;
    market.total_liquidity = alice.total_liquidity;
    market.collected_fees += alice.bet.fees;

    let bob = betting::cpmm_bet(
        &market,
        BinaryOutcome::No,
        30.0,
        None,
        &[],
        &schedule,
        2_000,
    )
    .unwrap();
    market.pool = bob.pool;
    market.p = bob.p;
    market.total_liquidity = bob.total_liquidity;
    market.collected_fees += bob.bet.fees;

    let bets = [
        alice.bet.clone().into_bet("b1", "alice"),
        bob.bet.clone().into_bet("b2", "bob"),
    ];
    let contract = Contract::CpmmBinary(market.clone());
    let info = compute_payouts(
        &ResolvedOutcome::Yes,
        &contract,
        &bets,
        &[],
        None,
        None,
        &schedule,
    )
    .unwrap();

    // Only the winning side appears; bob holds no loan, so no entry.
    assert_eq!(info.payouts.len(), 1);
    assert_eq!(info.payouts[0].user_id, "alice");
    assert!((info.payouts[0].payout - alice.bet.shares).abs() < 1e-9);
    assert!(info.creator_payout > 0.0);
    assert!(
        (info.creator_payout - market.collected_fees.creator_fee).abs() < 1e-9
    );

    // Identical inputs, identical output.
    let again = compute_payouts(
        &ResolvedOutcome::Yes,
        &contract,
        &bets,
        &[],
        None,
        None,
        &schedule,
    )
    .unwrap();
    assert_eq!(info, again);
}

/// A free-response market resolves MKT with weights
/// `{a: 0.7, b: 0.3}`. A bettor holding all of answer `a`'s shares
/// receives 0.7 of the total pool, and nothing from `b`.
#[test]
fn test_free_response_proportional_resolution() {
    init_tracing();
    let mut market = empty_dpm_market("fr");

    let alice = betting::dpm_free_response_bet(&market, "a", 14.0, 0.0, 1_000);
    apply_dpm_result(&mut market, &alice);
    let bob = betting::dpm_free_response_bet(&market, "b", 6.0, 0.0, 2_000);
    apply_dpm_result(&mut market, &bob);

    let bets: [Bet; 2] = [
        alice.bet.clone().into_bet("b1", "alice"),
        bob.bet.clone().into_bet("b2", "bob"),
    ];
    let weights: HashMap<String, f64> =
        [("a".to_string(), 0.7), ("b".to_string(), 0.3)].into();
    let contract = Contract::DpmFreeResponse(market.clone());

    let info = compute_payouts(
        &ResolvedOutcome::Mkt,
        &contract,
        &bets,
        &[],
        Some(&weights),
        None,
        &FeeSchedule::zero(),
    )
    .unwrap();

    // Pool totals 20. Alice owns all of a's shares: 0.7 * 20.
    let alice_payout = info
        .payouts
        .iter()
        .find(|p| p.user_id == "alice")
        .unwrap()
        .payout;
    assert!((alice_payout - 0.7 * 20.0).abs() < 1e-9);
    let bob_payout = info
        .payouts
        .iter()
        .find(|p| p.user_id == "bob")
        .unwrap()
        .payout;
    assert!((bob_payout - 0.3 * 20.0).abs() < 1e-9);

    // MKT with weights conserves the pool when no fees apply.
    let paid: f64 = info.payouts.iter().map(|p| p.payout).sum();
    assert!((paid - 20.0).abs() < 1e-9);
}

/// Numeric lifecycle: two spread bets on different buckets, then the
/// market resolves to one bucket and pays by bucket shares.
#[test]
fn test_numeric_market_bucket_resolution() {
    init_tracing();
    let mut market = empty_dpm_market("num");
    let bucket_count = 20;

    let alice = betting::dpm_numeric_bet(&market, bucket_count, 7.0, "7", 30.0, 1_000)
        .unwrap();
    apply_dpm_result(&mut market, &alice);
    let bob = betting::dpm_numeric_bet(&market, bucket_count, 15.0, "15", 10.0, 2_000)
        .unwrap();
    apply_dpm_result(&mut market, &bob);

    // Each spread conserves its stake.
    let alice_stakes: f64 = alice.bet.all_bet_amounts.as_ref().unwrap().values().sum();
    assert!((alice_stakes - 30.0).abs() < 1e-9);
    assert!((market.pool_total() - 40.0).abs() < 1e-9);

    let bets = [
        alice.bet.clone().into_bet("b1", "alice"),
        bob.bet.clone().into_bet("b2", "bob"),
    ];
    let contract = Contract::DpmNumeric {
        market: market.clone(),
        bucket_count,
        min: 0.0,
        max: 20.0,
    };
    let info = compute_payouts(
        &ResolvedOutcome::Answer("7".to_string()),
        &contract,
        &bets,
        &[],
        None,
        None,
        &FeeSchedule::zero(),
    )
    .unwrap();

    // Bob's spread around bucket 15 never reaches bucket 7, so alice
    // alone splits the pool.
    assert_eq!(info.payouts.len(), 1);
    assert_eq!(info.payouts[0].user_id, "alice");
    assert!((info.payouts[0].payout - 40.0).abs() < 1e-9);
}
