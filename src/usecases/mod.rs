//! Use-case layer - orchestration of the pricing kernels.
//!
//! Composes the domain math into the operations the exchange exposes:
//! fill matching, trade construction, payout dispatch, and the
//! read-compute-commit wrapper over the storage port.

pub mod betting;
pub mod matching;
pub mod payouts_dpm;
pub mod payouts_fixed;
pub mod resolution;
pub mod trading;

pub use betting::{BetError, CpmmBetResult, DpmBetResult};
pub use matching::{FillOutcome, MakerFill, MatchingError, TakerFill};
pub use resolution::{Payout, PayoutInfo, ResolutionError};
pub use trading::{Exchange, TradeError, TradeRequest};
