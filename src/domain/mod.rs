//! Domain layer - pricing kernels and market documents.
//!
//! Pure business logic for the exchange engine: the CPMM and DPM
//! pricing math, tolerance primitives, and the document types shared
//! with the storage boundary. No I/O here (hexagonal inner ring);
//! everything is deterministic in its inputs and testable in
//! isolation.

pub mod bet;
pub mod cpmm;
pub mod dpm;
pub mod fees;
pub mod liquidity;
pub mod market;
pub mod math;

// Re-export core types for convenience
pub use bet::{Bet, CandidateBet, Fill, LimitBet};
pub use cpmm::{CpmmPool, CpmmState};
pub use fees::{FeeSchedule, Fees};
pub use liquidity::LiquidityProvision;
pub use market::{
    BinaryOutcome, Contract, CpmmMarket, DpmMarket, Mechanism, OutcomeType, ResolvedOutcome,
};
