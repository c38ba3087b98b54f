//! Ports - trait boundaries to external collaborators.

pub mod store;

pub use store::{ContractSnapshot, ContractUpdate, MarketStore, ResolutionUpdate, StoreError};
