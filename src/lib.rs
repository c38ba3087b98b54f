//! Exchange Engine — Library Root
//!
//! Market-maker and settlement engine for a prediction-market
//! exchange: CPMM and parimutuel pricing kernels, the limit-order
//! fill loop, and the resolution payout dispatcher, behind a
//! transactional storage port.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
