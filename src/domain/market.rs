//! Market (contract) documents and outcome labels.
//!
//! A contract is the unit the storage layer persists: one market with
//! its mechanism state, fee accumulator, and resolution fields. The
//! mechanism/outcome-type combinations are a closed set, so `Contract`
//! is a tagged union with one variant per concrete combination — each
//! variant carries only the fields its mechanism actually uses, and
//! the pricing/payout components dispatch on the variant.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::cpmm::{CpmmPool, CpmmState};
use super::fees::Fees;

/// Pricing mechanism discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mechanism {
    /// Weighted constant-product market maker.
    Cpmm,
    /// Dynamic parimutuel.
    Dpm,
}

/// Outcome-type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeType {
    Binary,
    PseudoNumeric,
    FreeResponse,
    Numeric,
}

/// The two sides of a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BinaryOutcome {
    Yes,
    No,
}

impl BinaryOutcome {
    /// Canonical document label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }

    /// The other side.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }

    /// Parse a document label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "YES" => Some(Self::Yes),
            "NO" => Some(Self::No),
            _ => None,
        }
    }
}

impl fmt::Display for BinaryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The outcome a market resolved to.
///
/// `Answer` carries a free-response answer id or a numeric bucket id;
/// the payout dispatcher decides which by the contract variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResolvedOutcome {
    Yes,
    No,
    /// Probabilistic / proportional resolution.
    Mkt,
    /// Market voided; stakes are refunded.
    Cancel,
    Answer(String),
}

impl From<String> for ResolvedOutcome {
    fn from(label: String) -> Self {
        match label.as_str() {
            "YES" => Self::Yes,
            "NO" => Self::No,
            "MKT" => Self::Mkt,
            "CANCEL" => Self::Cancel,
            _ => Self::Answer(label),
        }
    }
}

impl From<ResolvedOutcome> for String {
    fn from(outcome: ResolvedOutcome) -> Self {
        match outcome {
            ResolvedOutcome::Yes => "YES".to_string(),
            ResolvedOutcome::No => "NO".to_string(),
            ResolvedOutcome::Mkt => "MKT".to_string(),
            ResolvedOutcome::Cancel => "CANCEL".to_string(),
            ResolvedOutcome::Answer(id) => id,
        }
    }
}

impl fmt::Display for ResolvedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "YES"),
            Self::No => write!(f, "NO"),
            Self::Mkt => write!(f, "MKT"),
            Self::Cancel => write!(f, "CANCEL"),
            Self::Answer(id) => write!(f, "{id}"),
        }
    }
}

/// Mechanism state of a constant-product market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpmmMarket {
    pub id: String,
    pub creator_id: String,
    /// YES/NO reserves backing the invariant curve.
    pub pool: CpmmPool,
    /// Curve weight, in (0, 1).
    pub p: f64,
    /// Cumulative liquidity subsidy, including reinvested liquidity fees.
    pub total_liquidity: f64,
    /// Fees accumulated across all committed bets.
    #[serde(default)]
    pub collected_fees: Fees,
    pub is_resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolvedOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_probability: Option<f64>,
    pub created_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_time: Option<i64>,
}

impl CpmmMarket {
    /// Snapshot of the pricing state consumed by the CPMM kernel.
    #[must_use]
    pub fn state(&self) -> CpmmState {
        CpmmState {
            pool: self.pool,
            p: self.p,
        }
    }
}

/// Mechanism state of a parimutuel market.
///
/// Pools and share totals are keyed by outcome label: `"YES"`/`"NO"`
/// for binary, answer ids for free-response, bucket ids (`"0"`..) for
/// bucketed-numeric. Phantom seed shares from the market ante are
/// folded into `total_shares` at creation by the (external) creation
/// path, so the kernel treats all shares uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DpmMarket {
    pub id: String,
    pub creator_id: String,
    /// Stake collected per outcome.
    pub pool: HashMap<String, f64>,
    /// Shares issued per outcome.
    pub total_shares: HashMap<String, f64>,
    /// Bet amounts per outcome.
    pub total_bets: HashMap<String, f64>,
    #[serde(default)]
    pub collected_fees: Fees,
    pub is_resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolvedOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_probability: Option<f64>,
    /// Outcome weights of a multi-outcome MKT resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolutions: Option<HashMap<String, f64>>,
    pub created_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_time: Option<i64>,
}

impl DpmMarket {
    /// Total stake across every outcome pool.
    #[must_use]
    pub fn pool_total(&self) -> f64 {
        self.pool.values().sum()
    }
}

/// A market document: one variant per mechanism/outcome-type combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcomeType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Contract {
    /// CPMM market resolving YES/NO.
    #[serde(rename = "BINARY")]
    CpmmBinary(CpmmMarket),
    /// CPMM market whose probability maps to a numeric value range.
    #[serde(rename = "PSEUDO_NUMERIC", rename_all = "camelCase")]
    CpmmPseudoNumeric {
        #[serde(flatten)]
        market: CpmmMarket,
        min: f64,
        max: f64,
        is_log_scale: bool,
    },
    /// Legacy parimutuel YES/NO market.
    #[serde(rename = "DPM_BINARY")]
    DpmBinary(DpmMarket),
    /// Parimutuel market over user-submitted answers.
    #[serde(rename = "FREE_RESPONSE")]
    DpmFreeResponse(DpmMarket),
    /// Parimutuel market over fixed numeric buckets.
    #[serde(rename = "NUMERIC", rename_all = "camelCase")]
    DpmNumeric {
        #[serde(flatten)]
        market: DpmMarket,
        bucket_count: usize,
        min: f64,
        max: f64,
    },
}

impl Contract {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::CpmmBinary(m) | Self::CpmmPseudoNumeric { market: m, .. } => &m.id,
            Self::DpmBinary(m)
            | Self::DpmFreeResponse(m)
            | Self::DpmNumeric { market: m, .. } => &m.id,
        }
    }

    #[must_use]
    pub fn creator_id(&self) -> &str {
        match self {
            Self::CpmmBinary(m) | Self::CpmmPseudoNumeric { market: m, .. } => &m.creator_id,
            Self::DpmBinary(m)
            | Self::DpmFreeResponse(m)
            | Self::DpmNumeric { market: m, .. } => &m.creator_id,
        }
    }

    #[must_use]
    pub fn mechanism(&self) -> Mechanism {
        match self {
            Self::CpmmBinary(_) | Self::CpmmPseudoNumeric { .. } => Mechanism::Cpmm,
            _ => Mechanism::Dpm,
        }
    }

    #[must_use]
    pub fn outcome_type(&self) -> OutcomeType {
        match self {
            Self::CpmmBinary(_) => OutcomeType::Binary,
            Self::CpmmPseudoNumeric { .. } => OutcomeType::PseudoNumeric,
            Self::DpmBinary(_) => OutcomeType::Binary,
            Self::DpmFreeResponse(_) => OutcomeType::FreeResponse,
            Self::DpmNumeric { .. } => OutcomeType::Numeric,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        match self {
            Self::CpmmBinary(m) | Self::CpmmPseudoNumeric { market: m, .. } => m.is_resolved,
            Self::DpmBinary(m)
            | Self::DpmFreeResponse(m)
            | Self::DpmNumeric { market: m, .. } => m.is_resolved,
        }
    }

    /// CPMM mechanism state, if this is a CPMM market.
    #[must_use]
    pub fn as_cpmm(&self) -> Option<&CpmmMarket> {
        match self {
            Self::CpmmBinary(m) | Self::CpmmPseudoNumeric { market: m, .. } => Some(m),
            _ => None,
        }
    }

    /// DPM mechanism state, if this is a parimutuel market.
    #[must_use]
    pub fn as_dpm(&self) -> Option<&DpmMarket> {
        match self {
            Self::DpmBinary(m)
            | Self::DpmFreeResponse(m)
            | Self::DpmNumeric { market: m, .. } => Some(m),
            _ => None,
        }
    }
}
