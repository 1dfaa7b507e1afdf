//! Per-asset signal scorers
//!
//! - `confirmation` - multi-signal ensemble agreement before acting
//! - `dump_risk` - early exit protection
//! - `indicators` - shared numeric helpers

pub mod confirmation;
pub mod dump_risk;
pub mod indicators;

pub use confirmation::{
    ConfirmationInput, ConfirmationResult, ConfirmationSignal, ConfirmationWeights,
    SignalConfirmation, SignalConfirmationConfig, TrendDirection,
};
pub use dump_risk::{DumpRiskConfig, DumpRiskDetector, DumpRiskFactors, DumpRiskResult, DumpRiskState};
