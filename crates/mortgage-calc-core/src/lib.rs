pub mod amortization;
pub mod config;
pub mod error;
pub mod format;
pub mod types;

#[cfg(feature = "closing_costs")]
pub mod closing_costs;

#[cfg(feature = "rate_comparison")]
pub mod rate_comparison;

#[cfg(feature = "loan_programs")]
pub mod loan_programs;

pub use error::MortgageCalcError;
pub use types::*;

/// Standard result type for all mortgage-calc operations
pub type MortgageCalcResult<T> = Result<T, MortgageCalcError>;
