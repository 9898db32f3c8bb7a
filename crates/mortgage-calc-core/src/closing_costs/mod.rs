//! Closing-cost estimation: lender and third-party fees with state,
//! property-type and loan-type adjustments.

pub mod estimator;
pub mod fee_rules;

pub use estimator::{
    compute_closing_costs, estimate_closing_costs, ClosingCostBreakdown, ClosingCostEstimate,
    ClosingCostInputs, ClosingCostRequest,
};
pub use fee_rules::{
    Fee, FeeBasis, FeeDefinition, FeeGroup, FeeRule, FeeSchedule, RuleCondition, RuleEffect,
};
