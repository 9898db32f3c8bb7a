use thiserror::Error;

#[derive(Debug, Error)]
pub enum MortgageCalcError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Numeric overflow in {context}")]
    NumericOverflow { context: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl MortgageCalcError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        MortgageCalcError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for MortgageCalcError {
    fn from(e: serde_json::Error) -> Self {
        MortgageCalcError::SerializationError(e.to_string())
    }
}
