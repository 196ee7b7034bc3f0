use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Zero, negative or non-finite package amount. Callers must not pass these.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(f64),

    /// Amount so small that the per-unit multiplier overflows
    #[error("amount {0} is too small to price per unit")]
    UnboundedMultiplier(f64),
}
