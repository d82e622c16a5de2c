use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonetaryError {
    #[error("Monetary error: {0}")]
    InvalidFormat(String),
    #[error("Monetary error: more than {0} decimal places")]
    TooPrecise(u32),
    #[error("Monetary error: Overflow")]
    Overflow
}
