use thiserror::Error;

/// Errors raised while signing, sealing or configuring the simulation.
///
/// Duplicate blocks and out-of-order messages are not represented here:
/// the ledger drops them silently.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cryptographic failure: {0}")]
    Crypto(String),

    #[error("message #{0} failed signature verification")]
    InvalidPayload(u64),

    #[error("proof-of-work search cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot render report: {0}")]
    Report(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
