//! Error types for shardbank

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Protocol Errors ===
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    // === Routing Errors ===
    #[error("No workers available")]
    NoWorkersAvailable,

    #[error("Worker unavailable: {0}")]
    WorkerUnavailable(String),

    // === RPC Errors ===
    #[error("Worker RPC timeout")]
    Timeout,

    // === Transfer Errors ===
    #[error("Debit failed: {0}")]
    DebitFailed(String),

    #[error("Credit failed: {0}")]
    CreditFailed(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Is this a failure of a single worker exchange (as opposed to a
    /// coordinator-side problem)?
    pub fn is_exchange_failure(&self) -> bool {
        matches!(self, Error::Timeout | Error::WorkerUnavailable(_))
    }

    /// Convert to the single-line wire form sent back to bank clients.
    ///
    /// None of these terminate the client connection; the line is the
    /// command's entire result.
    pub fn wire_line(&self) -> String {
        match self {
            Error::MalformedRequest(_) => "ERROR|FormatoInvalido".to_string(),
            Error::UnknownCommand(_) => "ERROR|UnknownCommand".to_string(),
            Error::NoWorkersAvailable => "ERROR|NoWorkers".to_string(),
            Error::WorkerUnavailable(_) => "ERROR|WorkerUnavailable".to_string(),
            Error::Timeout => "ERROR|Timeout".to_string(),
            Error::DebitFailed(detail) => format!("ERROR|DebitFailed|{}", detail),
            Error::CreditFailed(detail) => format!("ERROR|CreditFailed|{}", detail),
            _ => "ERROR|Internal".to_string(),
        }
    }

    /// Short reason used when a failed exchange becomes the detail field
    /// of a composite result (e.g. `ERROR|DebitFailed|Timeout`).
    pub fn exchange_reason(&self) -> String {
        match self {
            Error::Timeout => "Timeout".to_string(),
            Error::WorkerUnavailable(_) => "WorkerUnavailable".to_string(),
            other => other.to_string(),
        }
    }
}

// Implement From for common error types
impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Internal(e.to_string())
    }
}
