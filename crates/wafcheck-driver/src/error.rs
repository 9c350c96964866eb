use thiserror::Error;
use wafcheck_domain::DomainError;

use crate::driver::IacStep;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("availability zone lookup failed: {0}")]
    ZoneLookup(String),

    #[error("aws credentials: {0}")]
    Credentials(String),

    /// The IaC tool ran but exited non-zero. `log` holds its combined output.
    #[error("{step} exited with code {code}")]
    CommandFailed {
        step: IacStep,
        code: i32,
        log: String,
    },

    #[error("{step} timed out after {secs}s")]
    Timeout { step: IacStep, secs: u64 },

    #[error("spawn {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("workspace error: {0}")]
    Workspace(String),

    #[error("parse terraform output: {0}")]
    OutputParse(String),

    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("internal driver error: {0}")]
    Internal(String),
}
