use thiserror::Error;
use wafcheck_driver::DriverError;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("config error: {0}")]
    Config(#[from] wafcheck_config::ConfigError),

    #[error("{0}")]
    Domain(#[from] wafcheck_domain::DomainError),

    #[error("availability zone lookup: {0}")]
    Zones(#[source] DriverError),

    #[error("apply failed: {0}")]
    Apply(#[source] DriverError),

    #[error("teardown failed: {0}")]
    Teardown(#[source] DriverError),

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}
