use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid unique id '{0}': expected 6 characters of [a-z0-9]")]
    InvalidUniqueId(String),

    #[error("invalid region: {0:?}")]
    InvalidRegion(String),

    #[error("region {region} returned {found} availability zone(s), need at least {required}")]
    InsufficientZones {
        region: String,
        found: usize,
        required: usize,
    },
}
