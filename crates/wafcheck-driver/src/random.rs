use uuid::Uuid;
use wafcheck_domain::UniqueId;

/// Fresh lowercase resource-name suffix, drawn from the random half of a v4 UUID.
pub fn random_unique_id() -> UniqueId {
    let (_, random_bits) = Uuid::new_v4().as_u64_pair();
    UniqueId::from_entropy(random_bits)
}
