use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::DomainError;

/// Region used when neither the config file nor the environment names one.
pub const DEFAULT_REGION: &str = "us-west-2";

/// Number of characters in a [`UniqueId`].
pub const UNIQUE_ID_LEN: usize = 6;

const UNIQUE_ID_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Number of availability zones the WAF example configuration spreads across.
pub const REQUIRED_ZONES: usize = 2;

/// Input variables accepted by the example configuration.
pub const VAR_ACL_NAME: &str = "waf_acl_name";
pub const VAR_ACL_METRIC_NAME: &str = "waf_acl_metric_name";
pub const VAR_VPC_AZS: &str = "vpc_azs";

/// Environment variable the AWS provider reads its region from.
pub const ENV_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";

// ── Identifiers ──────────────────────────────────────────────────────────────

/// Lowercase suffix that makes every cloud resource name of a run unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueId(String);

impl UniqueId {
    /// Validate an externally supplied suffix. Uppercase input is folded to
    /// lowercase before checking.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let lowered = s.trim().to_ascii_lowercase();
        let valid = lowered.len() == UNIQUE_ID_LEN
            && lowered
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
        if !valid {
            return Err(DomainError::InvalidUniqueId(s.to_string()));
        }
        Ok(UniqueId(lowered))
    }

    /// Encode the low bits of `entropy` as [`UNIQUE_ID_LEN`] base-36 digits.
    /// 36^6 is about 2.2 billion distinct ids.
    pub fn from_entropy(mut entropy: u64) -> Self {
        let mut id = String::with_capacity(UNIQUE_ID_LEN);
        for _ in 0..UNIQUE_ID_LEN {
            id.push(UNIQUE_ID_ALPHABET[(entropy % 36) as usize] as char);
            entropy /= 36;
        }
        UniqueId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UniqueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region(String);

impl Region {
    pub fn new(s: impl Into<String>) -> Result<Self, DomainError> {
        let s = s.into();
        let valid = !s.is_empty()
            && s.contains('-')
            && s.bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if !valid {
            return Err(DomainError::InvalidRegion(s));
        }
        Ok(Region(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Region {
    fn default() -> Self {
        Region(DEFAULT_REGION.to_string())
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Naming ───────────────────────────────────────────────────────────────────

/// Web ACL name and CloudWatch metric name derived from one suffix.
///
/// The metric name has no hyphen: WAF metric names only allow alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclNames {
    pub acl_name: String,
    pub acl_metric_name: String,
}

impl AclNames {
    pub fn from_suffix(suffix: &UniqueId) -> Self {
        AclNames {
            acl_name: format!("waf-{}", suffix),
            acl_metric_name: format!("waf{}", suffix),
        }
    }
}

/// Take the first `count` zones, preserving the order the region returned them in.
pub fn select_zones(
    region: &Region,
    zones: &[String],
    count: usize,
) -> Result<Vec<String>, DomainError> {
    if zones.len() < count {
        return Err(DomainError::InsufficientZones {
            region: region.to_string(),
            found: zones.len(),
            required: count,
        });
    }
    Ok(zones[..count].to_vec())
}

// ── Terraform variables ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TfVar {
    String(String),
    List(Vec<String>),
}

impl TfVar {
    /// Render the right-hand side of a `-var key=value` argument.
    /// Lists become a JSON array, which Terraform accepts as an HCL tuple.
    pub fn render(&self) -> String {
        match self {
            TfVar::String(s) => s.clone(),
            TfVar::List(items) => {
                serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
            }
        }
    }
}

// ── Provisioning request ─────────────────────────────────────────────────────

/// Everything one apply/destroy cycle needs. Built once per run and never
/// mutated after the apply starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningRequest {
    pub suffix: UniqueId,
    pub region: Region,
    pub acl_name: String,
    pub acl_metric_name: String,
    pub availability_zones: Vec<String>,
    /// Directory the IaC tool runs in.
    pub terraform_dir: PathBuf,
    /// Environment overrides for the IaC subprocess only. Always carries
    /// `AWS_DEFAULT_REGION = region`.
    pub env: BTreeMap<String, String>,
}

impl ProvisioningRequest {
    /// Build a request from a suffix and the zones the region reported.
    /// Only the first [`REQUIRED_ZONES`] zones are kept.
    pub fn new(
        suffix: UniqueId,
        region: Region,
        zones: &[String],
        terraform_dir: impl Into<PathBuf>,
    ) -> Result<Self, DomainError> {
        let availability_zones = select_zones(&region, zones, REQUIRED_ZONES)?;
        let names = AclNames::from_suffix(&suffix);
        let mut env = BTreeMap::new();
        env.insert(ENV_DEFAULT_REGION.to_string(), region.to_string());

        Ok(ProvisioningRequest {
            suffix,
            region,
            acl_name: names.acl_name,
            acl_metric_name: names.acl_metric_name,
            availability_zones,
            terraform_dir: terraform_dir.into(),
            env,
        })
    }

    /// Add an environment override. `AWS_DEFAULT_REGION` always tracks the
    /// request's region and cannot be replaced here.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key != ENV_DEFAULT_REGION {
            self.env.insert(key, value.into());
        }
        self
    }

    /// Point the request at a different copy of the same configuration.
    pub fn relocated(mut self, terraform_dir: impl Into<PathBuf>) -> Self {
        self.terraform_dir = terraform_dir.into();
        self
    }

    pub fn vars(&self) -> BTreeMap<&'static str, TfVar> {
        let mut vars = BTreeMap::new();
        vars.insert(VAR_ACL_NAME, TfVar::String(self.acl_name.clone()));
        vars.insert(VAR_ACL_METRIC_NAME, TfVar::String(self.acl_metric_name.clone()));
        vars.insert(VAR_VPC_AZS, TfVar::List(self.availability_zones.clone()));
        vars
    }

    /// `-var key=value` pairs in variable-name order, ready to pass as
    /// separate process arguments.
    pub fn var_args(&self) -> Vec<String> {
        self.vars()
            .into_iter()
            .flat_map(|(k, v)| ["-var".to_string(), format!("{}={}", k, v.render())])
            .collect()
    }
}
