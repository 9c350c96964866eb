use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wafcheck_domain::{ProvisioningRequest, Region};

use crate::error::DriverError;

/// Values read from `terraform output -json`, keyed by output name.
pub type Outputs = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IacStep {
    Init,
    Validate,
    Apply,
    Destroy,
    Output,
}

impl IacStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            IacStep::Init => "init",
            IacStep::Validate => "validate",
            IacStep::Apply => "apply",
            IacStep::Destroy => "destroy",
            IacStep::Output => "output",
        }
    }
}

impl std::fmt::Display for IacStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "terraform {}", self.as_str())
    }
}

/// Record of one completed IaC command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    pub step: IacStep,
    pub exit_code: i32,
    /// Combined stdout+stderr.
    pub log: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Source of the availability zones of a region.
#[async_trait]
pub trait ZoneLookup: Send + Sync {
    /// Zone names in the order the provider returns them.
    async fn availability_zones(&self, region: &Region) -> Result<Vec<String>, DriverError>;
}

/// An infrastructure-as-code engine driven over a directory of configuration.
///
/// Every mutating call receives the full request so `apply` and `destroy`
/// see the same variables and environment.
#[async_trait]
pub trait IacTool: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn init(&self, request: &ProvisioningRequest) -> Result<RunLog, DriverError>;

    async fn validate(&self, request: &ProvisioningRequest) -> Result<RunLog, DriverError>;

    async fn apply(&self, request: &ProvisioningRequest) -> Result<RunLog, DriverError>;

    async fn destroy(&self, request: &ProvisioningRequest) -> Result<RunLog, DriverError>;

    async fn output(
        &self,
        request: &ProvisioningRequest,
    ) -> Result<(RunLog, Outputs), DriverError>;

    /// `init`, `validate`, then `apply`, stopping at the first failure.
    async fn init_and_apply(
        &self,
        request: &ProvisioningRequest,
    ) -> Result<Vec<RunLog>, DriverError> {
        let mut runs = Vec::with_capacity(3);
        runs.push(self.init(request).await?);
        runs.push(self.validate(request).await?);
        runs.push(self.apply(request).await?);
        Ok(runs)
    }
}
