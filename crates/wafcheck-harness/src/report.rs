use serde::{Deserialize, Serialize};
use wafcheck_domain::ProvisioningRequest;
use wafcheck_driver::{Outputs, RunLog};

/// What one provisioning cycle did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// The request as applied, pointing at the staged copy when isolation is on.
    pub request: ProvisioningRequest,
    /// Every IaC command that completed, in order.
    pub runs: Vec<RunLog>,
    pub outputs: Outputs,
    /// False when the run was kept alive with `keep`.
    pub destroyed: bool,
}
