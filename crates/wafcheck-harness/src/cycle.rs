use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};
use wafcheck_config::HarnessConfig;
use wafcheck_domain::{ProvisioningRequest, UniqueId};
use wafcheck_driver::{
    remove_workspace, stage_workspace, AwsZoneLookup, DriverError, IacTool, Outputs, RunLog,
    TeardownGuard, TerraformRunner, ZoneLookup,
};

use crate::error::HarnessError;
use crate::report::CycleReport;

/// Drives one provision/verify/teardown cycle against the example
/// configuration.
pub struct Harness {
    config: HarnessConfig,
    zones: Arc<dyn ZoneLookup>,
    tool: Arc<dyn IacTool>,
}

impl Harness {
    pub fn new(
        config: HarnessConfig,
        zones: Arc<dyn ZoneLookup>,
        tool: Arc<dyn IacTool>,
    ) -> Self {
        Self { config, zones, tool }
    }

    /// Wire up the real EC2 zone lookup and the configured IaC binary.
    pub async fn from_config(config: HarnessConfig) -> Result<Self, HarnessError> {
        let zones = AwsZoneLookup::from_env().await.map_err(HarnessError::Zones)?;
        let tool = TerraformRunner::new(config.tool.clone()).with_timeout(config.timeout());
        Ok(Self::new(config, Arc::new(zones), Arc::new(tool)))
    }

    /// Look up the region's zones and build the request for `suffix`,
    /// pointing at the configuration in the checkout.
    pub async fn build_request(&self, suffix: UniqueId) -> Result<ProvisioningRequest, HarnessError> {
        let region = self.config.region.clone();
        let zones = self
            .zones
            .availability_zones(&region)
            .await
            .map_err(HarnessError::Zones)?;
        info!(region = %region, found = zones.len(), "availability zones resolved");

        let request =
            ProvisioningRequest::new(suffix, region, &zones, self.config.terraform_path())?;
        Ok(self
            .config
            .env
            .iter()
            .fold(request, |req, (k, v)| req.with_env(k, v)))
    }

    /// Stage a private copy for the request when isolation is on. Returns the
    /// relocated request and the staged root to clean up afterwards.
    pub fn prepare_workspace(
        &self,
        request: ProvisioningRequest,
    ) -> Result<(ProvisioningRequest, Option<PathBuf>), HarnessError> {
        if !self.config.isolate_workspace {
            return Ok((request, None));
        }
        let dest = self.config.staging_dir(request.suffix.as_str());
        let staged = stage_workspace(
            &self.config.module_root,
            &self.config.terraform_dir,
            &self.config.work_dir,
            &dest,
        )?;
        Ok((request.relocated(staged.terraform_dir), Some(staged.root)))
    }

    pub fn arm_teardown(&self, request: ProvisioningRequest) -> TeardownGuard {
        TeardownGuard::arm(Arc::clone(&self.tool), request)
    }

    /// Provision, read outputs, and destroy.
    pub async fn run_cycle(&self, suffix: UniqueId) -> Result<CycleReport, HarnessError> {
        self.run_cycle_with(suffix, false).await
    }

    /// Same as [`Harness::run_cycle`]. With `keep`, a successful apply is left
    /// running and must be removed later with [`Harness::destroy_kept`].
    pub async fn run_cycle_with(
        &self,
        suffix: UniqueId,
        keep: bool,
    ) -> Result<CycleReport, HarnessError> {
        let request = self.build_request(suffix).await?;
        let (request, staged_root) = self.prepare_workspace(request)?;

        info!(
            tool = self.tool.name(),
            acl_name = %request.acl_name,
            zones = ?request.availability_zones,
            dir = %request.terraform_dir.display(),
            "starting provisioning cycle"
        );

        let guard = self.arm_teardown(request.clone());

        let mut runs = match self.tool.init_and_apply(&request).await {
            Ok(runs) => runs,
            Err(e) => {
                error!(acl_name = %request.acl_name, error = %e, "provisioning failed");
                if let Err(destroy_err) = guard.finish().await {
                    error!(error = %destroy_err, "teardown after failed apply also failed");
                }
                return Err(HarnessError::Apply(e));
            }
        };

        let outputs = if self.config.read_outputs {
            self.read_outputs(&request, &mut runs).await
        } else {
            Outputs::new()
        };

        if keep {
            guard.disarm();
            return Ok(CycleReport {
                request,
                runs,
                outputs,
                destroyed: false,
            });
        }

        match guard.finish().await {
            Ok(Some(run)) => runs.push(run),
            Ok(None) => {}
            Err(e) => return Err(HarnessError::Teardown(e)),
        }
        if let Some(root) = staged_root {
            cleanup(&root);
        }

        info!(acl_name = %request.acl_name, "provisioning cycle complete");
        Ok(CycleReport {
            request,
            runs,
            outputs,
            destroyed: true,
        })
    }

    /// Destroy a run previously left in place with `keep`.
    pub async fn destroy_kept(&self, suffix: UniqueId) -> Result<ProvisioningRequest, HarnessError> {
        let mut request = self.build_request(suffix).await?;
        let mut staged_root = None;
        if self.config.isolate_workspace {
            let root = self.config.staging_dir(request.suffix.as_str());
            let dir = root.join(&self.config.terraform_dir);
            if !dir.is_dir() {
                return Err(DriverError::Workspace(format!(
                    "no kept workspace at {}",
                    dir.display()
                ))
                .into());
            }
            request = request.relocated(dir);
            staged_root = Some(root);
        }

        let guard = self.arm_teardown(request.clone());
        guard.finish().await.map_err(HarnessError::Teardown)?;
        if let Some(root) = staged_root {
            cleanup(&root);
        }
        Ok(request)
    }

    async fn read_outputs(
        &self,
        request: &ProvisioningRequest,
        runs: &mut Vec<RunLog>,
    ) -> Outputs {
        match self.tool.output(request).await {
            Ok((run, outputs)) => {
                runs.push(run);
                outputs
            }
            Err(e) => {
                warn!(error = %e, "could not read outputs; continuing to teardown");
                Outputs::new()
            }
        }
    }
}

fn cleanup(root: &Path) {
    if let Err(e) = remove_workspace(root) {
        warn!(dir = %root.display(), error = %e, "could not remove staged workspace");
    }
}
