//! Scoped teardown for provisioned infrastructure.
//!
//! A [`TeardownGuard`] is armed right before the first mutating call. It runs
//! `destroy` exactly once: explicitly through [`TeardownGuard::finish`], or
//! from `Drop` when the owning scope exits early (`?`, assertion failure,
//! panic). A hard abort of the process still leaks, nothing can catch that.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};
use wafcheck_domain::ProvisioningRequest;

use crate::driver::{IacTool, RunLog};
use crate::error::DriverError;

pub struct TeardownGuard {
    tool: Arc<dyn IacTool>,
    request: ProvisioningRequest,
    armed: AtomicBool,
}

impl TeardownGuard {
    /// Register a destroy of `request` with `tool`.
    pub fn arm(tool: Arc<dyn IacTool>, request: ProvisioningRequest) -> Self {
        info!(
            acl_name = %request.acl_name,
            dir = %request.terraform_dir.display(),
            "teardown registered"
        );
        Self {
            tool,
            request,
            armed: AtomicBool::new(true),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Run the destroy now. Returns `Ok(None)` if it already ran or the guard
    /// was disarmed.
    pub async fn finish(&self) -> Result<Option<RunLog>, DriverError> {
        if !self.take() {
            return Ok(None);
        }
        info!(acl_name = %self.request.acl_name, "running teardown");
        self.tool.destroy(&self.request).await.map(Some)
    }

    /// Leave the infrastructure in place. Returns whether the guard was armed.
    pub fn disarm(&self) -> bool {
        let was_armed = self.take();
        if was_armed {
            warn!(acl_name = %self.request.acl_name, "teardown disarmed; resources will be left running");
        }
        was_armed
    }

    fn take(&self) -> bool {
        self.armed.swap(false, Ordering::SeqCst)
    }
}

/// Destroy on a dedicated thread with its own runtime, so the guard works
/// from sync code, from any Tokio runtime flavour, and during unwinding.
impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if !self.take() {
            return;
        }

        warn!(
            acl_name = %self.request.acl_name,
            panicking = std::thread::panicking(),
            "teardown guard dropped while armed; destroying"
        );

        let tool = Arc::clone(&self.tool);
        let request = self.request.clone();
        let worker = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            Ok::<_, std::io::Error>(runtime.block_on(tool.destroy(&request)))
        });

        match worker.join() {
            Ok(Ok(Ok(_))) => {
                info!(acl_name = %self.request.acl_name, "teardown complete");
            }
            Ok(Ok(Err(e))) => {
                error!(acl_name = %self.request.acl_name, error = %e, "teardown failed");
            }
            Ok(Err(e)) => {
                error!(error = %e, "teardown could not start a runtime");
            }
            Err(_) => {
                error!(acl_name = %self.request.acl_name, "teardown thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::AssertUnwindSafe;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::Utc;
    use wafcheck_domain::{Region, UniqueId};

    use super::*;
    use crate::driver::{IacStep, Outputs};

    #[derive(Default)]
    struct CountingTool {
        destroys: AtomicUsize,
    }

    fn ok_run(step: IacStep) -> RunLog {
        RunLog {
            step,
            exit_code: 0,
            log: String::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[async_trait]
    impl IacTool for CountingTool {
        fn name(&self) -> &str {
            "counting"
        }
        async fn init(&self, _: &ProvisioningRequest) -> Result<RunLog, DriverError> {
            Ok(ok_run(IacStep::Init))
        }
        async fn validate(&self, _: &ProvisioningRequest) -> Result<RunLog, DriverError> {
            Ok(ok_run(IacStep::Validate))
        }
        async fn apply(&self, _: &ProvisioningRequest) -> Result<RunLog, DriverError> {
            Ok(ok_run(IacStep::Apply))
        }
        async fn destroy(&self, _: &ProvisioningRequest) -> Result<RunLog, DriverError> {
            self.destroys.fetch_add(1, Ordering::SeqCst);
            Ok(ok_run(IacStep::Destroy))
        }
        async fn output(&self, _: &ProvisioningRequest) -> Result<(RunLog, Outputs), DriverError> {
            Ok((ok_run(IacStep::Output), Outputs::new()))
        }
    }

    fn request() -> ProvisioningRequest {
        ProvisioningRequest::new(
            UniqueId::parse("ab12cd").unwrap(),
            Region::default(),
            &["us-west-2a".to_string(), "us-west-2b".to_string()],
            "demos/simple",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn finish_destroys_once() {
        let tool = Arc::new(CountingTool::default());
        let guard = TeardownGuard::arm(tool.clone(), request());

        assert!(guard.finish().await.unwrap().is_some());
        assert!(guard.finish().await.unwrap().is_none());
        drop(guard);

        assert_eq!(tool.destroys.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_while_armed_destroys() {
        let tool = Arc::new(CountingTool::default());
        {
            let _guard = TeardownGuard::arm(tool.clone(), request());
        }
        assert_eq!(tool.destroys.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drop_inside_current_thread_runtime_destroys() {
        let tool = Arc::new(CountingTool::default());
        let guard = TeardownGuard::arm(tool.clone(), request());
        drop(guard);
        assert_eq!(tool.destroys.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panic_in_scope_still_destroys() {
        let tool = Arc::new(CountingTool::default());
        let guarded = tool.clone();
        let result = std::panic::catch_unwind(AssertUnwindSafe(move || {
            let _guard = TeardownGuard::arm(guarded, request());
            panic!("assertion failed mid-test");
        }));
        assert!(result.is_err());
        assert_eq!(tool.destroys.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disarmed_guard_never_destroys() {
        let tool = Arc::new(CountingTool::default());
        let guard = TeardownGuard::arm(tool.clone(), request());
        assert!(guard.disarm());
        assert!(!guard.is_armed());
        drop(guard);
        assert_eq!(tool.destroys.load(Ordering::SeqCst), 0);
    }
}
