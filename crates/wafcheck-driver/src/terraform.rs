use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};
use wafcheck_domain::ProvisioningRequest;

use crate::driver::{IacStep, IacTool, Outputs, RunLog};
use crate::error::DriverError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

// ── TerraformRunner ───────────────────────────────────────────────────────────

/// Drives the `terraform` (or `tofu`) binary through init/validate/apply/destroy.
///
/// - Runs in `request.terraform_dir`
/// - Passes the request's variables as `-var` arguments, never writing tfvars
/// - Sets the request's environment overrides on the child process only
/// - Captures combined stdout+stderr per command and mirrors it to tracing
/// - Kills the child if a command exceeds the timeout
#[derive(Debug, Clone)]
pub struct TerraformRunner {
    binary: String,
    timeout: Duration,
}

/// Raw result of one child process.
struct Captured {
    code: i32,
    combined: String,
    stdout: String,
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl TerraformRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one sub-command and turn a non-zero exit into [`DriverError::CommandFailed`].
    async fn run_step(
        &self,
        step: IacStep,
        request: &ProvisioningRequest,
        args: Vec<String>,
    ) -> Result<(RunLog, String), DriverError> {
        let started_at = Utc::now();
        let captured = self
            .run_tf(step, &request.terraform_dir, &args, &request.env)
            .await?;
        let finished_at = Utc::now();

        if captured.code != 0 {
            warn!(binary = %self.binary, step = step.as_str(), code = captured.code, "IaC command exited non-zero");
            return Err(DriverError::CommandFailed {
                step,
                code: captured.code,
                log: captured.combined,
            });
        }

        let run = RunLog {
            step,
            exit_code: captured.code,
            log: captured.combined,
            started_at,
            finished_at,
        };
        Ok((run, captured.stdout))
    }

    // ── Process execution ─────────────────────────────────────────────────────

    async fn run_tf(
        &self,
        step: IacStep,
        dir: &Path,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<Captured, DriverError> {
        info!(binary = %self.binary, step = step.as_str(), dir = %dir.display(), "running IaC command");

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .envs(env);

        let mut child = cmd.spawn().map_err(|e| DriverError::Spawn {
            binary: self.binary.clone(),
            source: e,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DriverError::Internal("child stdout was not piped".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DriverError::Internal("child stderr was not piped".into()))?;

        // Both streams feed one channel so the combined log keeps arrival order.
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<(Stream, String)>();

        let tx_out = tx.clone();
        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx_out.send((Stream::Stdout, line));
            }
        });

        let tx_err = tx.clone();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx_err.send((Stream::Stderr, line));
            }
        });

        drop(tx);

        let mut combined = String::new();
        let mut stdout_only = String::new();
        let collect = async {
            while let Some((stream, line)) = rx.recv().await {
                debug!(target: "wafcheck::iac", "{}", line);
                combined.push_str(&line);
                combined.push('\n');
                if let Stream::Stdout = stream {
                    stdout_only.push_str(&line);
                    stdout_only.push('\n');
                }
            }
        };
        // One deadline covers draining the pipes and waiting for exit.
        let deadline = tokio::time::Instant::now() + self.timeout;

        if tokio::time::timeout_at(deadline, collect).await.is_err() {
            stdout_task.abort();
            stderr_task.abort();
            return Err(self.kill_on_timeout(step, &mut child).await);
        }

        stdout_task.await.ok();
        stderr_task.await.ok();

        let waited = tokio::time::timeout_at(deadline, child.wait()).await;
        let status = match waited {
            Ok(status) => status
                .map_err(|e| DriverError::Internal(format!("wait {}: {}", self.binary, e)))?,
            Err(_) => return Err(self.kill_on_timeout(step, &mut child).await),
        };

        Ok(Captured {
            code: status.code().unwrap_or(-1),
            combined,
            stdout: stdout_only,
        })
    }

    async fn kill_on_timeout(&self, step: IacStep, child: &mut tokio::process::Child) -> DriverError {
        warn!(binary = %self.binary, step = step.as_str(), "IaC command timed out; killing");
        let _ = child.kill().await;
        DriverError::Timeout {
            step,
            secs: self.timeout.as_secs(),
        }
    }
}

#[async_trait]
impl IacTool for TerraformRunner {
    fn name(&self) -> &str {
        &self.binary
    }

    async fn init(&self, request: &ProvisioningRequest) -> Result<RunLog, DriverError> {
        let args = to_args(&["init", "-input=false", "-no-color"]);
        self.run_step(IacStep::Init, request, args).await.map(|(run, _)| run)
    }

    async fn validate(&self, request: &ProvisioningRequest) -> Result<RunLog, DriverError> {
        let args = to_args(&["validate", "-no-color"]);
        self.run_step(IacStep::Validate, request, args).await.map(|(run, _)| run)
    }

    async fn apply(&self, request: &ProvisioningRequest) -> Result<RunLog, DriverError> {
        let mut args = to_args(&["apply", "-input=false", "-auto-approve", "-lock=false", "-no-color"]);
        args.extend(request.var_args());
        self.run_step(IacStep::Apply, request, args).await.map(|(run, _)| run)
    }

    async fn destroy(&self, request: &ProvisioningRequest) -> Result<RunLog, DriverError> {
        if !request.terraform_dir.join(".terraform").exists() {
            // init never ran here, so nothing can have been applied.
            debug!(dir = %request.terraform_dir.display(), "no .terraform directory; nothing to destroy");
            let now = Utc::now();
            return Ok(RunLog {
                step: IacStep::Destroy,
                exit_code: 0,
                log: String::new(),
                started_at: now,
                finished_at: now,
            });
        }

        let mut args = to_args(&["destroy", "-input=false", "-auto-approve", "-lock=false", "-no-color"]);
        args.extend(request.var_args());
        self.run_step(IacStep::Destroy, request, args).await.map(|(run, _)| run)
    }

    async fn output(
        &self,
        request: &ProvisioningRequest,
    ) -> Result<(RunLog, Outputs), DriverError> {
        let args = to_args(&["output", "-json", "-no-color"]);
        let (run, stdout) = self.run_step(IacStep::Output, request, args).await?;
        let outputs = parse_outputs(&stdout)?;
        Ok((run, outputs))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Flatten `terraform output -json` (`{"name": {"value": …, "type": …}}`)
/// into `name -> value`.
pub(crate) fn parse_outputs(json: &str) -> Result<Outputs, DriverError> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(Outputs::new());
    }

    let raw: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(trimmed).map_err(|e| DriverError::OutputParse(e.to_string()))?;

    raw.into_iter()
        .map(|(key, entry)| match entry.get("value") {
            Some(value) => Ok((key, value.clone())),
            None => Err(DriverError::OutputParse(format!(
                "output '{}' has no value field",
                key
            ))),
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
