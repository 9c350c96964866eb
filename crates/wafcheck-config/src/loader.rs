use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;
use wafcheck_domain::Region;

use crate::error::ConfigError;
use crate::raw::RawConfig;

/// File name looked up in the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "wafcheck.yml";

const ENV_REGION: &str = "WAFCHECK_REGION";
const ENV_TERRAFORM_DIR: &str = "WAFCHECK_TERRAFORM_DIR";
const ENV_TOOL: &str = "WAFCHECK_TOOL";

/// Terraform can take a long time to create a WAF plus the VPC around it,
/// but nothing in the example should need more than half an hour.
const DEFAULT_TIMEOUT_SECS: u64 = 1800;

/// Resolved harness configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub region: Region,
    pub module_root: PathBuf,
    /// Relative to `module_root`.
    pub terraform_dir: PathBuf,
    pub tool: String,
    pub timeout_secs: u64,
    /// Staged workspaces live in `work_dir/<suffix>`.
    pub work_dir: PathBuf,
    /// Copy the Terraform tree into a private directory per run so parallel
    /// runs never share `.terraform/` or local state.
    pub isolate_workspace: bool,
    /// Read `terraform output -json` after a successful apply.
    pub read_outputs: bool,
    pub env: BTreeMap<String, String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            region: Region::default(),
            module_root: PathBuf::from("."),
            terraform_dir: PathBuf::from("demos/simple"),
            tool: "terraform".into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            work_dir: std::env::temp_dir().join("wafcheck"),
            isolate_workspace: true,
            read_outputs: true,
            env: BTreeMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Absolute-or-relative path of the example configuration in the checkout.
    pub fn terraform_path(&self) -> PathBuf {
        self.module_root.join(&self.terraform_dir)
    }

    /// Where the staged copy for `suffix` lives.
    pub fn staging_dir(&self, suffix: &str) -> PathBuf {
        self.work_dir.join(suffix)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Load the harness configuration from `path` (or defaults when `None`),
/// then apply `WAFCHECK_*` overrides from the process environment.
pub fn load_config(path: Option<&Path>) -> Result<HarnessConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, env: F) -> Result<HarnessConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let (raw, base_dir, origin) = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
            let raw: RawConfig =
                serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
                    path: path.display().to_string(),
                    source: e,
                })?;
            debug!("Loaded harness config from {}", path.display());
            let base = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (raw, base, path.display().to_string())
        }
        None => (RawConfig::default(), PathBuf::from("."), "<defaults>".to_string()),
    };

    convert(raw, &base_dir, &origin, env)
}

fn convert<F>(
    raw: RawConfig,
    base_dir: &Path,
    origin: &str,
    env: F,
) -> Result<HarnessConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = HarnessConfig::default();

    let region = match env(ENV_REGION).or(raw.region) {
        Some(r) => Region::new(r)?,
        None => defaults.region,
    };

    let module_root = match raw.module_root {
        Some(root) => resolve(base_dir, root),
        None => base_dir.to_path_buf(),
    };

    let work_dir = raw
        .work_dir
        .map(|dir| resolve(base_dir, dir))
        .unwrap_or(defaults.work_dir);

    let terraform_dir = env(ENV_TERRAFORM_DIR)
        .or(raw.terraform_dir)
        .map(PathBuf::from)
        .unwrap_or(defaults.terraform_dir);
    if terraform_dir.is_absolute() {
        return Err(invalid(
            "terraform_dir",
            origin,
            format!("{} must be relative to module_root", terraform_dir.display()),
        ));
    }

    let tool = env(ENV_TOOL).or(raw.tool).unwrap_or(defaults.tool);
    if tool.trim().is_empty() {
        return Err(invalid("tool", origin, "must not be empty".into()));
    }

    let timeout_secs = raw.timeout_secs.unwrap_or(defaults.timeout_secs);
    if timeout_secs == 0 {
        return Err(invalid("timeout_secs", origin, "must be greater than zero".into()));
    }

    Ok(HarnessConfig {
        region,
        module_root,
        terraform_dir,
        tool,
        timeout_secs,
        work_dir,
        isolate_workspace: raw.isolate_workspace.unwrap_or(defaults.isolate_workspace),
        read_outputs: raw.read_outputs.unwrap_or(defaults.read_outputs),
        env: raw.env,
    })
}

fn resolve(base_dir: &Path, path: String) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() { path } else { base_dir.join(path) }
}

fn invalid(field: &'static str, origin: &str, message: String) -> ConfigError {
    ConfigError::Invalid {
        field,
        origin: origin.to_string(),
        message,
    }
}
