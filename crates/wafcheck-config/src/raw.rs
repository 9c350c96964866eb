use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw YAML representation of `wafcheck.yml`. Every field is optional so a
/// partial file only overrides what it names.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub region: Option<String>,
    /// Root of the Terraform tree. Relative paths resolve against the
    /// directory holding the config file.
    pub module_root: Option<String>,
    /// Example configuration to apply, relative to `module_root`.
    pub terraform_dir: Option<String>,
    /// "terraform" (default), "tofu", or a path to either binary.
    pub tool: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Parent of the per-run staged workspaces. Defaults to the system temp dir.
    pub work_dir: Option<String>,
    pub isolate_workspace: Option<bool>,
    pub read_outputs: Option<bool>,
    /// Extra environment for the IaC subprocess.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}
