use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::DriverError;

/// A private copy of the Terraform tree for one run.
#[derive(Debug, Clone)]
pub struct StagedWorkspace {
    /// Root of the copy.
    pub root: PathBuf,
    /// The example configuration inside the copy; run the IaC tool here.
    pub terraform_dir: PathBuf,
    pub files_copied: usize,
}

/// Copy every Terraform-relevant file under `module_root` into `dest`,
/// preserving relative paths, and return where `terraform_dir` landed.
///
/// Hidden directories, `target/`, `.terraform/` and state files are skipped
/// so the copy starts uninitialised and stateless. Nothing under `work_dir`
/// (the parent of every run's staged copy) or `dest` is copied.
pub fn stage_workspace(
    module_root: &Path,
    terraform_dir: &Path,
    work_dir: &Path,
    dest: &Path,
) -> Result<StagedWorkspace, DriverError> {
    let source_dir = module_root.join(terraform_dir);
    if !source_dir.is_dir() {
        return Err(DriverError::Workspace(format!(
            "terraform directory {} does not exist",
            source_dir.display()
        )));
    }

    std::fs::create_dir_all(dest)
        .map_err(|e| DriverError::Workspace(format!("create {}: {}", dest.display(), e)))?;

    let excluded: Vec<PathBuf> = [work_dir, dest]
        .iter()
        .filter_map(|p| std::fs::canonicalize(p).ok())
        .collect();

    let mut files_copied = 0;
    copy_tree(module_root, module_root, dest, &excluded, &mut files_copied)?;

    let staged_dir = dest.join(terraform_dir);
    // The example may hold no files of its own (only nested modules), but it
    // must exist for the tool to run in it.
    std::fs::create_dir_all(&staged_dir)
        .map_err(|e| DriverError::Workspace(format!("create {}: {}", staged_dir.display(), e)))?;

    info!(
        from = %module_root.display(),
        to = %dest.display(),
        files = files_copied,
        "staged terraform workspace"
    );

    Ok(StagedWorkspace {
        root: dest.to_path_buf(),
        terraform_dir: staged_dir,
        files_copied,
    })
}

/// Remove a staged copy. Missing directories are not an error.
pub fn remove_workspace(root: &Path) -> Result<(), DriverError> {
    match std::fs::remove_dir_all(root) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DriverError::Workspace(format!("remove {}: {}", root.display(), e))),
    }
}

fn copy_tree(
    root: &Path,
    dir: &Path,
    dest_root: &Path,
    excluded: &[PathBuf],
    copied: &mut usize,
) -> Result<(), DriverError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| DriverError::Workspace(format!("read {}: {}", dir.display(), e)))?;

    for entry in entries {
        let entry = entry.map_err(|e| DriverError::Workspace(e.to_string()))?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        let file_type = entry
            .file_type()
            .map_err(|e| DriverError::Workspace(format!("stat {}: {}", path.display(), e)))?;

        if file_type.is_dir() {
            if skip_dir(&name) || is_excluded(&path, excluded) {
                continue;
            }
            copy_tree(root, &path, dest_root, excluded, copied)?;
            continue;
        }

        if !is_terraform_file(&name) {
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .map_err(|e| DriverError::Internal(format!("strip prefix: {}", e)))?;
        let target = dest_root.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DriverError::Workspace(format!("create {}: {}", parent.display(), e))
            })?;
        }
        std::fs::copy(&path, &target).map_err(|e| {
            DriverError::Workspace(format!("copy {} → {}: {}", path.display(), target.display(), e))
        })?;
        debug!(file = %relative.display(), "staged");
        *copied += 1;
    }

    Ok(())
}

fn skip_dir(name: &str) -> bool {
    name.starts_with('.') || name == "target"
}

fn is_excluded(dir: &Path, excluded: &[PathBuf]) -> bool {
    match std::fs::canonicalize(dir) {
        Ok(dir) => excluded.iter().any(|ex| dir.starts_with(ex)),
        Err(_) => false,
    }
}

fn is_terraform_file(name: &str) -> bool {
    if name.contains(".tfstate") {
        return false;
    }
    name == ".terraform.lock.hcl"
        || name.ends_with(".tf")
        || name.ends_with(".tf.json")
        || name.ends_with(".tfvars")
        || name.ends_with(".tfvars.json")
        || name.ends_with(".tpl")
}
