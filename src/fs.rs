use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::fs::create_dir_all;
use std::io::{Error, ErrorKind};
use std::path::Path;

use serde::Serialize;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Entries never copied into a plan workspace: VCS data, provider/module downloads and local state.
const WORKSPACE_EXCLUDED_FILES: [&str; 4] = [".git", ".terraform", "terraform.tfstate", "terraform.tfstate.backup"];

fn is_excluded(file_name: &OsStr, excluded_files: &HashSet<&OsStr>) -> bool {
    excluded_files.contains(file_name) || file_name.to_str().is_some_and(|name| name.ends_with(".tfstate.lock.info"))
}

/// Copies `from` into `to`, skipping workspace-local terraform data.
pub fn copy_files(from: &Path, to: &Path) -> Result<(), Error> {
    let excluded_files: HashSet<&OsStr> = WORKSPACE_EXCLUDED_FILES.iter().map(OsStr::new).collect();

    create_dir_all(to)?;

    for entry in WalkDir::new(from)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded(e.file_name(), &excluded_files))
    {
        let entry = entry.map_err(|err| Error::new(ErrorKind::Other, err))?;
        let relative_path = entry
            .path()
            .strip_prefix(from)
            .map_err(|err| Error::new(ErrorKind::InvalidInput, err))?;
        let dest = to.join(relative_path);

        if entry.file_type().is_dir() {
            create_dir_all(&dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }

    Ok(())
}

/// Creates a throw-away copy of a template directory, removed when the returned guard is dropped.
pub fn create_plan_workspace(template_dir: &Path) -> Result<TempDir, Error> {
    if !template_dir.is_dir() {
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("template directory {} does not exist", template_dir.display()),
        ));
    }

    let workspace = tempfile::Builder::new().prefix("tfplan-harness-").tempdir()?;
    copy_files(template_dir, workspace.path())?;
    debug!(
        "copied template {} into plan workspace {}",
        template_dir.display(),
        workspace.path().display()
    );

    Ok(workspace)
}

pub fn write_json_file<T: Serialize>(path: &Path, content: &T) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(content).map_err(|err| Error::new(ErrorKind::InvalidData, err))?;
    fs::write(path, json)
}
