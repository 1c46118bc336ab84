use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::helpers::utilities::fixture_path;

/// Behaviour of the fake `terraform` binary.
pub enum FakeShow {
    /// `show -json` prints `tests/fixtures/plan.json`.
    Fixture,
    /// `show -json` prints something which is not JSON.
    Garbage,
}

/// Shell script answering `init`, `plan` and `show` like terraform does.
///
/// `plan` fails like terraform on `storage_type = "invalid"`, and fails if local terraform data leaked into the workspace.
pub fn fake_terraform(dir: &Path, show: FakeShow) -> PathBuf {
    let show_output = match show {
        FakeShow::Fixture => format!("cat '{}'", fixture_path("plan.json").display()),
        FakeShow::Garbage => "echo 'Terraform used the selected providers to generate the following plan'".to_string(),
    };

    let script = format!(
        r#"#!/bin/sh
case "$1" in
  init)
    [ -f main.tf ] || {{ echo "Error: No configuration files" >&2; exit 1; }}
    echo "Terraform has been successfully initialized!"
    ;;
  plan)
    [ -d .terraform ] && {{ echo "Error: workspace was not copied from a clean template" >&2; exit 5; }}
    for arg in "$@"; do
      case "$arg" in
        -var-file=*) VARS="${{arg#-var-file=}}" ;;
        -out=*) OUT="${{arg#-out=}}" ;;
      esac
    done
    if grep -q '"storage_type": "invalid"' "$VARS"; then
      echo "Error: Invalid value for variable" >&2
      echo "Supported values for storage_type are: none, standard, ha." >&2
      exit 1
    fi
    echo "binary plan" > "$OUT"
    echo "Plan: 42 to add, 0 to change, 0 to destroy."
    ;;
  show)
    {show_output}
    ;;
  *)
    echo "unexpected command $1" >&2
    exit 2
    ;;
esac
"#
    );

    let path = dir.join("terraform");
    fs::write(&path, script).expect("cannot write fake terraform");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("cannot make fake terraform executable");
    path
}

/// Template directory with a main.tf and local terraform data which must not be copied.
pub fn template_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("cannot create template dir");
    for file in ["main.tf", "variables.tf"] {
        fs::copy(fixture_path("template").join(file), dir.path().join(file)).expect("cannot copy template");
    }
    fs::create_dir_all(dir.path().join(".terraform/providers")).expect("cannot create .terraform");
    fs::write(dir.path().join("terraform.tfstate"), "{}").expect("cannot write state");
    dir
}
