use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use std::{env, fs};

use dirs::home_dir;

use crate::cmd::command::{command_to_string, CommandError, CommandKiller, CommandOutput, ToolCommand};
use crate::constants::TF_PLUGIN_CACHE_DIR;
use crate::errors::PlanError;

// terraform doesn't support concurrent installs into one plugin cache dir
static PLUGIN_CACHE_INIT_LOCK: Mutex<()> = Mutex::new(());

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerraformAction {
    Init,
    Plan,
    Show,
}

impl Display for TerraformAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TerraformAction::Init => "init",
            TerraformAction::Plan => "plan",
            TerraformAction::Show => "show",
        })
    }
}

#[derive(Debug)]
pub enum TerraformError {
    /// Terraform ran and exited with a non success status.
    Failed {
        action: TerraformAction,
        command: String,
        exit_code: Option<i32>,
        /// raw_message: raw Terraform error message with all details.
        raw_message: String,
    },
    /// Terraform binary could not be started at all.
    CannotExecute {
        action: TerraformAction,
        command: String,
        raw_message: String,
    },
    Timeout {
        action: TerraformAction,
        command: String,
        timeout: Duration,
        /// raw_message: what Terraform printed before being killed.
        raw_message: String,
    },
}

impl Display for TerraformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let message: String = match self {
            TerraformError::Failed {
                action, raw_message, ..
            } => format!("Error while performing Terraform {}\n{}", action, raw_message),
            TerraformError::CannotExecute {
                action,
                command,
                raw_message,
            } => format!(
                "Cannot execute Terraform {} with `{}`\n{}",
                action, command, raw_message
            ),
            TerraformError::Timeout {
                action,
                command,
                timeout,
                raw_message,
            } => format!(
                "Terraform {} `{}` killed after {}s\n{}",
                action,
                command,
                timeout.as_secs(),
                raw_message
            ),
        };

        f.write_str(&message)
    }
}

impl From<TerraformError> for PlanError {
    fn from(err: TerraformError) -> Self {
        match err {
            TerraformError::Failed {
                command,
                exit_code,
                raw_message,
                ..
            } => PlanError::ExecutionError {
                command,
                exit_code,
                raw_message,
            },
            TerraformError::CannotExecute {
                command, raw_message, ..
            } => PlanError::ExecutionError {
                command,
                exit_code: None,
                raw_message,
            },
            TerraformError::Timeout {
                command,
                timeout,
                raw_message,
                ..
            } => PlanError::TimeoutError {
                command,
                timeout_secs: timeout.as_secs(),
                raw_message,
            },
        }
    }
}

/// Thin wrapper over the terraform binary, one process per call.
#[derive(Clone, Debug)]
pub struct TerraformCli {
    binary: PathBuf,
    timeout: Duration,
    plugin_cache_dir: Option<PathBuf>,
}

impl TerraformCli {
    pub fn new<P: AsRef<Path>>(binary: P, timeout: Duration) -> TerraformCli {
        TerraformCli {
            binary: binary.as_ref().to_path_buf(),
            timeout,
            plugin_cache_dir: plugin_cache_dir(),
        }
    }

    pub fn with_plugin_cache_dir(mut self, plugin_cache_dir: Option<PathBuf>) -> TerraformCli {
        self.plugin_cache_dir = plugin_cache_dir;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn init(&self, root_dir: &Path) -> Result<CommandOutput, TerraformError> {
        self.exec(TerraformAction::Init, root_dir, &["init", "-no-color", "-input=false"])
    }

    pub fn plan(&self, root_dir: &Path, var_file: &Path, plan_file: &Path) -> Result<CommandOutput, TerraformError> {
        let var_file_arg = format!("-var-file={}", var_file.display());
        let out_arg = format!("-out={}", plan_file.display());
        self.exec(
            TerraformAction::Plan,
            root_dir,
            &["plan", "-no-color", "-input=false", "-lock=false", &out_arg, &var_file_arg],
        )
    }

    /// Returns the raw JSON rendering of a saved plan.
    pub fn show_json(&self, root_dir: &Path, plan_file: &Path) -> Result<String, TerraformError> {
        let plan_file = plan_file.display().to_string();
        self.exec(TerraformAction::Show, root_dir, &["show", "-no-color", "-json", &plan_file])
            .map(|output| output.stdout)
    }

    fn exec(&self, action: TerraformAction, root_dir: &Path, args: &[&str]) -> Result<CommandOutput, TerraformError> {
        let plugin_cache_dir = self.plugin_cache_dir.as_ref().map(|dir| {
            // terraform refuses a plugin cache dir which doesn't exist
            if let Err(err) = fs::create_dir_all(dir) {
                warn!("Cannot create terraform plugin cache dir {}: {}", dir.display(), err);
            }
            dir.display().to_string()
        });
        let mut envs = vec![("TF_IN_AUTOMATION", "1")];
        if let Some(dir) = plugin_cache_dir.as_deref() {
            envs.push((TF_PLUGIN_CACHE_DIR, dir));
        }

        let command = command_to_string(&self.binary, args, &[]);
        let mut cmd = ToolCommand::new(&self.binary, args, &envs);
        cmd.set_current_dir(root_dir);

        let _plugin_cache_guard = match (action, &plugin_cache_dir) {
            (TerraformAction::Init, Some(_)) => {
                Some(PLUGIN_CACHE_INIT_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
            }
            _ => None,
        };
        match cmd.exec_with_abort(&CommandKiller::from_timeout(self.timeout)) {
            Ok(output) => Ok(output),
            Err(CommandError::ExitStatusError { status, output }) => {
                error!("terraform {} failed with status {}", action, status);
                Err(TerraformError::Failed {
                    action,
                    command,
                    exit_code: status.code(),
                    raw_message: output.diagnostic(),
                })
            }
            Err(CommandError::TimeoutError { timeout, output, .. }) => Err(TerraformError::Timeout {
                action,
                command,
                timeout,
                raw_message: output.diagnostic(),
            }),
            Err(CommandError::ExecutionError(err)) => Err(TerraformError::CannotExecute {
                action,
                command,
                raw_message: err.to_string(),
            }),
        }
    }
}

/// `TF_PLUGIN_CACHE_DIR` if set, `$HOME/.terraform.d/plugin-cache` otherwise.
pub fn plugin_cache_dir() -> Option<PathBuf> {
    match env::var_os(TF_PLUGIN_CACHE_DIR) {
        Some(val) => Some(PathBuf::from(val)),
        None => home_dir().map(|home| home.join(".terraform.d").join("plugin-cache")),
    }
}
