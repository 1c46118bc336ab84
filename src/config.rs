use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cmd::terraform::{plugin_cache_dir, TerraformCli};
use crate::constants::{
    DEFAULTS_FILE_ENV, DEFAULT_PLAN_TIMEOUT_SECS, DEFAULT_TERRAFORM_BINARY, PLAN_TIMEOUT_ENV, TEMPLATE_DIR_ENV,
    TERRAFORM_BINARY_ENV,
};
use crate::errors::ConfigError;
use crate::variables::VariableSet;

/// Settings of a harness run, from the environment then overridden by the command line.
#[derive(Clone, Debug, PartialEq)]
pub struct HarnessConfig {
    pub terraform_binary: PathBuf,
    /// Upper bound of each terraform invocation, the process is killed past it.
    pub plan_timeout: Duration,
    pub plugin_cache_dir: Option<PathBuf>,
    pub template_dir: Option<PathBuf>,
    pub defaults_file: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            terraform_binary: PathBuf::from(DEFAULT_TERRAFORM_BINARY),
            plan_timeout: Duration::from_secs(DEFAULT_PLAN_TIMEOUT_SECS),
            plugin_cache_dir: None,
            template_dir: None,
            defaults_file: None,
        }
    }
}

impl HarnessConfig {
    pub fn from_env() -> Result<HarnessConfig, ConfigError> {
        let mut config = Self::from_lookup(|name| env::var(name).ok())?;
        config.plugin_cache_dir = plugin_cache_dir();
        Ok(config)
    }

    fn from_lookup<F>(lookup: F) -> Result<HarnessConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = HarnessConfig::default();
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(binary) = non_empty(TERRAFORM_BINARY_ENV) {
            config.terraform_binary = PathBuf::from(binary);
        }
        if let Some(timeout) = non_empty(PLAN_TIMEOUT_ENV) {
            config.plan_timeout = parse_timeout(PLAN_TIMEOUT_ENV, &timeout)?;
        }
        config.template_dir = non_empty(TEMPLATE_DIR_ENV).map(PathBuf::from);
        config.defaults_file = non_empty(DEFAULTS_FILE_ENV).map(PathBuf::from);

        Ok(config)
    }

    pub fn terraform_cli(&self) -> TerraformCli {
        TerraformCli::new(&self.terraform_binary, self.plan_timeout).with_plugin_cache_dir(self.plugin_cache_dir.clone())
    }

    pub fn template_dir(&self) -> Result<&Path, ConfigError> {
        self.template_dir
            .as_deref()
            .ok_or_else(|| ConfigError::MissingSetting(format!("template directory ({})", TEMPLATE_DIR_ENV)))
    }

    /// Default variables of the template, empty when no defaults file is configured.
    pub fn load_defaults(&self) -> Result<VariableSet, ConfigError> {
        match &self.defaults_file {
            Some(path) => {
                let defaults = VariableSet::from_file(path)?;
                info!("loaded {} default variables from {}", defaults.len(), path.display());
                Ok(defaults)
            }
            None => Ok(VariableSet::new()),
        }
    }
}

/// Accepts `duration-str` expressions (`90s`, `30m`, `1h30m`) or plain seconds.
pub fn parse_timeout(name: &str, value: &str) -> Result<Duration, ConfigError> {
    let timeout = duration_str::parse(value.trim()).map_err(|err| ConfigError::InvalidEnvironmentValue {
        name: name.to_string(),
        value: value.to_string(),
        raw_message: err.to_string(),
    })?;

    if timeout.is_zero() {
        return Err(ConfigError::InvalidEnvironmentValue {
            name: name.to_string(),
            value: value.to_string(),
            raw_message: "timeout must be greater than zero".to_string(),
        });
    }

    Ok(timeout)
}
