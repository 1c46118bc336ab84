use std::path::PathBuf;
use thiserror::Error;

/// PlanError: failure to produce a plan document.
///
/// It is shared as-is by every caller waiting on the same cache entry, hence `Clone`.
#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum PlanError {
    /// The provisioning tool exited with a non success status.
    /// raw_message: tool diagnostic, unmodified.
    #[error("Error while executing `{command}` (exit code: {}):\n{raw_message}", exit_code_text(.exit_code))]
    ExecutionError {
        command: String,
        exit_code: Option<i32>,
        raw_message: String,
    },

    /// The provisioning tool output is not a valid plan document.
    #[error("Cannot parse plan output of `{command}`: {raw_message}")]
    ParseError { command: String, raw_message: String },

    /// raw_message: what the tool printed before being killed.
    #[error("Command `{command}` killed after reaching timeout of {timeout_secs}s\n{raw_message}")]
    TimeoutError {
        command: String,
        timeout_secs: u64,
        raw_message: String,
    },

    #[error("Cannot prepare plan workspace `{}`: {raw_message}", .path.display())]
    WorkspaceError { path: PathBuf, raw_message: String },
}

fn exit_code_text(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

impl PlanError {
    /// Text shown to the user for every test case depending on the failed plan.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}

/// ExpressionError: malformed resource address or path expression in a test case.
#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("Invalid resource address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Invalid path expression `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid content in `{}`: {raw_message}", .path.display())]
    InvalidContent { path: PathBuf, raw_message: String },

    #[error("Unsupported variable file format `{}`, expected .json, .tfvars.json, .yaml or .yml", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Invalid value `{value}` for environment variable `{name}`: {raw_message}")]
    InvalidEnvironmentValue {
        name: String,
        value: String,
        raw_message: String,
    },

    #[error("Cannot execute `{}`, check the terraform binary setting", .0.display())]
    BinaryNotFound(PathBuf),

    #[error("Missing setting `{0}`")]
    MissingSetting(String),

    #[error("Cannot render expected value `{template}`: {raw_message}")]
    Template { template: String, raw_message: String },
}
