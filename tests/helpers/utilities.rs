use std::path::PathBuf;
use std::time::Instant;

use tfplan_harness::logger::{self, LogFormat};
use tfplan_harness::variables::VariableSet;
use tracing::info;

/// Installs the logger once per test binary, returns the test start time.
pub fn init() -> Instant {
    dotenv::dotenv().ok();
    logger::init(LogFormat::from_env());

    info!(
        "running from current directory: {}",
        std::env::current_dir().map(|d| d.display().to_string()).unwrap_or_default()
    );

    Instant::now()
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

/// Variables every test starts from, loaded like a `TFPLAN_HARNESS_DEFAULTS_FILE`.
pub fn default_plan_vars() -> VariableSet {
    VariableSet::from_file(&fixture_path("defaults.yaml")).expect("cannot load test defaults")
}
