pub const TF_PLUGIN_CACHE_DIR: &str = "TF_PLUGIN_CACHE_DIR";

pub const TERRAFORM_BINARY_ENV: &str = "TFPLAN_HARNESS_TERRAFORM_BINARY";
pub const PLAN_TIMEOUT_ENV: &str = "TFPLAN_HARNESS_PLAN_TIMEOUT";
pub const TEMPLATE_DIR_ENV: &str = "TFPLAN_HARNESS_TEMPLATE_DIR";
pub const DEFAULTS_FILE_ENV: &str = "TFPLAN_HARNESS_DEFAULTS_FILE";

pub const DEFAULT_TERRAFORM_BINARY: &str = "terraform";
pub const DEFAULT_PLAN_TIMEOUT_SECS: u64 = 30 * 60;

/// Name of the variable file written into each plan workspace.
pub const VARIABLES_FILE_NAME: &str = "harness.tfvars.json";
/// Name of the binary plan file produced by `terraform plan -out`.
pub const PLAN_FILE_NAME: &str = "harness.tfplan";

/// Literal text of a value that does not exist in the plan.
pub const ABSENT_VALUE: &str = "<nil>";
