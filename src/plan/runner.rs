use std::path::Path;

use crate::cmd::terraform::TerraformCli;
use crate::constants::{PLAN_FILE_NAME, VARIABLES_FILE_NAME};
use crate::errors::PlanError;
use crate::fs::{create_plan_workspace, write_json_file};
use crate::plan::PlanDocument;
use crate::variables::VariableSet;

/// Produces a plan document for a template and a variable set.
///
/// Implementations must not retry: planning is deterministic for identical inputs, a failure is a test failure.
pub trait PlanRunner: Send + Sync {
    fn run(&self, template_dir: &Path, variables: &VariableSet) -> Result<PlanDocument, PlanError>;
}

/// Runs `terraform init`, `plan` and `show -json` in a private copy of the template.
pub struct TerraformPlanRunner {
    terraform: TerraformCli,
}

impl TerraformPlanRunner {
    pub fn new(terraform: TerraformCli) -> TerraformPlanRunner {
        TerraformPlanRunner { terraform }
    }
}

impl PlanRunner for TerraformPlanRunner {
    fn run(&self, template_dir: &Path, variables: &VariableSet) -> Result<PlanDocument, PlanError> {
        let span = info_span!("terraform_plan", template = %template_dir.display(), variables = %variables.cache_key());
        let _enter = span.enter();

        let workspace = create_plan_workspace(template_dir).map_err(|err| PlanError::WorkspaceError {
            path: template_dir.to_path_buf(),
            raw_message: err.to_string(),
        })?;
        let root_dir = workspace.path();
        let var_file = root_dir.join(VARIABLES_FILE_NAME);
        let plan_file = root_dir.join(PLAN_FILE_NAME);

        write_json_file(&var_file, variables).map_err(|err| PlanError::WorkspaceError {
            path: var_file.clone(),
            raw_message: err.to_string(),
        })?;

        self.terraform.init(root_dir)?;
        self.terraform.plan(root_dir, &var_file, &plan_file)?;
        let json = self.terraform.show_json(root_dir, &plan_file)?;

        let plan = json.parse::<PlanDocument>().map_err(|err| match err {
            PlanError::ParseError { raw_message, .. } => PlanError::ParseError {
                command: format!("{} show -json", self.terraform.binary().display()),
                raw_message,
            },
            other => other,
        })?;
        info!(
            "plan ready with {} resources (terraform {})",
            plan.resource_addresses().len(),
            plan.terraform_version().unwrap_or("unknown")
        );

        Ok(plan)
    }
}
