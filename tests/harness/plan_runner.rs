use std::time::Duration;

use tfplan_harness::cmd::terraform::TerraformCli;
use tfplan_harness::errors::PlanError;
use tfplan_harness::plan::runner::{PlanRunner, TerraformPlanRunner};

use crate::helpers::fake_terraform::{fake_terraform, template_dir, FakeShow};
use crate::helpers::utilities::{default_plan_vars, init};

fn runner(bin_dir: &std::path::Path, show: FakeShow) -> TerraformPlanRunner {
    let cli = TerraformCli::new(fake_terraform(bin_dir, show), Duration::from_secs(60)).with_plugin_cache_dir(None);
    TerraformPlanRunner::new(cli)
}

#[test]
fn test_terraform_plan_runner_parses_show_output() {
    // setup:
    init();
    let bin_dir = tempfile::tempdir().unwrap();
    let template = template_dir();
    let runner = runner(bin_dir.path(), FakeShow::Fixture);

    // execute:
    let plan = runner
        .run(template.path(), &default_plan_vars())
        .expect("plan should succeed");

    // verify:
    assert_eq!(plan.terraform_version(), Some("1.9.8"));
    let addresses = plan.resource_addresses();
    assert!(addresses.contains(&"aws_resourcegroups_group.aws_rg".to_string()));
    assert!(addresses.contains(&"module.jump[0].aws_instance.vm".to_string()));
    // the template itself is never touched
    assert!(template.path().join(".terraform").is_dir());
    assert!(!template.path().join("harness.tfvars.json").exists());
}

#[test]
fn test_terraform_plan_runner_invalid_variables() {
    // setup:
    let bin_dir = tempfile::tempdir().unwrap();
    let template = template_dir();
    let runner = runner(bin_dir.path(), FakeShow::Fixture);
    let variables = default_plan_vars().with("storage_type", "invalid");

    // execute:
    let result = runner.run(template.path(), &variables);

    // verify:
    match result {
        Err(PlanError::ExecutionError {
            command,
            exit_code,
            raw_message,
        }) => {
            assert!(command.contains(" plan -no-color -input=false -lock=false"), "{}", command);
            assert_eq!(exit_code, Some(1));
            assert!(raw_message.contains("Supported values for storage_type are: none, standard, ha."));
        }
        other => panic!("expected an execution error, got {:?}", other),
    }
}

#[test]
fn test_terraform_plan_runner_invalid_show_output() {
    let bin_dir = tempfile::tempdir().unwrap();
    let template = template_dir();
    let runner = runner(bin_dir.path(), FakeShow::Garbage);

    let result = runner.run(template.path(), &default_plan_vars());

    match result {
        Err(PlanError::ParseError { command, .. }) => assert!(command.ends_with(" show -json"), "{}", command),
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_terraform_plan_runner_missing_template() {
    let bin_dir = tempfile::tempdir().unwrap();
    let runner = runner(bin_dir.path(), FakeShow::Fixture);

    let result = runner.run(&bin_dir.path().join("viya4-iac-aws"), &default_plan_vars());

    assert!(matches!(result, Err(PlanError::WorkspaceError { .. })));
}
