use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use tfplan_harness::errors::ConfigError;
use tfplan_harness::suite::{run_suites, TestSuite};

use crate::helpers::utilities::default_plan_vars;
use crate::helpers::viya_plan::viya_harness;

const DEFAULTS_SUITE: &str = r#"
name: defaults
tests:
  resourceGroupName:
    expected: "{{ prefix }}-rg"
    resource: aws_resourcegroups_group.aws_rg
    path: "{$.name}"
  defaultNodepoolVolumeType:
    expected: "{{ default_nodepool_os_disk_type }}"
    resource: 'module.eks.module.eks_managed_node_group["default"].aws_launch_template.this[0]'
    path: "{$.block_device_mappings[0].ebs[0].volume_type}"
  ontapFileSystem:
    expected: "<nil>"
    resource: aws_fsx_ontap_file_system.ontap-fs[0]
    path: "{$}"
    message: NetApp file system must not be created with the default storage
"#;

const GP3_SUITE: &str = r#"
name: nodepool-gp3
variables:
  default_nodepool_os_disk_type: gp3
  default_nodepool_os_disk_size: 64
tests:
  defaultNodepoolVolumeType:
    expected: gp3
    resource: 'module.eks.module.eks_managed_node_group["default"].aws_launch_template.this[0]'
    path: "{$.block_device_mappings[0].ebs[0].volume_type}"
  defaultNodepoolVolumeSize:
    expected: 64
    resource: 'module.eks.module.eks_managed_node_group["default"].aws_launch_template.this[0]'
    path: "{$.block_device_mappings[0].ebs[0].volume_size}"
"#;

const INVALID_STORAGE_SUITE: &str = r#"
name: invalid-storage
variables:
  storage_type: invalid
tests:
  resourceGroupName:
    expected: "{{ prefix }}-rg"
    resource: aws_resourcegroups_group.aws_rg
    path: "{$.name}"
  jumpVm:
    expected: "<nil>"
    resource: module.jump[0].aws_instance.vm
    path: "{$}"
    comparison: not_equals
"#;

fn write_suites(suites: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    let paths = suites
        .iter()
        .map(|(file, content)| {
            let path = dir.path().join(file);
            fs::write(&path, content).unwrap();
            path
        })
        .collect();
    (dir, paths)
}

fn load(paths: &[PathBuf]) -> Vec<TestSuite> {
    paths
        .iter()
        .map(|p| TestSuite::from_file(p).expect("suite should load"))
        .collect()
}

#[test]
fn test_run_passing_suites() {
    // setup:
    let (harness, runner) = viya_harness();
    let (_dir, paths) = write_suites(&[("defaults.yaml", DEFAULTS_SUITE), ("gp3.yaml", GP3_SUITE)]);

    // execute:
    let report = run_suites(&harness, &default_plan_vars(), &load(&paths)).unwrap();

    // verify:
    assert!(report.all_passed(), "{}", report.render());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.passed_count(), 5);
    assert_eq!(runner.runs(), 2);
    let rendered = report.render();
    assert!(rendered.contains("  PASS defaultNodepoolVolumeSize"));
    assert!(rendered.contains("5 passed, 0 failed, 2 suites"));
}

#[test]
fn test_plan_failure_is_reported_per_suite() {
    // setup:
    let (harness, _) = viya_harness();
    let (_dir, paths) = write_suites(&[("defaults.yaml", DEFAULTS_SUITE), ("invalid.yaml", INVALID_STORAGE_SUITE)]);

    // execute:
    let report = run_suites(&harness, &default_plan_vars(), &load(&paths)).unwrap();

    // verify:
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.passed_count(), 3);
    assert_eq!(report.failed_count(), 2);
    let invalid = report
        .suites
        .iter()
        .find(|s| s.name == "invalid-storage")
        .expect("suite should be reported");
    assert!(invalid.plan_error.is_some());
    assert!(report.render().contains("Supported values for storage_type are: none, standard, ha."));
}

#[test]
fn test_broken_suite_aborts_before_planning() {
    // setup:
    let (harness, runner) = viya_harness();
    let broken = TestSuite::from_yaml(
        "name: broken\ntests:\n  name:\n    expected: \"{{ location_typo }}\"\n    path: \"{$.name}\"\n",
    )
    .unwrap();
    let (_dir, paths) = write_suites(&[("defaults.yaml", DEFAULTS_SUITE)]);
    let mut suites = load(&paths);
    suites.push(broken);

    // execute:
    let result = run_suites(&harness, &default_plan_vars(), &suites);

    // verify:
    assert!(matches!(result, Err(ConfigError::Template { .. })));
    assert_eq!(runner.runs(), 0);
}

#[test]
fn test_unreadable_suite_file() {
    let dir = tempfile::tempdir().unwrap();

    let missing = TestSuite::from_file(&dir.path().join("missing.yaml"));
    let (_dir, paths) = write_suites(&[("bad.yaml", "name: bad\ntests: [1, 2]\n")]);
    let invalid = TestSuite::from_file(&paths[0]);

    assert!(matches!(missing, Err(ConfigError::Io { .. })));
    assert!(matches!(invalid, Err(ConfigError::InvalidContent { .. })));
}
