use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{json, Value};
use tfplan_harness::errors::PlanError;
use tfplan_harness::harness::Harness;
use tfplan_harness::plan::cache::PlanCache;
use tfplan_harness::plan::runner::PlanRunner;
use tfplan_harness::plan::PlanDocument;
use tfplan_harness::variables::{VariableSet, VariableValue};

const STORAGE_TYPES: [&str; 3] = ["none", "standard", "ha"];

/// In-memory stand-in for `terraform plan` on an AWS Kubernetes template, driven by the same variables.
#[derive(Default)]
pub struct ViyaPlanRunner {
    runs: AtomicUsize,
}

impl ViyaPlanRunner {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

fn var<'a>(variables: &'a VariableSet, name: &str, default: &'a str) -> &'a str {
    variables.get(name).and_then(|v| v.as_str()).unwrap_or(default)
}

fn invalid_value(name: &str, reason: &str) -> PlanError {
    PlanError::ExecutionError {
        command: "terraform plan -no-color -input=false -lock=false".to_string(),
        exit_code: Some(1),
        raw_message: format!(
            "Error: Invalid value for variable\n\n  on variables.tf: variable \"{}\"\n\n{}",
            name, reason
        ),
    }
}

fn resource(module: Option<&str>, resource_type: &str, name: &str, index: Option<Value>, values: Value) -> Value {
    let mut address = format!("{}.{}", resource_type, name);
    if let Some(module) = module {
        address = format!("{}.{}", module, address);
    }
    let mut resource = json!({
        "address": address,
        "mode": "managed",
        "type": resource_type,
        "name": name,
        "values": values,
    });
    if let Some(index) = index {
        resource["index"] = index;
    }
    resource
}

impl PlanRunner for ViyaPlanRunner {
    fn run(&self, _template_dir: &Path, variables: &VariableSet) -> Result<PlanDocument, PlanError> {
        self.runs.fetch_add(1, Ordering::SeqCst);

        let prefix = variables
            .get("prefix")
            .and_then(|v| v.as_str())
            .ok_or_else(|| invalid_value("prefix", "No value for required variable"))?;
        let storage_type = var(variables, "storage_type", "standard");
        if !STORAGE_TYPES.contains(&storage_type) {
            return Err(invalid_value(
                "storage_type",
                "Supported values for storage_type are: none, standard, ha.",
            ));
        }
        let backend = var(variables, "storage_type_backend", "nfs");

        let mut root_resources = vec![resource(
            None,
            "aws_resourcegroups_group",
            "aws_rg",
            None,
            json!({"name": format!("{}-rg", prefix)}),
        )];
        if storage_type == "ha" && backend == "ontap" {
            root_resources.push(resource(
                None,
                "aws_fsx_ontap_file_system",
                "ontap-fs",
                Some(json!(0)),
                json!({"deployment_type": "SINGLE_AZ_1", "storage_capacity": 1024}),
            ));
        }
        if storage_type == "ha" && backend == "efs" {
            root_resources.push(resource(
                None,
                "aws_efs_file_system",
                "efs-fs",
                Some(json!(0)),
                json!({"performance_mode": "generalPurpose"}),
            ));
        }

        let node_group = "module.eks.module.eks_managed_node_group[\"default\"]";
        let mut child_modules = vec![json!({
            "address": "module.eks",
            "child_modules": [{
                "address": node_group,
                "resources": [
                    resource(Some(node_group), "aws_launch_template", "this", Some(json!(0)), json!({
                        "block_device_mappings": [{
                            "device_name": "/dev/xvda",
                            "ebs": [{
                                "volume_type": var(variables, "default_nodepool_os_disk_type", "gp2"),
                                "volume_size": variables.get("default_nodepool_os_disk_size"),
                            }]
                        }]
                    })),
                    resource(Some(node_group), "aws_eks_node_group", "this", Some(json!(0)), json!({
                        "instance_types": [var(variables, "default_nodepool_vm_type", "r6in.2xlarge")],
                    })),
                ]
            }]
        })];
        if variables.get("create_jump_vm") == Some(&VariableValue::Bool(true)) {
            child_modules.push(json!({
                "address": "module.jump[0]",
                "resources": [resource(Some("module.jump[0]"), "aws_instance", "vm", None, json!({"instance_type": "m6in.xlarge"}))]
            }));
        }

        Ok(PlanDocument::new(json!({
            "format_version": "1.2",
            "terraform_version": "1.9.8",
            "variables": variables,
            "planned_values": {
                "root_module": {
                    "resources": root_resources,
                    "child_modules": child_modules,
                }
            }
        })))
    }
}

pub fn viya_harness() -> (Harness, Arc<ViyaPlanRunner>) {
    let runner = Arc::new(ViyaPlanRunner::default());
    let harness = Harness::new("/src/viya4-iac-aws", runner.clone(), Arc::new(PlanCache::new()));
    (harness, runner)
}
