use std::str::FromStr;

use serde_json::Value;

use crate::errors::PlanError;

pub mod address;
pub mod cache;
pub mod path;
pub mod runner;

/// Parsed output of `terraform show -json`, read-only once built.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanDocument {
    root: Value,
}

impl PlanDocument {
    pub fn new(root: Value) -> PlanDocument {
        PlanDocument { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Terraform version that produced the plan, when present.
    pub fn terraform_version(&self) -> Option<&str> {
        self.root.get("terraform_version").and_then(Value::as_str)
    }

    /// Every resource address planned, root module first.
    pub fn resource_addresses(&self) -> Vec<String> {
        let mut addresses = Vec::new();
        if let Some(root_module) = self.root.pointer("/planned_values/root_module") {
            collect_addresses(root_module, &mut addresses);
        }
        addresses
    }
}

fn collect_addresses(module: &Value, addresses: &mut Vec<String>) {
    if let Some(resources) = module.get("resources").and_then(Value::as_array) {
        addresses.extend(
            resources
                .iter()
                .filter_map(|r| r.get("address").and_then(Value::as_str))
                .map(str::to_string),
        );
    }
    if let Some(children) = module.get("child_modules").and_then(Value::as_array) {
        children.iter().for_each(|child| collect_addresses(child, addresses));
    }
}

impl FromStr for PlanDocument {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let root: Value = serde_json::from_str(s).map_err(|err| PlanError::ParseError {
            command: "terraform show -json".to_string(),
            raw_message: err.to_string(),
        })?;

        if !root.is_object() {
            return Err(PlanError::ParseError {
                command: "terraform show -json".to_string(),
                raw_message: format!("expected a JSON object, got: {}", excerpt(s)),
            });
        }

        Ok(PlanDocument::new(root))
    }
}

fn excerpt(s: &str) -> String {
    let trimmed = s.trim();
    match trimmed.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
