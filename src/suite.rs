//! Declarative suites: a name, variable overrides on top of the defaults, and named test cases.
//!
//! ```yaml
//! name: nodepool-gp3
//! variables:
//!   default_nodepool_os_disk_type: gp3
//! tests:
//!   defaultNodepoolVolumeType:
//!     expected: gp3
//!     resource: 'module.eks.module.eks_managed_node_group["default"].aws_launch_template.this[0]'
//!     path: "{$.block_device_mappings[0].ebs[0].volume_type}"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_derive::Deserialize;

use crate::assertion::report::SuiteReport;
use crate::assertion::{stringify, Comparison, TestCase};
use crate::errors::ConfigError;
use crate::harness::Harness;
use crate::template::render_expected;
use crate::variables::{VariableSet, VariableValue};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseDefinition {
    /// Scalars are taken as their text, strings may reference variables: `{{ prefix }}-rg`.
    pub expected: VariableValue,
    #[serde(default)]
    pub resource: String,
    pub path: String,
    #[serde(default)]
    pub comparison: Comparison,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSuite {
    pub name: String,
    #[serde(default)]
    pub variables: VariableSet,
    pub tests: BTreeMap<String, CaseDefinition>,
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl TestSuite {
    pub fn from_file(path: &Path) -> Result<TestSuite, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut suite = TestSuite::from_yaml(&content).map_err(|raw_message| ConfigError::InvalidContent {
            path: path.to_path_buf(),
            raw_message,
        })?;
        suite.source = Some(path.to_path_buf());
        Ok(suite)
    }

    pub fn from_yaml(content: &str) -> Result<TestSuite, String> {
        let suite: TestSuite = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
        if suite.name.trim().is_empty() {
            return Err("suite name must not be empty".to_string());
        }
        if suite.tests.is_empty() {
            return Err(format!("suite `{}` has no tests", suite.name));
        }
        Ok(suite)
    }

    /// Defaults with this suite's overrides applied.
    pub fn effective_variables(&self, defaults: &VariableSet) -> VariableSet {
        defaults.clone().merge(&self.variables)
    }

    /// Test cases with their expected values rendered against `variables`.
    pub fn test_cases(&self, variables: &VariableSet) -> Result<Vec<TestCase>, ConfigError> {
        self.tests
            .iter()
            .map(|(name, definition)| -> Result<TestCase, ConfigError> {
                let expected = match &definition.expected {
                    VariableValue::String(template) => render_expected(template, variables)?,
                    other => stringify(serde_json::to_value(other).ok().as_ref()),
                };

                let case = TestCase::new(name, expected, &definition.resource, &definition.path)
                    .with_comparison(definition.comparison);
                Ok(match &definition.message {
                    Some(message) => case.with_message(message),
                    None => case,
                })
            })
            .collect()
    }
}

/// A suite ready to run: its variables are final and its expected values rendered.
struct PreparedSuite<'a> {
    name: &'a str,
    variables: VariableSet,
    cases: Vec<TestCase>,
}

/// Runs suites in parallel against one harness. Every suite is prepared before any plan starts,
/// so a broken suite file aborts the run without planning anything.
pub fn run_suites(harness: &Harness, defaults: &VariableSet, suites: &[TestSuite]) -> Result<SuiteReport, ConfigError> {
    let prepared = suites
        .iter()
        .map(|suite| -> Result<PreparedSuite<'_>, ConfigError> {
            let variables = suite.effective_variables(defaults);
            let cases = suite.test_cases(&variables)?;
            Ok(PreparedSuite {
                name: &suite.name,
                variables,
                cases,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    info!("running {} suites against {}", prepared.len(), harness.template_dir().display());
    let results = prepared
        .par_iter()
        .map(|suite| harness.run_suite(suite.name, &suite.variables, &suite.cases))
        .collect::<Vec<_>>();

    Ok(SuiteReport::new(results))
}
