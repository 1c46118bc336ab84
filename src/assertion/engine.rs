use std::fmt::{Display, Formatter};

use crate::assertion::{stringify, Comparator, Comparison, TestCase};
use crate::constants::ABSENT_VALUE;
use crate::errors::{ExpressionError, PlanError};
use crate::plan::address::{locate, Location, ResourceAddress};
use crate::plan::path::{resolve, PathExpression, PathLookup};
use crate::plan::PlanDocument;

/// How the actual value of a case was obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Found,
    ModuleAbsent { module: String },
    ResourceAbsent,
    FieldAbsent { at: String },
    InvalidExpression(ExpressionError),
    /// No plan document: the plan the case depends on failed.
    PlanUnavailable,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found)
    }
}

impl Display for Lookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Lookup::Found => f.write_str("value found"),
            Lookup::ModuleAbsent { module } => write!(f, "module `{}` is not planned", module),
            Lookup::ResourceAbsent => f.write_str("resource is not planned"),
            Lookup::FieldAbsent { at } => write!(f, "path `{}` not found in resource", at),
            Lookup::InvalidExpression(err) => write!(f, "{}", err),
            Lookup::PlanUnavailable => f.write_str("plan failed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssertionResult {
    pub name: String,
    pub passed: bool,
    pub expected: String,
    pub actual: String,
    pub comparison: Comparison,
    pub lookup: Lookup,
    pub message: Option<String>,
    /// Human readable explanation, for failures: expected, actual and how the lookup went.
    pub detail: String,
}

impl AssertionResult {
    /// Failed result of a case whose plan could not be produced, carrying the tool diagnostic.
    pub fn plan_failed(case: &TestCase, error: &PlanError) -> AssertionResult {
        let mut detail = failure_header(case);
        detail.push_str(&format!("\nplan failed: {}", error.diagnostic()));

        AssertionResult {
            name: case.name().to_string(),
            passed: false,
            expected: case.expected().to_string(),
            actual: ABSENT_VALUE.to_string(),
            comparison: case.comparison(),
            lookup: Lookup::PlanUnavailable,
            message: case.message().map(str::to_string),
            detail,
        }
    }
}

fn failure_header(case: &TestCase) -> String {
    match case.message() {
        Some(message) => format!("{}: {}", case.name(), message),
        None => format!("{}: assertion failed", case.name()),
    }
}

/// Evaluates test cases against a plan document. Stateless, evaluation never touches the document.
#[derive(Clone, Copy, Debug, Default)]
pub struct AssertionEngine;

impl AssertionEngine {
    pub fn new() -> AssertionEngine {
        AssertionEngine
    }

    pub fn evaluate(&self, case: &TestCase, plan: &PlanDocument) -> AssertionResult {
        let (actual, lookup) = match actual_value(case, plan) {
            Ok(resolved) => resolved,
            Err(err) => (ABSENT_VALUE.to_string(), Lookup::InvalidExpression(err)),
        };

        let passed = match lookup {
            Lookup::InvalidExpression(_) | Lookup::PlanUnavailable => false,
            _ => case.comparison().compare(case.expected(), &actual),
        };

        let detail = if passed {
            format!(
                "{}: `{}` {} `{}`",
                case.name(),
                actual,
                case.comparison(),
                case.expected()
            )
        } else {
            format!(
                "{}\n  resource:   {}\n  path:       {}\n  comparison: {}\n  expected:   {}\n  actual:     {}\n  lookup:     {}",
                failure_header(case),
                display_resource(case.resource()),
                case.path(),
                case.comparison(),
                case.expected(),
                actual,
                lookup
            )
        };

        if passed {
            debug!("{}", detail);
        } else {
            warn!("{}", detail);
        }

        AssertionResult {
            name: case.name().to_string(),
            passed,
            expected: case.expected().to_string(),
            actual,
            comparison: case.comparison(),
            lookup,
            message: case.message().map(str::to_string),
            detail,
        }
    }

    /// Every case is evaluated independently, results are ordered by case name.
    pub fn evaluate_all(&self, cases: &[TestCase], plan: &PlanDocument) -> Vec<AssertionResult> {
        let mut results = cases.iter().map(|case| self.evaluate(case, plan)).collect::<Vec<_>>();
        results.sort_by(|a, b| a.name.cmp(&b.name));
        results
    }
}

fn display_resource(resource: &str) -> &str {
    match resource.trim() {
        "" => "<document root>",
        resource => resource,
    }
}

fn actual_value(case: &TestCase, plan: &PlanDocument) -> Result<(String, Lookup), ExpressionError> {
    let path = PathExpression::parse(case.path())?;

    let subtree = match case.resource().trim() {
        "" => plan.root(),
        resource => match locate(plan.root(), &ResourceAddress::parse(resource)?) {
            Location::Found(values) => values,
            Location::ModuleAbsent { module } => {
                return Ok((ABSENT_VALUE.to_string(), Lookup::ModuleAbsent { module }));
            }
            Location::ResourceAbsent => return Ok((ABSENT_VALUE.to_string(), Lookup::ResourceAbsent)),
        },
    };

    Ok(match resolve(subtree, &path) {
        PathLookup::Found(value) => (stringify(Some(value)), Lookup::Found),
        PathLookup::Missing { at } => (stringify(None), Lookup::FieldAbsent { at }),
    })
}
