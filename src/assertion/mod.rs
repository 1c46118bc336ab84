use std::fmt::{Display, Formatter};
use std::str::FromStr;

use enum_dispatch::enum_dispatch;
use serde_json::Value;
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::constants::ABSENT_VALUE;

pub mod engine;
pub mod report;

/// How the resolved value is checked against the expected text.
#[enum_dispatch]
pub trait Comparator {
    fn compare(&self, expected: &str, actual: &str) -> bool;
    /// Name used in suite files and reports.
    fn name(&self) -> &'static str;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Equals;

impl Comparator for Equals {
    fn compare(&self, expected: &str, actual: &str) -> bool {
        expected == actual
    }

    fn name(&self) -> &'static str {
        "equals"
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotEquals;

impl Comparator for NotEquals {
    fn compare(&self, expected: &str, actual: &str) -> bool {
        expected != actual
    }

    fn name(&self) -> &'static str {
        "not_equals"
    }
}

/// The actual text contains the expected one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contains;

impl Comparator for Contains {
    fn compare(&self, expected: &str, actual: &str) -> bool {
        actual.contains(expected)
    }

    fn name(&self) -> &'static str {
        "contains"
    }
}

#[enum_dispatch(Comparator)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub enum Comparison {
    Equals,
    NotEquals,
    Contains,
}

impl Default for Comparison {
    fn default() -> Self {
        Comparison::Equals(Equals)
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equals" | "equal" | "eq" => Ok(Comparison::Equals(Equals)),
            "not_equals" | "not_equal" | "ne" => Ok(Comparison::NotEquals(NotEquals)),
            "contains" => Ok(Comparison::Contains(Contains)),
            other => Err(format!(
                "unknown comparison `{}`, expected one of: equals, not_equals, contains",
                other
            )),
        }
    }
}

/// One assertion on a plan: the value at `path` inside the planned values of `resource`.
///
/// An empty `resource` targets the document root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    name: String,
    expected: String,
    resource: String,
    path: String,
    comparison: Comparison,
    message: Option<String>,
}

impl TestCase {
    pub fn new<N, E, R, P>(name: N, expected: E, resource: R, path: P) -> TestCase
    where
        N: Into<String>,
        E: Into<String>,
        R: Into<String>,
        P: Into<String>,
    {
        TestCase {
            name: name.into(),
            expected: expected.into(),
            resource: resource.into(),
            path: path.into(),
            comparison: Comparison::default(),
            message: None,
        }
    }

    pub fn with_comparison(mut self, comparison: Comparison) -> TestCase {
        self.comparison = comparison;
        self
    }

    pub fn with_message<M: Into<String>>(mut self, message: M) -> TestCase {
        self.message = Some(message.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Text form of a resolved value, the only thing comparisons see.
///
/// `None` (not found) and JSON null both render as `<nil>`, arrays and objects as compact JSON.
/// `<nil>` is compared like any other text: `not_equals <nil>` fails for an absent resource,
/// which makes it the check that a resource is created.
pub fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => ABSENT_VALUE.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        // serde_json maps are sorted by key
        Some(value) => value.to_string(),
    }
}
