//! Terraform resource addresses and their lookup in `planned_values`.
//!
//! Syntax: `[module.<name>[<selector>].]*[data.]<type>.<name>[<selector>]`, a selector being `[<index>]` for
//! `count` instances or `["<key>"]` for `for_each` instances.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use itertools::Itertools;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::errors::ExpressionError;
use crate::plan::path::{parse_selector, Selector};

static EMPTY_VALUES: Lazy<Value> = Lazy::new(|| Value::Object(Map::new()));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceMode {
    Managed,
    Data,
}

impl ResourceMode {
    fn as_plan_str(&self) -> &'static str {
        match self {
            ResourceMode::Managed => "managed",
            ResourceMode::Data => "data",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModuleSegment {
    pub name: String,
    pub selector: Option<Selector>,
}

impl Display for ModuleSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "module.{}", self.name)?;
        if let Some(selector) = &self.selector {
            write!(f, "{}", selector)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceAddress {
    modules: Vec<ModuleSegment>,
    mode: ResourceMode,
    resource_type: String,
    name: String,
    selector: Option<Selector>,
}

/// `name` optionally followed by a selector, as written between two dots.
type Part = (String, Option<Selector>);

fn is_valid_identifier(identifier: &str) -> bool {
    !identifier.is_empty() && identifier.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn split_parts(address: &str) -> Result<Vec<Part>, String> {
    let mut parts = vec![];
    let mut rest = address.trim();

    loop {
        let end = rest.find(['.', '[']).unwrap_or(rest.len());
        let identifier = &rest[..end];
        if !is_valid_identifier(identifier) {
            return Err(format!("`{}` is not a valid name", identifier));
        }
        rest = &rest[end..];

        let selector = match rest.strip_prefix('[') {
            Some(after_bracket) => {
                let (selector, remaining) = parse_selector(after_bracket)?;
                rest = remaining;
                Some(selector)
            }
            None => None,
        };
        parts.push((identifier.to_string(), selector));

        if rest.is_empty() {
            return Ok(parts);
        }
        rest = rest
            .strip_prefix('.')
            .ok_or_else(|| format!("unexpected `{}`", rest))?;
    }
}

/// Consumes leading `module.<name>` pairs.
fn take_modules(parts: &[Part]) -> Result<(Vec<ModuleSegment>, &[Part]), String> {
    let mut modules = vec![];
    let mut rest = parts;

    while let [(keyword, keyword_selector), remaining @ ..] = rest {
        if keyword != "module" {
            break;
        }
        if keyword_selector.is_some() {
            return Err("a selector must follow the module name, not the `module` keyword".to_string());
        }
        let [(name, selector), remaining @ ..] = remaining else {
            return Err("missing module name after `module`".to_string());
        };
        modules.push(ModuleSegment {
            name: name.clone(),
            selector: selector.clone(),
        });
        rest = remaining;
    }

    Ok((modules, rest))
}

/// Parses a module instance address such as the `address` of a plan's `child_modules` entry.
fn parse_module_path(address: &str) -> Option<Vec<ModuleSegment>> {
    let parts = split_parts(address).ok()?;
    match take_modules(&parts) {
        Ok((modules, [])) => Some(modules),
        _ => None,
    }
}

impl ResourceAddress {
    pub fn new<T: Into<String>, N: Into<String>>(resource_type: T, name: N) -> ResourceAddress {
        ResourceAddress {
            modules: vec![],
            mode: ResourceMode::Managed,
            resource_type: resource_type.into(),
            name: name.into(),
            selector: None,
        }
    }

    pub fn parse(address: &str) -> Result<ResourceAddress, ExpressionError> {
        let invalid = |reason: String| ExpressionError::InvalidAddress {
            address: address.to_string(),
            reason,
        };

        let parts = split_parts(address).map_err(invalid)?;
        let (modules, rest) = take_modules(&parts).map_err(invalid)?;
        let (mode, rest) = match rest {
            [(keyword, None), remaining @ ..] if keyword == "data" => (ResourceMode::Data, remaining),
            _ => (ResourceMode::Managed, rest),
        };

        match rest {
            [(resource_type, None), (name, selector)] => Ok(ResourceAddress {
                modules,
                mode,
                resource_type: resource_type.clone(),
                name: name.clone(),
                selector: selector.clone(),
            }),
            [(_, Some(_)), _] => Err(invalid("a selector can only follow the resource name".to_string())),
            _ => Err(invalid("expected `<resource_type>.<resource_name>`".to_string())),
        }
    }

    pub fn modules(&self) -> &[ModuleSegment] {
        &self.modules
    }

    pub fn mode(&self) -> ResourceMode {
        self.mode
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector(&self) -> Option<&Selector> {
        self.selector.as_ref()
    }

    fn matches_resource(&self, resource: &Value) -> bool {
        let field = |name: &str| resource.get(name).and_then(Value::as_str);
        let mode_matches = match field("mode") {
            Some(mode) => mode == self.mode.as_plan_str(),
            None => self.mode == ResourceMode::Managed,
        };

        mode_matches
            && field("type") == Some(self.resource_type.as_str())
            && field("name") == Some(self.name.as_str())
            && selector_matches(&self.selector, resource.get("index"))
    }
}

fn selector_matches(selector: &Option<Selector>, index: Option<&Value>) -> bool {
    match (selector, index) {
        (None, None) | (None, Some(Value::Null)) => true,
        (Some(Selector::Index(expected)), Some(Value::Number(n))) => n.as_u64() == Some(*expected),
        (Some(Selector::Key(expected)), Some(Value::String(key))) => key == expected,
        _ => false,
    }
}

impl Display for ResourceAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for module in &self.modules {
            write!(f, "{}.", module)?;
        }
        if self.mode == ResourceMode::Data {
            f.write_str("data.")?;
        }
        write!(f, "{}.{}", self.resource_type, self.name)?;
        if let Some(selector) = &self.selector {
            write!(f, "{}", selector)?;
        }
        Ok(())
    }
}

impl FromStr for ResourceAddress {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceAddress::parse(s)
    }
}

/// Result of a resource lookup. Absence is a normal outcome: a resource behind a disabled feature flag is not planned.
#[derive(Clone, Debug, PartialEq)]
pub enum Location<'a> {
    /// Planned attribute values of the resource.
    Found(&'a Value),
    /// One of the enclosing module instances is not planned at all.
    ModuleAbsent { module: String },
    /// The module exists but does not plan this resource instance.
    ResourceAbsent,
}

impl<'a> Location<'a> {
    pub fn value(&self) -> Option<&'a Value> {
        match self {
            Location::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// Finds a resource instance in `planned_values` of a `terraform show -json` document.
pub fn locate<'a>(document: &'a Value, address: &ResourceAddress) -> Location<'a> {
    let Some(mut module) = document.pointer("/planned_values/root_module") else {
        return Location::ModuleAbsent {
            module: "root_module".to_string(),
        };
    };

    for depth in 1..=address.modules.len() {
        let expected_path = &address.modules[..depth];
        let child = module
            .get("child_modules")
            .and_then(Value::as_array)
            .and_then(|children| {
                children.iter().find(|child| {
                    child
                        .get("address")
                        .and_then(Value::as_str)
                        .and_then(parse_module_path)
                        .is_some_and(|path| path.as_slice() == expected_path)
                })
            });

        match child {
            Some(child) => module = child,
            None => {
                return Location::ModuleAbsent {
                    module: expected_path.iter().join("."),
                };
            }
        }
    }

    let resource = module
        .get("resources")
        .and_then(Value::as_array)
        .and_then(|resources| resources.iter().find(|r| address.matches_resource(r)));

    match resource {
        Some(resource) => Location::Found(resource.get("values").unwrap_or(&EMPTY_VALUES)),
        None => Location::ResourceAbsent,
    }
}
