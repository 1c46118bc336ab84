use std::error::Error as _;

use tera::{Context, Tera};

use crate::errors::ConfigError;
use crate::variables::VariableSet;

/// Renders an expected value against the effective variables, e.g. `{{ prefix }}-rg`.
///
/// Text without tera delimiters is returned untouched, so values such as `<nil>` never reach tera.
pub fn render_expected(template: &str, variables: &VariableSet) -> Result<String, ConfigError> {
    if !template.contains("{{") && !template.contains("{%") {
        return Ok(template.to_string());
    }

    let context = Context::from_serialize(variables).map_err(|e| template_error(template, &e))?;
    Tera::one_off(template, &context, false).map_err(|e| template_error(template, &e))
}

fn template_error(template: &str, err: &tera::Error) -> ConfigError {
    // tera keeps the useful part (missing variable, parse position) in the source chain
    let mut messages = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        messages.push(cause.to_string());
        source = cause.source();
    }

    ConfigError::Template {
        template: template.to_string(),
        raw_message: messages.join(": "),
    }
}
