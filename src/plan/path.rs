//! JSON-path subset used to address a value inside a resource: `{$}`, `{$.a.b}`, `{$.a[0].b}`, `{$["a.b"]}`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde_json::Value;

use crate::errors::ExpressionError;

/// Bracket content: `[3]` or `["key"]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selector {
    Index(u64),
    Key(String),
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Index(idx) => write!(f, "[{}]", idx),
            Selector::Key(key) => write!(f, "[{}]", quote(key)),
        }
    }
}

fn quote(key: &str) -> String {
    serde_json::to_string(key).unwrap_or_else(|_| format!("\"{}\"", key))
}

/// Parses a selector whose opening `[` has already been consumed, returns it with the remaining input.
pub(crate) fn parse_selector(input: &str) -> Result<(Selector, &str), String> {
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, quote_char @ ('"' | '\''))) => {
            let mut key = String::new();
            let mut escaped = false;
            for (idx, c) in chars {
                match c {
                    _ if escaped => {
                        key.push(c);
                        escaped = false;
                    }
                    '\\' => escaped = true,
                    _ if c == quote_char => {
                        let after_quote = &input[idx + c.len_utf8()..];
                        return match after_quote.strip_prefix(']') {
                            Some(rest) => Ok((Selector::Key(key), rest)),
                            None => Err(format!("expected `]` after quoted key `{}`", key)),
                        };
                    }
                    _ => key.push(c),
                }
            }
            Err("unterminated quoted key".to_string())
        }
        Some(_) => {
            let end = input.find(']').ok_or_else(|| "missing closing `]`".to_string())?;
            let raw_index = input[..end].trim();
            let index = raw_index
                .parse::<u64>()
                .map_err(|_| format!("`{}` is not a valid index, expected a non negative integer", raw_index))?;
            Ok((Selector::Index(index), &input[end + 1..]))
        }
        None => Err("missing closing `]`".to_string()),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    Field(String),
    Index(usize),
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Field(name) if is_plain_field(name) => write!(f, ".{}", name),
            Segment::Field(name) => write!(f, "[{}]", quote(name)),
            Segment::Index(idx) => write!(f, "[{}]", idx),
        }
    }
}

fn is_plain_field(name: &str) -> bool {
    !name.is_empty() && !name.contains(['.', '[', ']', '"', '\'', '{', '}']) && !name.contains(char::is_whitespace)
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathExpression {
    segments: Vec<Segment>,
}

impl PathExpression {
    /// `{$}`: the whole subtree.
    pub fn root() -> PathExpression {
        PathExpression { segments: vec![] }
    }

    pub fn parse(expression: &str) -> Result<PathExpression, ExpressionError> {
        let invalid = |reason: String| ExpressionError::InvalidPath {
            path: expression.to_string(),
            reason,
        };

        let trimmed = expression.trim();
        let inner = match trimmed.strip_prefix('{') {
            Some(rest) => rest
                .strip_suffix('}')
                .ok_or_else(|| invalid("missing closing `}`".to_string()))?,
            None => trimmed,
        };
        let mut rest = inner
            .trim()
            .strip_prefix('$')
            .ok_or_else(|| invalid("expression must start with `$`".to_string()))?;

        let mut segments = vec![];
        while !rest.is_empty() {
            if let Some(after_dot) = rest.strip_prefix('.') {
                let end = after_dot.find(['.', '[']).unwrap_or(after_dot.len());
                let field = &after_dot[..end];
                if field.is_empty() {
                    return Err(invalid("empty field name".to_string()));
                }
                segments.push(Segment::Field(field.to_string()));
                rest = &after_dot[end..];
            } else if let Some(after_bracket) = rest.strip_prefix('[') {
                let (selector, remaining) = parse_selector(after_bracket).map_err(invalid)?;
                segments.push(match selector {
                    Selector::Key(key) => Segment::Field(key),
                    Selector::Index(idx) => Segment::Index(
                        usize::try_from(idx).map_err(|_| invalid(format!("index {} is too large", idx)))?,
                    ),
                });
                rest = remaining;
            } else {
                return Err(invalid(format!("unexpected `{}`", rest)));
            }
        }

        Ok(PathExpression { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    fn render(segments: &[Segment]) -> String {
        let mut rendered = "$".to_string();
        segments.iter().for_each(|s| rendered.push_str(&s.to_string()));
        rendered
    }
}

impl Display for PathExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", Self::render(&self.segments))
    }
}

impl FromStr for PathExpression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PathExpression::parse(s)
    }
}

/// Result of a path lookup. `Missing` is a normal outcome, not an error.
#[derive(Clone, Debug, PartialEq)]
pub enum PathLookup<'a> {
    Found(&'a Value),
    /// `at` is the path up to and including the first segment that does not exist.
    Missing { at: String },
}

impl<'a> PathLookup<'a> {
    pub fn value(&self) -> Option<&'a Value> {
        match self {
            PathLookup::Found(value) => Some(value),
            PathLookup::Missing { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PathLookup::Found(_))
    }
}

/// Walks `path` from `document`. Missing fields, out of range indexes and traversal into scalars are `Missing`.
pub fn resolve<'a>(document: &'a Value, path: &PathExpression) -> PathLookup<'a> {
    let mut current = document;
    for (depth, segment) in path.segments.iter().enumerate() {
        let next = match segment {
            Segment::Field(name) => current.as_object().and_then(|object| object.get(name)),
            Segment::Index(idx) => current.as_array().and_then(|array| array.get(*idx)),
        };

        match next {
            Some(value) => current = value,
            None => {
                return PathLookup::Missing {
                    at: PathExpression::render(&path.segments[..=depth]),
                };
            }
        }
    }

    PathLookup::Found(current)
}
