//! Deterministic file-name templates for per-cell artifacts.
//!
//! Templates use brace placeholders: `{exp}`, `{seed}` and `{zeta}`, where
//! `{zeta}` accepts a fixed-precision spec such as `{zeta:.3f}`. Literal
//! braces are written `{{` and `}}`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::format_param;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Exp,
    Seed,
    Zeta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Field { field: Field, precision: Option<usize> },
}

/// Values substituted into a [`NameTemplate`].
#[derive(Debug, Clone, Copy)]
pub struct NameFields<'a> {
    /// Experiment variant identifier (may be empty).
    pub exp: &'a str,
    /// Sampler seed.
    pub seed: u64,
    /// Tempering exponent.
    pub zeta: f64,
}

/// Parsed file-name template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplate {
    source: String,
    parts: Vec<Part>,
}

impl NameTemplate {
    /// Parse a template string.
    pub fn parse(source: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut body = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        body.push(c);
                    }
                    if !closed {
                        return Err(Error::Configuration(format!(
                            "unterminated placeholder in template '{source}'"
                        )));
                    }
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(parse_placeholder(&body, source)?);
                }
                '}' => {
                    return Err(Error::Configuration(format!(
                        "unmatched '}}' in template '{source}'"
                    )));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }
        Ok(Self { source: source.to_string(), parts })
    }

    /// The original template text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Substitute `fields` into the template.
    pub fn render(&self, fields: &NameFields<'_>) -> String {
        let mut out = String::with_capacity(self.source.len() + 16);
        for part in &self.parts {
            match part {
                Part::Literal(s) => out.push_str(s),
                Part::Field { field: Field::Exp, .. } => out.push_str(fields.exp),
                Part::Field { field: Field::Seed, .. } => out.push_str(&fields.seed.to_string()),
                Part::Field { field: Field::Zeta, precision: Some(p) } => {
                    out.push_str(&format!("{:.*}", *p, fields.zeta));
                }
                Part::Field { field: Field::Zeta, precision: None } => {
                    out.push_str(&format_param(fields.zeta));
                }
            }
        }
        out
    }
}

fn parse_placeholder(body: &str, source: &str) -> Result<Part> {
    let (name, spec) = match body.split_once(':') {
        Some((n, s)) => (n, Some(s)),
        None => (body, None),
    };
    let field = match name {
        "exp" => Field::Exp,
        "seed" => Field::Seed,
        "zeta" => Field::Zeta,
        other => {
            return Err(Error::Configuration(format!(
                "unknown placeholder '{{{other}}}' in template '{source}'"
            )));
        }
    };
    let precision = match spec {
        None => None,
        Some(spec) if field == Field::Zeta => {
            let digits = spec.strip_prefix('.').and_then(|s| s.strip_suffix('f'));
            let p = digits.and_then(|d| d.parse::<usize>().ok()).ok_or_else(|| {
                Error::Configuration(format!(
                    "unsupported format spec '{spec}' for zeta in template '{source}'"
                ))
            })?;
            Some(p)
        }
        Some(spec) => {
            return Err(Error::Configuration(format!(
                "format spec '{spec}' is only supported for zeta (template '{source}')"
            )));
        }
    };
    Ok(Part::Field { field, precision })
}

impl std::str::FromStr for NameTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for NameTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for NameTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
