//! Checkpoint path templates
//!
//! A template is a path with `{name}` or `{name:spec}` placeholders, e.g.
//! `checkpoints/model_{epoch:03d}_{val_loss:.4f}.json`. `epoch` is always
//! available; every other name must be a metric reported for the epoch.
//! `{{` and `}}` produce literal braces.
//!
//! Supported specs: an optional `0` fill flag, an optional width, an optional
//! `.precision` and an optional type of `f` (fixed), `e` (exponent) or `d`
//! (integer). A precision without a type formats as fixed-point.

use super::callback::Metrics;
use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;

/// Name of the placeholder that always resolves to the one-based epoch
pub const EPOCH_PLACEHOLDER: &str = "epoch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Fixed,
    Exponent,
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct FormatSpec {
    zero_pad: bool,
    width: Option<usize>,
    precision: Option<usize>,
    kind: Option<Kind>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder { name: String, spec: FormatSpec },
}

#[derive(Debug, Clone, Copy)]
enum Value {
    Int(usize),
    Float(f64),
}

/// A parsed path template
#[derive(Debug, Clone, PartialEq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template, rejecting empty input and malformed placeholders
    pub fn parse(template: &str) -> Result<Self> {
        if template.is_empty() {
            return Err(Error::Configuration(
                "path template must not be empty".to_string(),
            ));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut body = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => return Err(malformed(template, "unclosed '{'")),
                            Some(ch) => body.push(ch),
                        }
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_placeholder(template, &body)?);
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(malformed(template, "single '}' outside a placeholder")),
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// The template as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance (duplicates included)
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Resolve the template for a one-based `epoch` and the epoch's metrics
    ///
    /// Every placeholder is checked before anything is rendered. `epoch`
    /// shadows a metric of the same name.
    pub fn resolve(&self, epoch: usize, metrics: &Metrics) -> Result<PathBuf> {
        if let Some(missing) = self
            .placeholders()
            .find(|name| *name != EPOCH_PLACEHOLDER && !metrics.contains_key(*name))
        {
            return Err(Error::PathResolution {
                template: self.source.clone(),
                placeholder: missing.to_string(),
            });
        }

        let mut out = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { name, spec } => {
                    let value = if name == EPOCH_PLACEHOLDER {
                        Value::Int(epoch)
                    } else {
                        Value::Float(metrics[name.as_str()])
                    };
                    out.push_str(&render(name, value, spec)?);
                }
            }
        }
        Ok(PathBuf::from(out))
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for PathTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn malformed(template: &str, reason: &str) -> Error {
    Error::Configuration(format!("malformed path template {template:?}: {reason}"))
}

fn parse_placeholder(template: &str, body: &str) -> Result<Segment> {
    let (name, spec) = match body.split_once(':') {
        Some((name, spec)) => (name, Some(spec)),
        None => (body, None),
    };
    if name.is_empty() {
        return Err(malformed(template, "empty placeholder name"));
    }
    let spec = match spec {
        Some(spec) => parse_spec(spec)
            .ok_or_else(|| malformed(template, &format!("unsupported format spec {spec:?}")))?,
        None => FormatSpec::default(),
    };
    Ok(Segment::Placeholder {
        name: name.to_string(),
        spec,
    })
}

fn parse_spec(spec: &str) -> Option<FormatSpec> {
    let mut out = FormatSpec::default();
    let mut rest = spec;

    if let Some(stripped) = rest.strip_prefix('0') {
        out.zero_pad = true;
        rest = stripped;
    }

    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        out.width = Some(rest[..digits].parse().ok()?);
        rest = &rest[digits..];
    }

    if let Some(stripped) = rest.strip_prefix('.') {
        let digits =
            stripped.len() - stripped.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return None;
        }
        out.precision = Some(stripped[..digits].parse().ok()?);
        rest = &stripped[digits..];
    }

    out.kind = match rest {
        "" => None,
        "f" => Some(Kind::Fixed),
        "e" => Some(Kind::Exponent),
        "d" => Some(Kind::Integer),
        _ => return None,
    };

    if out.kind == Some(Kind::Integer) && out.precision.is_some() {
        return None;
    }
    Some(out)
}

fn render(name: &str, value: Value, spec: &FormatSpec) -> Result<String> {
    let kind = spec
        .kind
        .or(spec.precision.map(|_| Kind::Fixed));

    let text = match (kind, value) {
        (None, Value::Int(v)) | (Some(Kind::Integer), Value::Int(v)) => v.to_string(),
        (None, Value::Float(v)) => shortest(v),
        (Some(Kind::Integer), Value::Float(v)) => {
            if v.is_finite() && v.fract() == 0.0 {
                format!("{v:.0}")
            } else {
                return Err(Error::Configuration(format!(
                    "placeholder {name:?} uses integer format but value {v} is not integral"
                )));
            }
        }
        (Some(Kind::Fixed), value) => format!("{:.*}", spec.precision.unwrap_or(6), as_f64(value)),
        (Some(Kind::Exponent), value) => exponent(as_f64(value), spec.precision.unwrap_or(6)),
    };

    Ok(pad(text, spec))
}

fn as_f64(value: Value) -> f64 {
    match value {
        Value::Int(v) => v as f64,
        Value::Float(v) => v,
    }
}

/// Shortest round-trip form, keeping a `.0` on integral values
fn shortest(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

/// Exponent notation with a signed, at least two-digit exponent (`1.2340e-01`)
fn exponent(v: f64, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, v);
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        // inf / NaN have no exponent
        None => raw,
    }
}

fn pad(text: String, spec: &FormatSpec) -> String {
    let Some(width) = spec.width else {
        return text;
    };
    let len = text.chars().count();
    if len >= width {
        return text;
    }
    let fill = width - len;
    if spec.zero_pad {
        let (sign, digits) = match text.strip_prefix('-') {
            Some(digits) => ("-", digits),
            None => ("", text.as_str()),
        };
        format!("{sign}{}{digits}", "0".repeat(fill))
    } else {
        format!("{}{text}", " ".repeat(fill))
    }
}
