//! Parameter files.
//!
//! One `NAME = expression` per line. Lines without `=` are ignored and `#`
//! starts a comment. Expressions may reference parameters defined on earlier
//! lines; a later definition of the same name replaces the earlier one.
//!
//! ```text
//! # mode choice
//! asc_car   = 0.35
//! b_time    = -0.042
//! lambda_pt = 0.5 * (1 + 0.2)
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use dc_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::expr::CompiledExpr;

/// Named real-valued parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: BTreeMap<String, f64>,
}

impl ParameterSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse parameter file text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut set = Self::new();
        for (n, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default();
            let Some((name, expression)) = line.split_once('=') else {
                continue;
            };
            let lineno = n + 1;
            let name = name.trim();
            if !is_identifier(name) {
                return Err(Error::Expression(format!(
                    "line {lineno}: invalid parameter name '{name}'"
                )));
            }
            let value = CompiledExpr::compile(expression)
                .and_then(|e| e.eval_with(|v| set.get(v)))
                .map_err(|e| Error::Expression(format!("line {lineno}: {}", strip_prefix(&e))))?;
            if set.values.insert(name.to_string(), value).is_some() {
                log::debug!("parameter '{name}' redefined on line {lineno}");
            }
        }
        Ok(set)
    }

    /// Read and parse a parameter file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Value of `name`, if defined.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Value of `name`, or an `Expression` error naming it.
    pub fn require(&self, name: &str) -> Result<f64> {
        self.get(name).ok_or_else(|| Error::Expression(format!("unknown parameter '{name}'")))
    }

    /// Define or replace a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    /// Evaluate an expression against this set.
    pub fn evaluate(&self, expression: &CompiledExpr) -> Result<f64> {
        expression.eval_with(|v| self.get(v))
    }

    /// Parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` if no parameter is defined.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, f64)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn strip_prefix(e: &Error) -> String {
    match e {
        Error::Expression(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_parameter_file() {
        let text = "\
# header comment
ASC_CAR = 0.35
B_TIME = -4.2e-2   # per minute
some text without assignment

LAMBDA_PT = 0.5 * (1 + 0.2)
DERIVED = ASC_CAR * 2 + B_TIME ^ 2
";
        let p = ParameterSet::parse(text).unwrap();
        assert_eq!(p.len(), 4);
        assert_relative_eq!(p.get("ASC_CAR").unwrap(), 0.35);
        assert_relative_eq!(p.get("B_TIME").unwrap(), -0.042);
        assert_relative_eq!(p.get("LAMBDA_PT").unwrap(), 0.6, epsilon = 1e-12);
        assert_relative_eq!(p.get("DERIVED").unwrap(), 0.7 + 0.042 * 0.042, epsilon = 1e-12);
        assert!(p.get("some").is_none());
    }

    #[test]
    fn test_errors_name_the_line() {
        let err = ParameterSet::parse("A = 1\nB = 2 +\n").unwrap_err();
        assert!(matches!(&err, Error::Expression(msg) if msg.starts_with("line 2:")), "{err}");

        let err = ParameterSet::parse("A = B\nB = 1\n").unwrap_err();
        assert!(matches!(
            &err,
            Error::Expression(msg) if msg.contains("line 1") && msg.contains("'B'")
        ));

        let err = ParameterSet::parse("1A = 3\n").unwrap_err();
        assert!(matches!(&err, Error::Expression(msg) if msg.contains("invalid parameter name")));
    }

    #[test]
    fn test_redefinition_and_lookup() {
        let p = ParameterSet::parse("X = 1\nX = X + 1\n").unwrap();
        assert_eq!(p.get("X"), Some(2.0));
        assert_eq!(p.require("X").unwrap(), 2.0);
        assert!(p.require("Y").is_err());

        let e = CompiledExpr::compile("X * 10").unwrap();
        assert_eq!(p.evaluate(&e).unwrap(), 20.0);
    }

    #[test]
    fn test_json_roundtrip_is_flat_map() {
        let p: ParameterSet = [("a".to_string(), 1.5)].into_iter().collect();
        assert_eq!(serde_json::to_string(&p).unwrap(), r#"{"a":1.5}"#);
    }
}
