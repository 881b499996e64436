//! Job parameters and batch artifact properties.
//!
//! Batch properties are written in the job descriptor and may refer to job parameters, which are
//! supplied per job execution:
//!
//! ```text
//! endpoint = #{jobParameters['endpoint']}?:direct:default;
//! ```
//!
//! - `#{jobParameters['key']}` is replaced by the parameter's value, or nothing if it is absent.
//! - A trailing `?:default;` after an expression gives the value to use when the result is empty.
//! - A value that resolves to nothing is treated as unset.

use std::collections::HashMap;

use crate::error::ConfigError;

/// Parameters supplied when starting a job execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobParameters {
    params: HashMap<String, String>,
}

/// Properties configured for one batch artifact, as written in the job descriptor.
///
/// Values are kept unresolved until [`BatchProperties::resolve`] is called.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchProperties {
    props: HashMap<String, String>,
}

impl JobParameters {
    /// No parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add or replace a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Get a parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

impl BatchProperties {
    /// No properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property.
    pub fn with(mut self, name: impl Into<String>, raw_value: impl Into<String>) -> Self {
        self.insert(name, raw_value);
        self
    }

    /// Add or replace a property.
    pub fn insert(&mut self, name: impl Into<String>, raw_value: impl Into<String>) {
        self.props.insert(name.into(), raw_value.into());
    }

    /// Get a property's raw, unresolved value.
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.props.get(name).map(String::as_str)
    }

    /// Resolve a property's value against the job parameters.
    ///
    /// Returns `Ok(None)` if the property is not set or resolves to nothing.
    pub fn resolve(
        &self,
        name: &str,
        params: &JobParameters,
    ) -> Result<Option<String>, ConfigError> {
        match self.get_raw(name) {
            Some(raw) => resolve_value(raw, params),
            None => Ok(None),
        }
    }

    /// Resolve a property that must be set.
    pub fn resolve_required(
        &self,
        name: &str,
        params: &JobParameters,
    ) -> Result<String, ConfigError> {
        self.resolve(name, params)?
            .ok_or_else(|| ConfigError::MissingProperty(name.to_string()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for JobParameters {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            params: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BatchProperties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            props: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

const EXPR_START: &str = "#{";
const DEFAULT_OP: &str = "?:";

fn resolve_value(raw: &str, params: &JobParameters) -> Result<Option<String>, ConfigError> {
    let (expr, default) = split_default(raw);

    let resolved = substitute(expr, raw, params)?;

    if !resolved.is_empty() {
        Ok(Some(resolved))
    } else {
        Ok(default.filter(|d| !d.is_empty()).map(str::to_string))
    }
}

/// Split `expr?:default;` into its parts. The operator must directly follow an expression.
fn split_default(raw: &str) -> (&str, Option<&str>) {
    let Some(without_semicolon) = raw.strip_suffix(';') else {
        return (raw, None);
    };

    // Only a `}` closing an expression can precede the operator; the default may contain `}`.
    let mut searched = 0;
    while let Some(start) = without_semicolon[searched..].find(EXPR_START) {
        let after_start = searched + start + EXPR_START.len();
        let Some(end) = without_semicolon[after_start..].find('}') else {
            break;
        };
        let close = after_start + end + 1;

        let (expr, rest) = without_semicolon.split_at(close);
        if let Some(default) = rest.strip_prefix(DEFAULT_OP) {
            return (expr, Some(default));
        }
        searched = close;
    }

    (raw, None)
}

fn substitute(expr: &str, raw: &str, params: &JobParameters) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(expr.len());
    let mut rest = expr;

    while let Some(start) = rest.find(EXPR_START) {
        out.push_str(&rest[..start]);

        let after_start = &rest[start + EXPR_START.len()..];
        let end = after_start
            .find('}')
            .ok_or_else(|| ConfigError::MalformedExpression(raw.to_string()))?;

        let key = parse_job_parameter(&after_start[..end])?;
        if let Some(value) = params.get(key) {
            out.push_str(value);
        }

        rest = &after_start[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Parse `jobParameters['key']`, returning `key`.
fn parse_job_parameter(inner: &str) -> Result<&str, ConfigError> {
    let unsupported = || ConfigError::UnsupportedExpression(format!("#{{{inner}}}"));

    let quoted = inner
        .trim()
        .strip_prefix("jobParameters[")
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(unsupported)?;

    ['\'', '"']
        .iter()
        .find_map(|q| quoted.strip_prefix(*q).and_then(|s| s.strip_suffix(*q)))
        .ok_or_else(unsupported)
}
