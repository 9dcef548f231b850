//! Scripting engine for transform functions
//!
//! Transforms are minijinja expressions, e.g. `value | trim | upper` or
//! `first_name ~ " " ~ last_name`. Values cross into the engine through
//! [`to_script`] and come back through [`from_script`]; nowhere else in the
//! crate is a row value dynamically typed.

use chrono::{Local, NaiveDate, NaiveDateTime};
use minijinja::value::ValueKind;
use minijinja::{Environment, ErrorKind, Expression, UndefinedBehavior};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::value::{DATE_FORMAT, DATETIME_FORMAT, Value};

/// Expression environment with the transform filters and functions registered
pub struct ScriptEngine {
    env: Environment<'static>,
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine").finish_non_exhaustive()
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine {
    /// Create an engine with strict undefined handling
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_filter("sha256", sha256);
        env.add_filter("regex_replace", regex_replace);
        env.add_filter("parse_date", parse_date);
        env.add_function("now", now);
        env.add_function("uuid", uuid);
        Self { env }
    }

    /// Compile an expression; `label` names it in errors
    pub fn compile(&self, label: &str, source: &str) -> Result<CompiledFunction<'_>> {
        let expr = self
            .env
            .compile_expression_owned(source.to_string())
            .map_err(|e| {
                Error::config(format!("transform '{label}' does not compile: {e}"))
            })?;
        Ok(CompiledFunction {
            label: label.to_string(),
            expr,
        })
    }
}

/// A compiled transform expression
pub struct CompiledFunction<'e> {
    label: String,
    expr: Expression<'e, 'static>,
}

impl CompiledFunction<'_> {
    /// Name used in errors
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Evaluate against a context
    pub fn eval(&self, context: minijinja::Value) -> Result<minijinja::Value> {
        self.expr.eval(context).map_err(|e| Error::TransformError {
            transform: self.label.clone(),
            message: e.to_string(),
        })
    }
}

/// Marshal a native value into the engine
pub fn to_script(value: &Value) -> minijinja::Value {
    match value {
        Value::Null => minijinja::Value::from(()),
        Value::Boolean(b) => minijinja::Value::from(*b),
        Value::Integer(i) => minijinja::Value::from(*i),
        Value::Float(f) => minijinja::Value::from(*f),
        Value::String(s) => minijinja::Value::from(s.as_str()),
        other => minijinja::Value::from(other.to_string()),
    }
}

/// Unmarshal an engine value; sequences, maps and objects are rejected
pub fn from_script(label: &str, value: &minijinja::Value) -> Result<Value> {
    let unsupported = || Error::TransformError {
        transform: label.to_string(),
        message: format!("cannot convert script value of kind {} to a column value", value.kind()),
    };

    match value.kind() {
        ValueKind::Undefined | ValueKind::None => Ok(Value::Null),
        ValueKind::Bool => Ok(Value::Boolean(value.is_true())),
        ValueKind::Number => match serde_json::to_value(value)? {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Integer(i)),
                None => n.as_f64().map(Value::Float).ok_or_else(unsupported),
            },
            _ => Err(unsupported()),
        },
        ValueKind::String => value
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(unsupported),
        ValueKind::Bytes => value
            .as_bytes()
            .map(|b| Value::Bytes(b.to_vec()))
            .ok_or_else(unsupported),
        _ => Err(unsupported()),
    }
}

fn sha256(value: &minijinja::Value) -> String {
    let text = if value.is_none() {
        String::new()
    } else {
        value.to_string()
    };
    hex::encode(Sha256::digest(text.as_bytes()))
}

fn regex_replace(
    value: &str,
    pattern: &str,
    replacement: &str,
) -> std::result::Result<String, minijinja::Error> {
    let re = regex::Regex::new(pattern).map_err(|e| {
        minijinja::Error::new(ErrorKind::InvalidOperation, format!("invalid regex: {e}"))
    })?;
    Ok(re.replace_all(value, replacement).into_owned())
}

fn parse_date(value: &str, format: &str) -> std::result::Result<String, minijinja::Error> {
    NaiveDate::parse_from_str(value, format)
        .or_else(|_| NaiveDateTime::parse_from_str(value, format).map(|dt| dt.date()))
        .map(|date| date.format(DATE_FORMAT).to_string())
        .map_err(|e| {
            minijinja::Error::new(
                ErrorKind::InvalidOperation,
                format!("cannot parse '{value}' with format '{format}': {e}"),
            )
        })
}

fn now() -> String {
    Local::now().naive_local().format(DATETIME_FORMAT).to_string()
}

fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}
