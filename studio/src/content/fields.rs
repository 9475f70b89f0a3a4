// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use std::fmt;

static TIMEDELTA_REGEX: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(
        r"^((?P<days>\d+) days?)?\s*((?P<hours>\d+) hours?)?\s*((?P<minutes>\d+) minutes?)?\s*((?P<seconds>\d+) seconds?)?$",
    )
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    /// RFC 3339 timestamp, stored normalized to UTC.
    Date,
    /// "N days N hours N minutes N seconds" in any subset.
    Timedelta,
    List,
    Dict,
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    field: String,
    message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value for '{}': {}", self.field, self.message)
    }
}

impl std::error::Error for FieldError {}

/// A declared settings field of a block type.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub default: Value,
    pub inheritable: bool,
}

impl FieldDef {
    pub fn new(name: &str, field_type: FieldType, default: Value) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            default,
            inheritable: false,
        }
    }

    pub fn inheritable(mut self) -> Self {
        self.inheritable = true;
        self
    }

    pub fn from_json(&self, value: &Value) -> Result<Value, FieldError> {
        self.field_type.from_json(&self.name, value)
    }
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Timedelta => "timedelta",
            FieldType::List => "list",
            FieldType::Dict => "dict",
            FieldType::Any => "any",
        }
    }

    /// Coerces a client-supplied JSON value into the stored representation.
    pub fn from_json(&self, field: &str, value: &Value) -> Result<Value, FieldError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            FieldType::Any => Ok(value.clone()),
            FieldType::String => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Number(number) => Ok(Value::String(number.to_string())),
                Value::Bool(flag) => Ok(Value::String(flag.to_string())),
                _ => Err(FieldError::new(field, "expected a string")),
            },
            FieldType::Integer => integer_from_json(field, value),
            FieldType::Float => float_from_json(field, value),
            FieldType::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(raw) => Ok(Value::Bool(raw.trim().eq_ignore_ascii_case("true"))),
                Value::Number(number) => Ok(Value::Bool(number.as_f64() != Some(0.0))),
                _ => Err(FieldError::new(field, "expected a boolean")),
            },
            FieldType::Date => date_from_json(field, value),
            FieldType::Timedelta => timedelta_from_json(field, value),
            FieldType::List => match value {
                Value::Array(_) => Ok(value.clone()),
                _ => Err(FieldError::new(field, "expected a list")),
            },
            FieldType::Dict => match value {
                Value::Object(_) => Ok(value.clone()),
                _ => Err(FieldError::new(field, "expected an object")),
            },
        }
    }
}

fn is_blank(value: &Value) -> bool {
    matches!(value, Value::String(raw) if raw.trim().is_empty())
}

fn integer_from_json(field: &str, value: &Value) -> Result<Value, FieldError> {
    if is_blank(value) {
        return Ok(Value::Null);
    }
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Ok(Value::Number(int.into()))
            } else if let Some(float) = number.as_f64() {
                Ok(Value::Number((float.trunc() as i64).into()))
            } else {
                Err(FieldError::new(field, "integer out of range"))
            }
        }
        Value::String(raw) => raw
            .trim()
            .parse::<i64>()
            .map(|int| Value::Number(int.into()))
            .map_err(|_| FieldError::new(field, format!("'{}' is not an integer", raw))),
        _ => Err(FieldError::new(field, "expected an integer")),
    }
}

fn float_from_json(field: &str, value: &Value) -> Result<Value, FieldError> {
    if is_blank(value) {
        return Ok(Value::Null);
    }
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| FieldError::new(field, "expected a finite number"))
}

fn date_from_json(field: &str, value: &Value) -> Result<Value, FieldError> {
    if is_blank(value) {
        return Ok(Value::Null);
    }
    let parsed = match value {
        Value::String(raw) => parse_date(raw.trim()),
        // Numeric dates are milliseconds since the epoch.
        Value::Number(number) => number
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    };
    parsed
        .map(|date| Value::String(date.to_rfc3339_opts(SecondsFormat::Secs, true)))
        .ok_or_else(|| FieldError::new(field, "expected a date"))
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn timedelta_from_json(field: &str, value: &Value) -> Result<Value, FieldError> {
    let Value::String(raw) = value else {
        return Err(FieldError::new(field, "expected a duration string"));
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    let regex = TIMEDELTA_REGEX
        .as_ref()
        .map_err(|err| FieldError::new(field, format!("duration pattern unavailable: {}", err)))?;
    let captures = regex
        .captures(trimmed)
        .ok_or_else(|| FieldError::new(field, format!("'{}' is not a duration", raw)))?;

    let mut parts = Vec::new();
    for unit in ["days", "hours", "minutes", "seconds"] {
        if let Some(amount) = captures.name(unit) {
            parts.push(format!("{} {}", amount.as_str(), unit));
        }
    }
    Ok(Value::String(parts.join(" ")))
}
