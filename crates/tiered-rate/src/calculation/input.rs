use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ValidationError;

/// A single calculation request.
///
/// `category`, `principal`, and `duration` are required. Flags, numeric
/// attributes, and the evaluation date only matter to rules that reference
/// them; an absent flag reads as `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationInput {
    pub category: String,
    pub principal: f64,
    /// Years for compounding profiles, quantity (tickets, days) elsewhere.
    pub duration: u32,
    #[serde(default)]
    pub flags: BTreeSet<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,
    /// Explicit "as of" date for date-keyed rules. Never defaulted to today.
    #[serde(default)]
    pub evaluated_on: Option<NaiveDate>,
}

impl CalculationInput {
    pub fn new(category: impl Into<String>, principal: f64, duration: u32) -> Self {
        Self {
            category: category.into(),
            principal,
            duration,
            flags: BTreeSet::new(),
            attributes: BTreeMap::new(),
            evaluated_on: None,
        }
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.insert(flag.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn evaluated_on(mut self, date: NaiveDate) -> Self {
        self.evaluated_on = Some(date);
        self
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Read a request body field by field, so a malformed field is reported
    /// by name instead of failing the whole document.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let object = body.as_object().ok_or_else(|| {
            ValidationError::new("body", rendered(body), "must be a JSON object")
        })?;

        let category = match required(object, "category")? {
            Value::String(category) => category.clone(),
            other => {
                return Err(ValidationError::new(
                    "category",
                    rendered(other),
                    "must be a string",
                ))
            }
        };

        let principal_raw = required(object, "principal")?;
        let principal = principal_raw.as_f64().ok_or_else(|| {
            ValidationError::new("principal", rendered(principal_raw), "must be a number")
        })?;

        let duration_raw = required(object, "duration")?;
        let duration = duration_raw
            .as_u64()
            .and_then(|duration| u32::try_from(duration).ok())
            .ok_or_else(|| {
                ValidationError::new("duration", rendered(duration_raw), "must be a whole number")
            })?;

        let mut input = Self::new(category, principal, duration);

        match object.get("flags") {
            None | Some(Value::Null) => {}
            Some(Value::Array(flags)) => {
                for flag in flags {
                    let flag = flag.as_str().ok_or_else(|| {
                        ValidationError::new("flags", rendered(flag), "must be a string")
                    })?;
                    input = input.with_flag(flag);
                }
            }
            Some(other) => {
                return Err(ValidationError::new(
                    "flags",
                    rendered(other),
                    "must be a list of strings",
                ))
            }
        }

        match object.get("attributes") {
            None | Some(Value::Null) => {}
            Some(Value::Object(attributes)) => {
                for (name, value) in attributes {
                    let value = value.as_f64().ok_or_else(|| {
                        ValidationError::new(
                            format!("attributes.{name}"),
                            rendered(value),
                            "must be a number",
                        )
                    })?;
                    input = input.with_attribute(name.clone(), value);
                }
            }
            Some(other) => {
                return Err(ValidationError::new(
                    "attributes",
                    rendered(other),
                    "must be an object of numbers",
                ))
            }
        }

        match object.get("evaluated_on") {
            None | Some(Value::Null) => {}
            Some(raw) => {
                let date = raw
                    .as_str()
                    .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
                    .ok_or_else(|| {
                        ValidationError::new(
                            "evaluated_on",
                            rendered(raw),
                            "must be a YYYY-MM-DD date",
                        )
                    })?;
                input = input.evaluated_on(date);
            }
        }

        Ok(input)
    }
}

fn required<'a>(object: &'a Map<String, Value>, field: &str) -> Result<&'a Value, ValidationError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ValidationError::missing(field, "is required")),
        Some(value) => Ok(value),
    }
}

/// Strings echo without JSON quotes.
fn rendered(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_full_request() {
        let input = CalculationInput::from_json(&json!({
            "category": "senior",
            "principal": 120,
            "duration": 2,
            "flags": ["matinee"],
            "attributes": {"age": 64},
            "evaluated_on": "2025-11-12"
        }))
        .expect("valid body");

        assert_eq!(input.principal, 120.0);
        assert!(input.has_flag("matinee"));
        assert_eq!(input.attributes.get("age"), Some(&64.0));
        assert_eq!(input.evaluated_on, NaiveDate::from_ymd_opt(2025, 11, 12));
    }

    #[test]
    fn negative_or_fractional_duration_is_named() {
        for duration in [json!(-1), json!(2.5), json!("three")] {
            let error = CalculationInput::from_json(
                &json!({"category": "savings", "principal": 100, "duration": duration}),
            )
            .unwrap_err();
            assert_eq!(error.field, "duration");
        }

        let error = CalculationInput::from_json(
            &json!({"category": "savings", "principal": 100, "duration": -1}),
        )
        .unwrap_err();
        assert_eq!(error.value, "-1");
    }

    #[test]
    fn missing_and_mistyped_fields_are_named() {
        let missing = CalculationInput::from_json(&json!({"principal": 100, "duration": 1}))
            .unwrap_err();
        assert_eq!(missing.field, "category");

        let mistyped = CalculationInput::from_json(
            &json!({"category": "savings", "principal": "lots", "duration": 1}),
        )
        .unwrap_err();
        assert_eq!(mistyped.field, "principal");
        assert_eq!(mistyped.value, "lots");

        let attribute = CalculationInput::from_json(&json!({
            "category": "senior", "principal": 10, "duration": 1, "attributes": {"age": "old"}
        }))
        .unwrap_err();
        assert_eq!(attribute.field, "attributes.age");
    }
}
