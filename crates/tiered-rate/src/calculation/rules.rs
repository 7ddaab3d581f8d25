use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::input::CalculationInput;
use super::table::RateTable;

/// Conditional adjustment applied when its predicate holds for the raw input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRule {
    pub label: String,
    pub when: Predicate,
    pub adjustment: Adjustment,
}

impl AdjustmentRule {
    pub fn new(label: impl Into<String>, when: impl Into<Predicate>, adjustment: Adjustment) -> Self {
        Self {
            label: label.into(),
            when: when.into(),
            adjustment,
        }
    }
}

/// Contribution of a rule once it applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Adjustment {
    /// Added to the effective rate before the composition formula runs.
    Rate(f64),
    /// Added to the final amount after rating.
    Flat(f64),
    /// Multiplies the rated amount; `0.9` is a 10% discount.
    Factor(f64),
}

impl Adjustment {
    pub fn value(&self) -> f64 {
        match self {
            Adjustment::Rate(value) | Adjustment::Flat(value) | Adjustment::Factor(value) => {
                *value
            }
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Adjustment::Rate(_) => "rate",
            Adjustment::Flat(_) => "flat",
            Adjustment::Factor(_) => "factor",
        }
    }
}

/// Eligibility condition for an [`AdjustmentRule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Always,
    Threshold(Threshold),
    Flag(String),
    CategoryIs(String),
    EvaluatedOnOrAfter(NaiveDate),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn flag(name: impl Into<String>) -> Self {
        Self::Flag(name.into())
    }

    pub fn category(name: impl Into<String>) -> Self {
        Self::CategoryIs(name.into())
    }

    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::All(predicates.into_iter().collect())
    }

    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::Any(predicates.into_iter().collect())
    }

    pub fn negate(predicate: impl Into<Predicate>) -> Self {
        Self::Not(Box::new(predicate.into()))
    }

    /// Evaluate against the original input. `All`/`Any` short-circuit, so a
    /// missing attribute only fails the request when a rule actually needs it.
    pub(crate) fn evaluate(&self, context: &RuleContext<'_>) -> Result<bool, ValidationError> {
        match self {
            Predicate::Always => Ok(true),
            Predicate::Threshold(threshold) => threshold.evaluate(context),
            Predicate::Flag(name) => Ok(context.input.has_flag(name)),
            Predicate::CategoryIs(name) => Ok(context
                .table
                .lookup(name)
                .is_some_and(|(canonical, _)| canonical == context.category)),
            Predicate::EvaluatedOnOrAfter(date) => {
                let evaluated_on = context.input.evaluated_on.ok_or_else(|| {
                    ValidationError::missing("evaluated_on", "required by a date-keyed rule")
                })?;
                Ok(evaluated_on >= *date)
            }
            Predicate::All(predicates) => {
                for predicate in predicates {
                    if !predicate.evaluate(context)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Any(predicates) => {
                for predicate in predicates {
                    if predicate.evaluate(context)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(predicate) => predicate.evaluate(context).map(|holds| !holds),
        }
    }

    pub(crate) fn thresholds(&self) -> Vec<&Threshold> {
        match self {
            Predicate::Threshold(threshold) => vec![threshold],
            Predicate::All(predicates) | Predicate::Any(predicates) => {
                predicates.iter().flat_map(Predicate::thresholds).collect()
            }
            Predicate::Not(predicate) => predicate.thresholds(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn categories(&self) -> Vec<&str> {
        match self {
            Predicate::CategoryIs(name) => vec![name.as_str()],
            Predicate::All(predicates) | Predicate::Any(predicates) => {
                predicates.iter().flat_map(Predicate::categories).collect()
            }
            Predicate::Not(predicate) => predicate.categories(),
            _ => Vec::new(),
        }
    }
}

impl From<Threshold> for Predicate {
    fn from(value: Threshold) -> Self {
        Self::Threshold(value)
    }
}

/// Comparison of one input metric against a fixed boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub metric: Metric,
    #[serde(default)]
    pub comparison: Comparison,
    pub value: f64,
}

impl Threshold {
    pub fn above(metric: Metric, value: f64) -> Self {
        Self {
            metric,
            comparison: Comparison::Greater,
            value,
        }
    }

    pub fn at_least(metric: Metric, value: f64) -> Self {
        Self {
            metric,
            comparison: Comparison::GreaterOrEqual,
            value,
        }
    }

    pub fn below(metric: Metric, value: f64) -> Self {
        Self {
            metric,
            comparison: Comparison::Less,
            value,
        }
    }

    pub fn at_most(metric: Metric, value: f64) -> Self {
        Self {
            metric,
            comparison: Comparison::LessOrEqual,
            value,
        }
    }

    fn evaluate(&self, context: &RuleContext<'_>) -> Result<bool, ValidationError> {
        let observed = self.metric.read(context)?;
        Ok(self.comparison.holds(observed, self.value))
    }
}

/// Input quantity a threshold reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Principal,
    Duration,
    Attribute(String),
    /// The rounded final amount. Only annotations can read it.
    FinalAmount,
}

impl Metric {
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::Attribute(name.into())
    }

    fn read(&self, context: &RuleContext<'_>) -> Result<f64, ValidationError> {
        let input = context.input;
        match self {
            Metric::Principal => Ok(input.principal),
            Metric::Duration => Ok(f64::from(input.duration)),
            Metric::Attribute(name) => {
                let field = format!("attributes.{name}");
                let value = input.attributes.get(name).copied().ok_or_else(|| {
                    ValidationError::missing(field.clone(), "required by an adjustment rule")
                })?;
                if !value.is_finite() {
                    return Err(ValidationError::new(field, value, "must be a finite number"));
                }
                Ok(value)
            }
            Metric::FinalAmount => context.final_amount.ok_or_else(|| {
                ValidationError::missing(
                    "final_amount",
                    "is not known until the amount is computed",
                )
            }),
        }
    }
}

/// Threshold operator. Strict `greater` unless a rule opts into another one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[default]
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparison {
    pub fn holds(self, observed: f64, boundary: f64) -> bool {
        match self {
            Comparison::Greater => observed > boundary,
            Comparison::GreaterOrEqual => observed >= boundary,
            Comparison::Less => observed < boundary,
            Comparison::LessOrEqual => observed <= boundary,
        }
    }
}

pub(crate) struct RuleContext<'a> {
    pub(crate) input: &'a CalculationInput,
    pub(crate) category: &'a str,
    pub(crate) table: &'a RateTable,
    /// Set only while evaluating annotations.
    pub(crate) final_amount: Option<f64>,
}
