use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::rules::{Predicate, RuleContext};

/// Secondary output derived after the final amount is known, such as a rank
/// or an estimated delivery time. Predicates here may read `final_amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    /// Label of the first matching tier, else `otherwise`.
    Label {
        name: String,
        tiers: Vec<LabelTier>,
        otherwise: String,
    },
    /// `base` plus every matching increment.
    Quantity {
        name: String,
        base: f64,
        #[serde(default)]
        increments: Vec<Increment>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelTier {
    pub when: Predicate,
    pub label: String,
}

impl LabelTier {
    pub fn new(when: impl Into<Predicate>, label: impl Into<String>) -> Self {
        Self {
            when: when.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Increment {
    pub when: Predicate,
    pub amount: f64,
}

impl Increment {
    pub fn new(when: impl Into<Predicate>, amount: f64) -> Self {
        Self {
            when: when.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationValue {
    Label(String),
    Quantity(f64),
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Label(label) => f.write_str(label),
            AnnotationValue::Quantity(quantity) => write!(f, "{quantity}"),
        }
    }
}

impl Annotation {
    pub fn name(&self) -> &str {
        match self {
            Annotation::Label { name, .. } | Annotation::Quantity { name, .. } => name,
        }
    }

    pub(crate) fn predicates(&self) -> Vec<&Predicate> {
        match self {
            Annotation::Label { tiers, .. } => tiers.iter().map(|tier| &tier.when).collect(),
            Annotation::Quantity { increments, .. } => {
                increments.iter().map(|increment| &increment.when).collect()
            }
        }
    }

    /// Numeric constants that must be finite for the annotation to be usable.
    pub(crate) fn constants(&self) -> Vec<f64> {
        match self {
            Annotation::Label { .. } => Vec::new(),
            Annotation::Quantity {
                base, increments, ..
            } => std::iter::once(*base)
                .chain(increments.iter().map(|increment| increment.amount))
                .collect(),
        }
    }

    pub(crate) fn evaluate(
        &self,
        context: &RuleContext<'_>,
    ) -> Result<AnnotationValue, ValidationError> {
        match self {
            Annotation::Label {
                tiers, otherwise, ..
            } => {
                for tier in tiers {
                    if tier.when.evaluate(context)? {
                        return Ok(AnnotationValue::Label(tier.label.clone()));
                    }
                }
                Ok(AnnotationValue::Label(otherwise.clone()))
            }
            Annotation::Quantity {
                base, increments, ..
            } => {
                let mut total = *base;
                for increment in increments {
                    if increment.when.evaluate(context)? {
                        total += increment.amount;
                    }
                }
                Ok(AnnotationValue::Quantity(total))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::{CalculationInput, Metric, RateTable, Threshold};

    fn rank() -> Annotation {
        Annotation::Label {
            name: "rank".to_string(),
            tiers: vec![
                LabelTier::new(Threshold::above(Metric::FinalAmount, 1_000.0), "Elite"),
                LabelTier::new(Threshold::above(Metric::FinalAmount, 500.0), "Veteran"),
            ],
            otherwise: "Regular".to_string(),
        }
    }

    #[test]
    fn first_matching_tier_wins() {
        let table = RateTable::new().with_rate("player", 0.0);
        let input = CalculationInput::new("player", 10.0, 1);
        let at = |amount: f64| RuleContext {
            input: &input,
            category: "player",
            table: &table,
            final_amount: Some(amount),
        };

        assert_eq!(
            rank().evaluate(&at(1_880.0)).unwrap(),
            AnnotationValue::Label("Elite".to_string())
        );
        assert_eq!(
            rank().evaluate(&at(600.0)).unwrap(),
            AnnotationValue::Label("Veteran".to_string())
        );
        assert_eq!(
            rank().evaluate(&at(1_000.0)).unwrap().to_string(),
            "Veteran"
        );
        assert_eq!(rank().evaluate(&at(40.0)).unwrap().to_string(), "Regular");
    }

    #[test]
    fn quantity_sums_matching_increments() {
        let table = RateTable::new()
            .with_rate("standard", 0.0)
            .with_rate("remote", 0.0);
        let input = CalculationInput::new("remote", 300.0, 1).with_flag("express");
        let days = Annotation::Quantity {
            name: "delivery_days".to_string(),
            base: 3.0,
            increments: vec![
                Increment::new(Predicate::category("remote"), 2.0),
                Increment::new(Predicate::flag("express"), -1.0),
            ],
        };
        let context = RuleContext {
            input: &input,
            category: "remote",
            table: &table,
            final_amount: Some(300.0),
        };

        assert_eq!(
            days.evaluate(&context).unwrap(),
            AnnotationValue::Quantity(4.0)
        );
        assert_eq!(days.constants(), vec![3.0, 2.0, -1.0]);
    }

    #[test]
    fn annotations_deserialize_with_kind_tags() {
        let annotation: Annotation = serde_json::from_str(
            r#"{"kind":"label","name":"rank","otherwise":"Regular",
                "tiers":[{"when":{"threshold":{"metric":"final_amount","value":1000}},"label":"Elite"}]}"#,
        )
        .unwrap();

        assert_eq!(annotation.name(), "rank");
        assert_eq!(annotation.predicates().len(), 1);
    }
}
