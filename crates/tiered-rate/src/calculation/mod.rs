//! Validated calculations over a category rate table.
//!
//! A calculation resolves a base rate for the input category, walks the
//! adjustment rules in declaration order against the untouched input, and
//! folds the applied adjustments into a single amount. Rounding happens once,
//! on the way out. Annotations are evaluated last and may read that amount.

mod annotation;
mod error;
mod input;
mod rules;
mod table;

#[cfg(test)]
mod tests;

pub use annotation::{Annotation, AnnotationValue, Increment, LabelTier};
pub use error::ValidationError;
pub use input::CalculationInput;
pub use rules::{Adjustment, AdjustmentRule, Comparison, Metric, Predicate, Threshold};
pub use table::RateTable;

pub(crate) use table::normalize_category;

use rules::RuleContext;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Decimal places kept on the final amount.
pub const AMOUNT_SCALE: u32 = 2;

/// How the effective rate turns a principal into an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
    /// `principal * (1 + rate)^duration`
    Compound,
    /// `principal * (1 + rate)`; duration only feeds rule predicates.
    Additive,
    /// `principal * (1 + rate) * duration`; principal is a unit price.
    PerUnit,
}

impl Composition {
    pub fn label(&self) -> &'static str {
        match self {
            Composition::Compound => "compound",
            Composition::Additive => "additive",
            Composition::PerUnit => "per unit",
        }
    }

    fn growth(self, base: f64, duration: u32) -> f64 {
        match self {
            Composition::Compound => base.powf(f64::from(duration)),
            Composition::Additive => base,
            Composition::PerUnit => base * f64::from(duration),
        }
    }
}

/// Stateless calculator bundling a rate table with its ordered rules.
#[derive(Debug, Clone, PartialEq)]
pub struct TieredRateCalculator {
    table: RateTable,
    rules: Vec<AdjustmentRule>,
    annotations: Vec<Annotation>,
    composition: Composition,
}

impl TieredRateCalculator {
    pub fn new(table: RateTable, composition: Composition) -> Self {
        Self {
            table,
            rules: Vec::new(),
            annotations: Vec::new(),
            composition,
        }
    }

    pub fn with_rule(mut self, rule: AdjustmentRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = AdjustmentRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn with_annotations(mut self, annotations: impl IntoIterator<Item = Annotation>) -> Self {
        self.annotations.extend(annotations);
        self
    }

    pub fn table(&self) -> &RateTable {
        &self.table
    }

    pub fn rules(&self) -> &[AdjustmentRule] {
        &self.rules
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn composition(&self) -> Composition {
        self.composition
    }

    pub fn compute(&self, input: &CalculationInput) -> Result<CalculationResult, ValidationError> {
        let mut result = compute(input, &self.table, &self.rules, self.composition)?;
        annotate(&mut result, input, &self.table, &self.annotations)?;
        Ok(result)
    }
}

/// Compute a result for `input`, or reject it without producing any amount.
pub fn compute(
    input: &CalculationInput,
    table: &RateTable,
    rules: &[AdjustmentRule],
    composition: Composition,
) -> Result<CalculationResult, ValidationError> {
    if input.category.trim().is_empty() {
        return Err(ValidationError::new(
            "category",
            &input.category,
            "is required",
        ));
    }
    if !input.principal.is_finite() || input.principal <= 0.0 {
        return Err(ValidationError::new(
            "principal",
            input.principal,
            "must be a finite number greater than zero",
        ));
    }
    if input.duration == 0 {
        return Err(ValidationError::new(
            "duration",
            input.duration,
            "must be greater than zero",
        ));
    }

    let (category, base_rate) = table.lookup(&input.category).ok_or_else(|| {
        ValidationError::new("category", &input.category, "is not in the rate table")
    })?;

    let context = RuleContext {
        input,
        category,
        table,
        final_amount: None,
    };

    let mut adjustments = Vec::new();
    for rule in rules {
        if rule.when.evaluate(&context)? {
            adjustments.push(AppliedAdjustment {
                label: rule.label.clone(),
                adjustment: rule.adjustment,
            });
        }
    }

    let effective_rate = fold_rate(base_rate, &adjustments);
    let growth_base = 1.0 + effective_rate;
    if growth_base <= 0.0 {
        return Err(ValidationError::new(
            "effective_rate",
            effective_rate,
            "must be greater than -1",
        ));
    }

    let rated = input.principal
        * composition.growth(growth_base, input.duration)
        * fold_factor(&adjustments);
    let raw_amount = rated + fold_flat(&adjustments);

    Ok(CalculationResult {
        category: category.to_string(),
        composition,
        principal: input.principal,
        duration: input.duration,
        base_rate,
        effective_rate,
        final_amount: round_amount(raw_amount, input.principal)?,
        adjustments,
        annotations: BTreeMap::new(),
    })
}

/// Evaluate `annotations` against `input` and the amount already in `result`.
pub fn annotate(
    result: &mut CalculationResult,
    input: &CalculationInput,
    table: &RateTable,
    annotations: &[Annotation],
) -> Result<(), ValidationError> {
    let context = RuleContext {
        input,
        category: &result.category,
        table,
        final_amount: result.final_amount.to_f64(),
    };

    let mut values = BTreeMap::new();
    for annotation in annotations {
        values.insert(annotation.name().to_string(), annotation.evaluate(&context)?);
    }

    result.annotations.extend(values);
    Ok(())
}

fn round_amount(raw: f64, principal: f64) -> Result<Decimal, ValidationError> {
    let mut amount = decimal_from_f64(raw).ok_or_else(|| {
        ValidationError::new("principal", principal, "calculated amount is out of range")
    })?;
    amount = amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    amount.rescale(AMOUNT_SCALE);
    Ok(amount)
}

/// Shortest decimal that round-trips to `raw`, so `1.005` stays a midpoint.
pub(crate) fn decimal_from_f64(raw: f64) -> Option<Decimal> {
    if !raw.is_finite() {
        return None;
    }
    Decimal::from_str(&raw.to_string()).ok()
}

fn fold_rate(base_rate: f64, adjustments: &[AppliedAdjustment]) -> f64 {
    adjustments
        .iter()
        .fold(base_rate, |rate, applied| match applied.adjustment {
            Adjustment::Rate(delta) => rate + delta,
            _ => rate,
        })
}

fn fold_factor(adjustments: &[AppliedAdjustment]) -> f64 {
    adjustments
        .iter()
        .fold(1.0, |product, applied| match applied.adjustment {
            Adjustment::Factor(factor) => product * factor,
            _ => product,
        })
}

fn fold_flat(adjustments: &[AppliedAdjustment]) -> f64 {
    adjustments
        .iter()
        .fold(0.0, |sum, applied| match applied.adjustment {
            Adjustment::Flat(amount) => sum + amount,
            _ => sum,
        })
}

/// Audit entry for a rule that applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedAdjustment {
    pub label: String,
    pub adjustment: Adjustment,
}

/// Outcome of a calculation with the trail needed to re-derive it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub category: String,
    pub composition: Composition,
    pub principal: f64,
    pub duration: u32,
    pub base_rate: f64,
    pub effective_rate: f64,
    pub final_amount: Decimal,
    pub adjustments: Vec<AppliedAdjustment>,
    /// Secondary outputs keyed by annotation name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, AnnotationValue>,
}

impl CalculationResult {
    /// Base rate plus every applied rate delta, in application order.
    pub fn rate_from_adjustments(&self) -> f64 {
        fold_rate(self.base_rate, &self.adjustments)
    }

    pub fn flat_total(&self) -> f64 {
        fold_flat(&self.adjustments)
    }

    pub fn factor_product(&self) -> f64 {
        fold_factor(&self.adjustments)
    }

    /// Final amount minus principal, e.g. interest earned or fees charged.
    pub fn amount_over_principal(&self) -> Option<Decimal> {
        decimal_from_f64(self.principal).map(|principal| self.final_amount - principal)
    }

    pub fn annotation(&self, name: &str) -> Option<&AnnotationValue> {
        self.annotations.get(name)
    }

    pub fn applied(&self, label: &str) -> bool {
        self.adjustments
            .iter()
            .any(|applied| applied.label == label)
    }
}
