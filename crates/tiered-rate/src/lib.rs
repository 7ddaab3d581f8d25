//! Tiered rate calculations: validated inputs, category rate tables, and
//! ordered threshold adjustments with an auditable breakdown.

pub mod batch;
pub mod calculation;
pub mod config;
pub mod error;
pub mod profiles;
pub mod telemetry;

pub use calculation::{
    annotate, compute, Adjustment, AdjustmentRule, Annotation, AnnotationValue,
    AppliedAdjustment, CalculationInput, CalculationResult, Comparison, Composition, Increment,
    LabelTier, Metric, Predicate, RateTable, Threshold, TieredRateCalculator, ValidationError,
};
pub use profiles::{CalculatorProfile, ProfileError, ProfileRegistry, ProfileSummary};
