use super::common::*;
use crate::calculation::{compute, Adjustment, CalculationInput, Composition};
use rust_decimal_macros::dec;

#[test]
fn savings_above_threshold_earns_bonus_rate() {
    let calculator = deposit_calculator();
    let input = CalculationInput::new("savings", 150_000.0, 3);

    let result = calculator.compute(&input).expect("valid input");

    assert!((result.effective_rate - 0.05).abs() < 1e-12);
    assert_eq!(result.final_amount, dec!(173643.75));
    assert!(result.applied("high balance bonus"));
}

#[test]
fn principal_exactly_at_threshold_gets_no_bonus() {
    let calculator = deposit_calculator();
    let input = CalculationInput::new("fixed", 100_000.0, 1);

    let result = calculator.compute(&input).expect("valid input");

    assert_eq!(result.effective_rate, 0.065);
    assert_eq!(result.final_amount, dec!(106500.00));
    assert!(result.adjustments.is_empty());
}

#[test]
fn unknown_category_is_rejected_on_category_field() {
    let calculator = deposit_calculator();
    let input = CalculationInput::new("premium", 150_000.0, 3);

    let error = calculator.compute(&input).unwrap_err();

    assert_eq!(error.field, "category");
    assert_eq!(error.value, "premium");
}

#[test]
fn blank_category_is_required() {
    let error = deposit_calculator()
        .compute(&CalculationInput::new("   ", 10.0, 1))
        .unwrap_err();
    assert_eq!(error.field, "category");
    assert!(error.reason.contains("required"));
}

#[test]
fn non_positive_or_non_finite_principal_is_rejected() {
    let calculator = deposit_calculator();

    for principal in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let error = calculator
            .compute(&CalculationInput::new("savings", principal, 1))
            .unwrap_err();
        assert_eq!(error.field, "principal", "principal {principal} should fail");
    }
}

#[test]
fn zero_duration_is_rejected() {
    let error = deposit_calculator()
        .compute(&CalculationInput::new("savings", 1_000.0, 0))
        .unwrap_err();
    assert_eq!(error.field, "duration");
    assert_eq!(error.value, "0");
}

#[test]
fn category_lookup_ignores_letter_case() {
    let calculator = deposit_calculator();
    let lower = calculator
        .compute(&CalculationInput::new("savings", 150_000.0, 3))
        .expect("lower case");

    for variant in ["SAVINGS", "Savings", "sAvInGs"] {
        let result = calculator
            .compute(&CalculationInput::new(variant, 150_000.0, 3))
            .expect("case variant");
        assert_eq!(result, lower);
    }
}

#[test]
fn repeated_calls_return_identical_results() {
    let calculator = deposit_calculator();
    let input = CalculationInput::new("fixed", 150_000.0, 3);

    let first = calculator.compute(&input).expect("first call");
    let second = calculator.compute(&input).expect("second call");

    assert_eq!(first, second);
    assert_eq!(first.final_amount, dec!(186344.53));
}

#[test]
fn effective_rate_can_be_rederived_from_breakdown() {
    let calculator = deposit_calculator().with_rule(crate::calculation::AdjustmentRule::new(
        "loyalty bonus",
        crate::calculation::Predicate::flag("loyal"),
        Adjustment::Rate(0.0025),
    ));

    for input in [
        CalculationInput::new("savings", 150_000.0, 3).with_flag("loyal"),
        CalculationInput::new("fixed", 90_000.0, 2).with_flag("loyal"),
        CalculationInput::new("savings", 10.0, 1),
    ] {
        let result = calculator.compute(&input).expect("valid input");
        assert_eq!(result.rate_from_adjustments(), result.effective_rate);
    }
}

#[test]
fn rules_are_evaluated_against_the_original_principal() {
    // The flat bonus pushes the amount over the threshold, the rate rule must still not fire.
    let calculator = crate::calculation::TieredRateCalculator::new(
        deposit_table(),
        Composition::Additive,
    )
    .with_rule(crate::calculation::AdjustmentRule::new(
        "welcome credit",
        crate::calculation::Predicate::Always,
        Adjustment::Flat(10_000.0),
    ))
    .with_rule(high_balance_bonus());

    let result = calculator
        .compute(&CalculationInput::new("savings", 95_000.0, 1))
        .expect("valid input");

    assert_eq!(result.adjustments.len(), 1);
    assert_eq!(result.effective_rate, 0.04);
    assert_eq!(result.final_amount, dec!(108800.00));
}

#[test]
fn free_function_matches_calculator_method() {
    let table = deposit_table();
    let rules = [high_balance_bonus()];
    let input = CalculationInput::new("savings", 120_000.0, 5);

    let direct = compute(&input, &table, &rules, Composition::Compound).expect("valid input");
    let via_calculator = deposit_calculator().compute(&input).expect("valid input");

    assert_eq!(direct, via_calculator);
    assert_eq!(direct.final_amount, dec!(153153.79));
}

#[test]
fn failing_rule_yields_no_partial_result() {
    let calculator = ticket_calculator();
    let input = CalculationInput::new("senior", 180.0, 2);

    let error = calculator.compute(&input).unwrap_err();

    assert_eq!(error.field, "attributes.age");
}
