use rust_decimal_macros::dec;
use tiered_rate::profiles::standard;
use tiered_rate::{
    compute, Adjustment, AdjustmentRule, CalculationInput, Composition, Metric, RateTable,
    Threshold, TieredRateCalculator,
};

fn banking() -> TieredRateCalculator {
    standard::banking_interest()
        .build()
        .expect("banking profile is valid")
}

#[test]
fn savings_with_bonus_compounds_at_five_percent() {
    let result = banking()
        .compute(&CalculationInput::new("savings", 150_000.0, 3))
        .expect("valid request");

    assert!((result.effective_rate - 0.05).abs() < 1e-12);
    assert_eq!(result.final_amount, dec!(173643.75));
    assert_eq!(result.adjustments.len(), 1);
    assert_eq!(result.adjustments[0].label, "high balance bonus");
    assert_eq!(result.adjustments[0].adjustment, Adjustment::Rate(0.01));
}

#[test]
fn fixed_deposit_at_threshold_has_no_bonus() {
    let result = banking()
        .compute(&CalculationInput::new("fixed", 100_000.0, 1))
        .expect("valid request");

    assert_eq!(result.effective_rate, 0.065);
    assert_eq!(result.final_amount, dec!(106500.00));
    assert_eq!(result.amount_over_principal(), Some(dec!(6500.00)));
}

#[test]
fn unknown_account_type_is_a_category_error() {
    let error = banking()
        .compute(&CalculationInput::new("premium", 150_000.0, 3))
        .unwrap_err();

    assert_eq!(error.field, "category");
    assert!(error.to_string().contains("premium"));
}

#[test]
fn legacy_samples_match_published_totals() {
    let calculator = banking();
    let cases = [
        ("savings", 50_000.0, 2, dec!(54080.00)),
        ("fixed", 150_000.0, 3, dec!(186344.53)),
        ("savings", 120_000.0, 5, dec!(153153.79)),
        ("savings", 100_000.0, 2, dec!(108160.00)),
    ];

    for (category, principal, years, expected) in cases {
        let result = calculator
            .compute(&CalculationInput::new(category, principal, years))
            .expect("valid request");
        assert_eq!(result.final_amount, expected, "{category} {principal} {years}");
    }
}

#[test]
fn inclusive_bonus_can_be_configured_explicitly() {
    let table = RateTable::new().with_rate("fixed", 0.065);
    let rules = [AdjustmentRule::new(
        "inclusive bonus",
        Threshold::at_least(Metric::Principal, 100_000.0),
        Adjustment::Rate(0.01),
    )];

    let result = compute(
        &CalculationInput::new("fixed", 100_000.0, 1),
        &table,
        &rules,
        Composition::Compound,
    )
    .expect("valid request");

    assert_eq!(result.final_amount, dec!(107500.00));
}

#[test]
fn result_serializes_with_audit_trail() {
    let result = banking()
        .compute(&CalculationInput::new("Saving", 150_000.0, 3))
        .expect("alias resolves");

    let json = serde_json::to_value(&result).expect("serializes");
    assert_eq!(json["category"], "savings");
    assert_eq!(json["composition"], "compound");
    assert_eq!(json["final_amount"], "173643.75");
    assert_eq!(json["adjustments"][0]["adjustment"]["value"], 0.01);
}
