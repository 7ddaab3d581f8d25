use crate::calculation::{
    Adjustment, AdjustmentRule, Composition, Metric, Predicate, RateTable, Threshold,
    TieredRateCalculator,
};

pub(super) fn deposit_table() -> RateTable {
    RateTable::new()
        .with_rate("savings", 0.04)
        .with_rate("fixed", 0.065)
}

pub(super) fn high_balance_bonus() -> AdjustmentRule {
    AdjustmentRule::new(
        "high balance bonus",
        Threshold::above(Metric::Principal, 100_000.0),
        Adjustment::Rate(0.01),
    )
}

pub(super) fn deposit_calculator() -> TieredRateCalculator {
    TieredRateCalculator::new(deposit_table(), Composition::Compound).with_rule(high_balance_bonus())
}

pub(super) fn ticket_calculator() -> TieredRateCalculator {
    let table = RateTable::new()
        .with_rate("regular", 0.0)
        .with_rate("student", -0.10)
        .with_rate("senior", 0.0);

    TieredRateCalculator::new(table, Composition::PerUnit)
        .with_rule(AdjustmentRule::new(
            "senior discount",
            Predicate::all([
                Predicate::category("senior"),
                Threshold::above(Metric::attribute("age"), 60.0).into(),
            ]),
            Adjustment::Rate(-0.20),
        ))
        .with_rule(AdjustmentRule::new(
            "bulk booking service fee",
            Threshold::above(Metric::Duration, 3.0),
            Adjustment::Flat(50.0),
        ))
}
