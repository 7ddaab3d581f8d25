//! Built-in calculator profiles.

use std::collections::BTreeMap;

use super::CalculatorProfile;
use crate::calculation::{
    Adjustment, AdjustmentRule, Annotation, Composition, Increment, LabelTier, Metric, Predicate,
    Threshold,
};

pub const BANKING_INTEREST: &str = "banking_interest";
pub const DELIVERY_ESTIMATOR: &str = "delivery_estimator";
pub const CINEMA_TICKETING: &str = "cinema_ticketing";
pub const EMPLOYEE_BONUS: &str = "employee_bonus";
pub const GAME_REWARD: &str = "game_reward";
pub const LIBRARY_FINE: &str = "library_fine";

/// Flag that waives the small-order delivery fee.
pub const PREMIUM_FLAG: &str = "premium";
/// Flag that doubles game rewards.
pub const ALL_MISSIONS_FLAG: &str = "all_missions_completed";
/// Attribute holding the customer's age in years.
pub const AGE_ATTRIBUTE: &str = "age";
/// Estimated delivery time in days.
pub const DELIVERY_DAYS: &str = "delivery_days";
/// Player rank derived from the final coin count.
pub const RANK: &str = "rank";

pub fn profiles() -> Vec<CalculatorProfile> {
    vec![
        banking_interest(),
        delivery_estimator(),
        cinema_ticketing(),
        employee_bonus(),
        game_reward(),
        library_fine(),
    ]
}

/// Annual compounding deposit growth with a high-balance bonus.
///
/// The bonus is strict: a principal of exactly 100 000 earns the base rate.
pub fn banking_interest() -> CalculatorProfile {
    CalculatorProfile {
        name: BANKING_INTEREST.to_string(),
        description: "Deposit growth compounded yearly; +1% above 100000".to_string(),
        composition: Composition::Compound,
        rates: rates([("savings", 0.04), ("fixed", 0.065)]),
        aliases: BTreeMap::from([
            ("saving".to_string(), "savings".to_string()),
            ("fixed deposit".to_string(), "fixed".to_string()),
            ("fixed_deposit".to_string(), "fixed".to_string()),
        ]),
        rules: vec![AdjustmentRule::new(
            "high balance bonus",
            Threshold::above(Metric::Principal, 100_000.0),
            Adjustment::Rate(0.01),
        )],
        annotations: Vec::new(),
    }
}

/// Order total including the small-order delivery fee.
///
/// Orders strictly below 500 pay the fee; exactly 500 ships free. Delivery
/// takes 3 days, 2 more for remote zones.
pub fn delivery_estimator() -> CalculatorProfile {
    CalculatorProfile {
        name: DELIVERY_ESTIMATOR.to_string(),
        description: "Order total with a 50 fee below 500 unless premium".to_string(),
        composition: Composition::Additive,
        rates: rates([("standard", 0.0), ("remote", 0.0)]),
        aliases: BTreeMap::new(),
        rules: vec![AdjustmentRule::new(
            "small order delivery fee",
            Predicate::all([
                Threshold::below(Metric::Principal, 500.0).into(),
                Predicate::negate(Predicate::flag(PREMIUM_FLAG)),
            ]),
            Adjustment::Flat(50.0),
        )],
        annotations: vec![Annotation::Quantity {
            name: DELIVERY_DAYS.to_string(),
            base: 3.0,
            increments: vec![Increment::new(Predicate::category("remote"), 2.0)],
        }],
    }
}

/// Ticket total: unit price times tickets, audience discount, bulk fee.
pub fn cinema_ticketing() -> CalculatorProfile {
    CalculatorProfile {
        name: CINEMA_TICKETING.to_string(),
        description: "Ticket price x tickets with audience discounts and a fee above 3 tickets"
            .to_string(),
        composition: Composition::PerUnit,
        rates: rates([("regular", 0.0), ("student", -0.10), ("senior", 0.0)]),
        aliases: BTreeMap::new(),
        rules: vec![
            AdjustmentRule::new(
                "senior discount",
                Predicate::all([
                    Predicate::category("senior"),
                    Threshold::above(Metric::attribute(AGE_ATTRIBUTE), 60.0).into(),
                ]),
                Adjustment::Rate(-0.20),
            ),
            AdjustmentRule::new(
                "bulk booking service fee",
                Threshold::above(Metric::Duration, 3.0),
                Adjustment::Flat(50.0),
            ),
        ],
        annotations: Vec::new(),
    }
}

/// Salary plus bonus; the bonus doubles after more than three years.
pub fn employee_bonus() -> CalculatorProfile {
    CalculatorProfile {
        name: EMPLOYEE_BONUS.to_string(),
        description: "Salary plus 5% bonus, 10% after more than 3 years".to_string(),
        composition: Composition::Additive,
        rates: rates([("employee", 0.05)]),
        aliases: BTreeMap::new(),
        rules: vec![AdjustmentRule::new(
            "tenure bonus",
            Threshold::above(Metric::Duration, 3.0),
            Adjustment::Rate(0.05),
        )],
        annotations: Vec::new(),
    }
}

/// Coin reward doubled when every mission is complete; more than 1000
/// coins ranks the player Elite.
pub fn game_reward() -> CalculatorProfile {
    CalculatorProfile {
        name: GAME_REWARD.to_string(),
        description: "Base coins, doubled when all missions are completed".to_string(),
        composition: Composition::Additive,
        rates: rates([("player", 0.0)]),
        aliases: BTreeMap::new(),
        rules: vec![AdjustmentRule::new(
            "all missions bonus",
            Predicate::flag(ALL_MISSIONS_FLAG),
            Adjustment::Factor(2.0),
        )],
        annotations: vec![Annotation::Label {
            name: RANK.to_string(),
            tiers: vec![LabelTier::new(
                Threshold::above(Metric::FinalAmount, 1_000.0),
                "Elite",
            )],
            otherwise: "Regular".to_string(),
        }],
    }
}

/// Fine for one late book: daily base times days late, tiered by lateness.
///
/// 1-5 days pay the base, 6-10 days twice the base, 11+ days five times.
pub fn library_fine() -> CalculatorProfile {
    CalculatorProfile {
        name: LIBRARY_FINE.to_string(),
        description: "Per-day fine for one book: x2 after 5 days, x5 after 10 days".to_string(),
        composition: Composition::PerUnit,
        rates: rates([("book", 0.0)]),
        aliases: BTreeMap::new(),
        rules: vec![
            AdjustmentRule::new(
                "second tier",
                Predicate::all([
                    Threshold::above(Metric::Duration, 5.0).into(),
                    Threshold::at_most(Metric::Duration, 10.0).into(),
                ]),
                Adjustment::Factor(2.0),
            ),
            AdjustmentRule::new(
                "third tier",
                Threshold::above(Metric::Duration, 10.0),
                Adjustment::Factor(5.0),
            ),
        ],
        annotations: Vec::new(),
    }
}

fn rates<const N: usize>(entries: [(&str, f64); N]) -> BTreeMap<String, f64> {
    entries
        .into_iter()
        .map(|(category, rate)| (category.to_string(), rate))
        .collect()
}
