use std::io::Write;

use rust_decimal_macros::dec;
use tiered_rate::profiles::{standard, ProfileRegistry};
use tiered_rate::{CalculationInput, ProfileError};

fn write_profiles(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!(
        "tiered-rate-{name}-{}.json",
        std::process::id()
    ));
    let mut file = std::fs::File::create(&path).expect("temp file");
    file.write_all(contents.as_bytes()).expect("write profiles");
    path
}

#[test]
fn standard_registry_contains_every_builtin() {
    let registry = ProfileRegistry::standard().expect("built-ins are valid");
    let names: Vec<&str> = registry.names().collect();

    for expected in [
        standard::BANKING_INTEREST,
        standard::DELIVERY_ESTIMATOR,
        standard::CINEMA_TICKETING,
        standard::EMPLOYEE_BONUS,
        standard::GAME_REWARD,
        standard::LIBRARY_FINE,
    ] {
        assert!(names.contains(&expected), "missing {expected}");
    }
}

#[test]
fn file_profiles_extend_the_standard_registry() {
    let path = write_profiles(
        "extend",
        r#"[
            {
                "name": "seasonal_deposit",
                "description": "Promotional rate from April",
                "composition": "compound",
                "rates": {"promo": 0.05},
                "rules": [
                    {
                        "label": "spring promotion",
                        "when": {"evaluated_on_or_after": "2025-04-01"},
                        "adjustment": {"kind": "rate", "value": 0.005}
                    }
                ]
            }
        ]"#,
    );

    let mut registry = ProfileRegistry::standard().expect("built-ins are valid");
    let added = registry.extend_from_path(&path).expect("profiles load");
    std::fs::remove_file(&path).ok();

    assert_eq!(added, 1);
    let date = chrono::NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid date");
    let result = registry
        .compute(
            "seasonal_deposit",
            &CalculationInput::new("promo", 10_000.0, 1).evaluated_on(date),
        )
        .expect("computes");
    assert_eq!(result.final_amount, dec!(10550.00));

    let undated = registry.compute("seasonal_deposit", &CalculationInput::new("promo", 10_000.0, 1));
    assert!(undated.is_err());
}

#[test]
fn file_cannot_shadow_builtin_profiles() {
    let path = write_profiles(
        "shadow",
        r#"[{"name": "banking_interest", "composition": "compound", "rates": {"savings": 0.5}}]"#,
    );

    let mut registry = ProfileRegistry::standard().expect("built-ins are valid");
    let error = registry.extend_from_path(&path).unwrap_err();
    std::fs::remove_file(&path).ok();

    assert!(matches!(error, ProfileError::Duplicate(name) if name == "banking_interest"));
}

#[test]
fn missing_file_reports_path() {
    let mut registry = ProfileRegistry::new();
    let error = registry
        .extend_from_path("/nonexistent/tiered-rate/profiles.json")
        .unwrap_err();

    assert!(matches!(error, ProfileError::Read { .. }));
    assert!(error.to_string().contains("/nonexistent/tiered-rate/profiles.json"));
}
