use crate::cli::{BatchArgs, ComputeArgs};
use crate::infra::load_registry;
use std::fmt::Write;
use tiered_rate::batch::{BatchImporter, BatchReport};
use tiered_rate::config::AppConfig;
use tiered_rate::error::AppError;
use tiered_rate::{Adjustment, CalculationInput, CalculationResult, ProfileSummary};
use tracing::{info, warn};

pub(crate) fn run_profiles(config: &AppConfig) -> Result<(), AppError> {
    let registry = load_registry(&config.calculator)?;
    print!("{}", describe_profiles(&registry.summaries()));
    Ok(())
}

pub(crate) fn run_compute(config: &AppConfig, args: ComputeArgs) -> Result<(), AppError> {
    let registry = load_registry(&config.calculator)?;

    let ComputeArgs {
        profile,
        category,
        principal,
        duration,
        flags,
        attributes,
        evaluated_on,
        json,
    } = args;

    let mut input = CalculationInput::new(category, principal, duration);
    for flag in flags {
        input = input.with_flag(flag);
    }
    for (name, value) in attributes {
        input = input.with_attribute(name, value);
    }
    if let Some(date) = evaluated_on {
        input = input.evaluated_on(date);
    }

    let result = registry.compute(&profile, &input)?;
    info!(
        profile = %profile,
        category = %result.category,
        final_amount = %result.final_amount,
        "calculation completed"
    );

    if json {
        println!("{}", render_json(&result)?);
    } else {
        print!("{}", describe_result(&profile, &result));
    }
    Ok(())
}

pub(crate) fn run_batch(config: &AppConfig, args: BatchArgs) -> Result<(), AppError> {
    let registry = load_registry(&config.calculator)?;
    let calculator = registry
        .get(&args.profile)
        .ok_or_else(|| AppError::UnknownProfile(args.profile.clone()))?;

    let rows = BatchImporter::from_path(&args.csv)?;
    let report = tiered_rate::batch::compute_rows(calculator, rows);

    for (line, error) in report.failed() {
        warn!(line, field = %error.field, value = %error.value, "row rejected: {}", error.reason);
    }

    let penalty = args.penalty.zip(args.penalty_over);
    info!(
        path = %args.csv.display(),
        succeeded = report.succeeded().count(),
        failed = report.failed().count(),
        "batch computed"
    );

    print!("{}", describe_batch(&args.profile, &report, penalty));
    Ok(())
}

pub(crate) fn describe_profiles(summaries: &[ProfileSummary]) -> String {
    let mut out = String::new();
    for summary in summaries {
        let _ = writeln!(
            out,
            "- {} ({}): {}",
            summary.name,
            summary.composition.label(),
            summary.description
        );
        let _ = writeln!(out, "  categories: {}", summary.categories.join(", "));
        if !summary.rules.is_empty() {
            let _ = writeln!(out, "  rules: {}", summary.rules.join(", "));
        }
        if !summary.annotations.is_empty() {
            let _ = writeln!(out, "  outputs: {}", summary.annotations.join(", "));
        }
    }
    out
}

pub(crate) fn describe_result(profile: &str, result: &CalculationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Profile: {profile} ({})", result.composition.label());
    let _ = writeln!(
        out,
        "Category: {} (base rate {})",
        result.category,
        format_rate(result.base_rate)
    );
    let _ = writeln!(
        out,
        "Principal: {} over {}",
        result.principal, result.duration
    );

    if result.adjustments.is_empty() {
        let _ = writeln!(out, "Adjustments: none");
    } else {
        let _ = writeln!(out, "Adjustments:");
        for applied in &result.adjustments {
            let detail = match applied.adjustment {
                Adjustment::Rate(delta) => format!("rate {}", format_signed_rate(delta)),
                Adjustment::Flat(amount) => format!("flat {amount:+}"),
                Adjustment::Factor(factor) => format!("factor x{factor}"),
            };
            let _ = writeln!(out, "- {}: {}", applied.label, detail);
        }
    }

    let _ = writeln!(
        out,
        "Effective rate: {}",
        format_rate(result.effective_rate)
    );
    let _ = writeln!(out, "Final amount: {}", result.final_amount);
    for (name, value) in &result.annotations {
        let _ = writeln!(out, "{}: {}", name.replace('_', " "), value);
    }
    out
}

pub(crate) fn render_json(result: &CalculationResult) -> Result<String, AppError> {
    serde_json::to_string_pretty(result).map_err(AppError::Render)
}

pub(crate) fn describe_batch(
    profile: &str,
    report: &BatchReport,
    penalty: Option<(rust_decimal::Decimal, usize)>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Batch results for {profile}");
    for entry in &report.entries {
        match &entry.outcome {
            Ok(result) => {
                let _ = writeln!(
                    out,
                    "- line {}: {} -> {}",
                    entry.line, result.category, result.final_amount
                );
            }
            Err(error) => {
                let _ = writeln!(out, "- line {}: rejected ({})", entry.line, error);
            }
        }
    }

    let _ = writeln!(
        out,
        "Rows: {} computed, {} rejected",
        report.succeeded().count(),
        report.failed().count()
    );
    let _ = writeln!(out, "Total: {}", report.total());
    if let Some((amount, rows_over)) = penalty {
        let _ = writeln!(
            out,
            "Total with penalty ({amount} above {rows_over} rows): {}",
            report.total_with_penalty(rows_over, amount)
        );
    }
    out
}

fn format_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

fn format_signed_rate(rate: f64) -> String {
    format!("{:+.2}%", rate * 100.0)
}
