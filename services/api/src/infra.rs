use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tiered_rate::config::CalculatorConfig;
use tiered_rate::error::AppError;
use tiered_rate::ProfileRegistry;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Built-in profiles plus any configured profile file.
pub(crate) fn load_registry(config: &CalculatorConfig) -> Result<ProfileRegistry, AppError> {
    let mut registry = ProfileRegistry::standard()?;

    if let Some(path) = &config.profiles_path {
        let added = registry.extend_from_path(path)?;
        info!(path = %path.display(), added, "loaded calculator profiles from file");
    }

    info!(profiles = registry.len(), "calculator registry ready");
    Ok(registry)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_attribute(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("attribute name is empty in '{raw}'"));
    }
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("attribute '{name}' must be a number ({err})"))?;
    Ok((name.to_string(), value))
}

pub(crate) fn parse_decimal(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|err| format!("failed to parse '{raw}' as an amount ({err})"))
}
