//! Named calculator profiles and the registry that serves them.
//!
//! A profile is the serializable form of a calculator: its rate table,
//! aliases, ordered rules, and composition mode. Profiles are validated once
//! when they are built, so a registered calculator never meets a malformed
//! rule at request time.

pub mod router;
pub mod standard;

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::calculation::{
    normalize_category, Adjustment, AdjustmentRule, Annotation, CalculationInput,
    CalculationResult, Composition, Metric, Predicate, RateTable, TieredRateCalculator,
    ValidationError,
};

pub use router::profile_router;

/// Serializable calculator definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub composition: Composition,
    pub rates: BTreeMap<String, f64>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub rules: Vec<AdjustmentRule>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl CalculatorProfile {
    /// Validate the definition and assemble its calculator.
    pub fn build(&self) -> Result<TieredRateCalculator, ProfileError> {
        let profile = self.name.clone();
        if profile.trim().is_empty() {
            return Err(ProfileError::MissingName);
        }
        if self.rates.is_empty() {
            return Err(ProfileError::EmptyTable { profile });
        }

        let mut table = RateTable::new();
        for (category, rate) in &self.rates {
            if category.trim().is_empty() || !rate.is_finite() {
                return Err(ProfileError::InvalidRate {
                    profile,
                    category: category.clone(),
                    rate: *rate,
                });
            }
            table = table.with_rate(category, *rate);
        }

        for (alias, target) in &self.aliases {
            if table.lookup(target).is_none() {
                return Err(ProfileError::UnknownAliasTarget {
                    profile,
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
            table = table.with_alias(alias, target);
        }

        for rule in &self.rules {
            check_rule(&profile, rule, &table)?;
        }

        let mut names = BTreeSet::new();
        for annotation in &self.annotations {
            check_annotation(&profile, annotation, &table)?;
            if !names.insert(annotation.name()) {
                return Err(ProfileError::InvalidAnnotation {
                    profile,
                    annotation: annotation.name().to_string(),
                    reason: "name is used twice".to_string(),
                });
            }
        }

        Ok(TieredRateCalculator::new(table, self.composition)
            .with_rules(self.rules.clone())
            .with_annotations(self.annotations.clone()))
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            composition: self.composition,
            categories: self
                .rates
                .keys()
                .map(|category| normalize_category(category))
                .collect(),
            rules: self.rules.iter().map(|rule| rule.label.clone()).collect(),
            annotations: self
                .annotations
                .iter()
                .map(|annotation| annotation.name().to_string())
                .collect(),
        }
    }
}

fn check_rule(profile: &str, rule: &AdjustmentRule, table: &RateTable) -> Result<(), ProfileError> {
    let invalid = |reason: String| ProfileError::InvalidRule {
        profile: profile.to_string(),
        rule: rule.label.clone(),
        reason,
    };

    if rule.label.trim().is_empty() {
        return Err(invalid("label is required".to_string()));
    }

    let value = rule.adjustment.value();
    if !value.is_finite() {
        return Err(invalid(format!(
            "{} adjustment must be finite",
            rule.adjustment.kind_label()
        )));
    }
    if matches!(rule.adjustment, Adjustment::Factor(factor) if factor < 0.0) {
        return Err(invalid("factor must not be negative".to_string()));
    }

    if rule
        .when
        .thresholds()
        .iter()
        .any(|threshold| threshold.metric == Metric::FinalAmount)
    {
        return Err(invalid(
            "final_amount can only be read by annotations".to_string(),
        ));
    }

    check_predicate(&rule.when, table).map_err(invalid)
}

fn check_annotation(
    profile: &str,
    annotation: &Annotation,
    table: &RateTable,
) -> Result<(), ProfileError> {
    let invalid = |reason: String| ProfileError::InvalidAnnotation {
        profile: profile.to_string(),
        annotation: annotation.name().to_string(),
        reason,
    };

    if annotation.name().trim().is_empty() {
        return Err(invalid("name is required".to_string()));
    }
    if annotation.constants().iter().any(|value| !value.is_finite()) {
        return Err(invalid("quantities must be finite".to_string()));
    }
    for predicate in annotation.predicates() {
        check_predicate(predicate, table).map_err(invalid)?;
    }
    Ok(())
}

fn check_predicate(predicate: &Predicate, table: &RateTable) -> Result<(), String> {
    if let Some(threshold) = predicate
        .thresholds()
        .into_iter()
        .find(|threshold| !threshold.value.is_finite())
    {
        return Err(format!(
            "threshold on {:?} must be finite",
            threshold.metric
        ));
    }

    if let Some(category) = predicate
        .categories()
        .into_iter()
        .find(|category| table.lookup(category).is_none())
    {
        return Err(format!("category '{category}' is not in the rate table"));
    }

    Ok(())
}

/// Listing entry for API responses and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub name: String,
    pub description: String,
    pub composition: Composition,
    pub categories: Vec<String>,
    pub rules: Vec<String>,
    #[serde(default)]
    pub annotations: Vec<String>,
}

/// Errors raised while defining or loading profiles.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile name is required")]
    MissingName,
    #[error("profile '{profile}' has an empty rate table")]
    EmptyTable { profile: String },
    #[error("profile '{profile}' has an invalid rate {rate} for category '{category}'")]
    InvalidRate {
        profile: String,
        category: String,
        rate: f64,
    },
    #[error("profile '{profile}' aliases '{alias}' to unknown category '{target}'")]
    UnknownAliasTarget {
        profile: String,
        alias: String,
        target: String,
    },
    #[error("profile '{profile}' rule '{rule}' is invalid: {reason}")]
    InvalidRule {
        profile: String,
        rule: String,
        reason: String,
    },
    #[error("profile '{profile}' annotation '{annotation}' is invalid: {reason}")]
    InvalidAnnotation {
        profile: String,
        annotation: String,
        reason: String,
    },
    #[error("profile '{0}' is already registered")]
    Duplicate(String),
    #[error("failed to read profiles from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid profile definition: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors from computing through the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown calculator profile '{0}'")]
    UnknownProfile(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

struct RegisteredProfile {
    profile: CalculatorProfile,
    calculator: TieredRateCalculator,
}

/// Immutable-after-startup collection of calculators keyed by profile name.
#[derive(Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, RegisteredProfile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in profiles.
    pub fn standard() -> Result<Self, ProfileError> {
        let mut registry = Self::new();
        for profile in standard::profiles() {
            registry.register(profile)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, profile: CalculatorProfile) -> Result<(), ProfileError> {
        self.extend(vec![profile]).map(|_| ())
    }

    /// Register a batch of profiles. Nothing is added unless every profile
    /// builds and no name clashes with the registry or the rest of the batch.
    pub fn extend(&mut self, profiles: Vec<CalculatorProfile>) -> Result<usize, ProfileError> {
        let mut prepared: BTreeMap<String, RegisteredProfile> = BTreeMap::new();
        for profile in profiles {
            let key = normalize_category(&profile.name);
            if self.profiles.contains_key(&key) || prepared.contains_key(&key) {
                return Err(ProfileError::Duplicate(profile.name));
            }
            let calculator = profile.build()?;
            prepared.insert(
                key,
                RegisteredProfile {
                    profile,
                    calculator,
                },
            );
        }

        let count = prepared.len();
        self.profiles.extend(prepared);
        Ok(count)
    }

    /// Register every profile in a JSON array, returning how many were added.
    pub fn extend_from_reader<R: Read>(&mut self, reader: R) -> Result<usize, ProfileError> {
        let profiles: Vec<CalculatorProfile> = serde_json::from_reader(reader)?;
        self.extend(profiles)
    }

    pub fn extend_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, ProfileError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ProfileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.extend_from_reader(std::io::BufReader::new(file))
    }

    pub fn get(&self, name: &str) -> Option<&TieredRateCalculator> {
        self.profiles
            .get(&normalize_category(name))
            .map(|registered| &registered.calculator)
    }

    pub fn compute(
        &self,
        name: &str,
        input: &CalculationInput,
    ) -> Result<CalculationResult, RegistryError> {
        let calculator = self
            .get(name)
            .ok_or_else(|| RegistryError::UnknownProfile(name.to_string()))?;
        Ok(calculator.compute(input)?)
    }

    pub fn summaries(&self) -> Vec<ProfileSummary> {
        self.profiles
            .values()
            .map(|registered| registered.profile.summary())
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
