use std::collections::BTreeMap;

/// Category to base rate mapping, fixed at configuration time.
///
/// Keys are stored trimmed and lower-cased so lookups are case-insensitive.
/// Aliases resolve to a canonical category and never carry a rate of their own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: BTreeMap<String, f64>,
    aliases: BTreeMap<String, String>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, category: &str, rate: f64) -> Self {
        self.rates.insert(normalize_category(category), rate);
        self
    }

    pub fn with_alias(mut self, alias: &str, category: &str) -> Self {
        self.aliases
            .insert(normalize_category(alias), normalize_category(category));
        self
    }

    /// Resolve a category (or alias) to its canonical key and base rate.
    pub fn lookup(&self, category: &str) -> Option<(&str, f64)> {
        let key = normalize_category(category);
        let canonical = self.aliases.get(&key).unwrap_or(&key);
        self.rates
            .get_key_value(canonical)
            .map(|(name, rate)| (name.as_str(), *rate))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases
            .iter()
            .map(|(alias, target)| (alias.as_str(), target.as_str()))
    }

    pub fn rates(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rates.iter().map(|(name, rate)| (name.as_str(), *rate))
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

pub(crate) fn normalize_category(value: &str) -> String {
    value.trim().to_lowercase()
}
