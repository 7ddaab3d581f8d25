use serde::{Deserialize, Serialize};

/// Field-level rejection of a calculation request.
///
/// This is the only error `compute` can return. The offending value is kept
/// as rendered text so presentation layers can echo it back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("invalid {field} '{value}': {reason}")]
pub struct ValidationError {
    pub field: String,
    pub value: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(field, "", reason)
    }
}
