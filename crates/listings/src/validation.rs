use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crosslist_core::Marketplace;

/// One violated marketplace constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// A product does not satisfy a marketplace's listing constraints.
///
/// Carries every violation found, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{marketplace} listing invalid: {}", join(.violations))]
pub struct ValidationError {
    pub marketplace: Marketplace,
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn single(marketplace: Marketplace, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            marketplace,
            violations: vec![FieldViolation {
                field: field.into(),
                reason: reason.into(),
            }],
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn join(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Accumulates violations while a mapper checks a product.
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldViolation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.push(FieldViolation {
            field: field.into(),
            reason: reason.into(),
        });
    }

    /// Record a violation unless `holds`.
    pub fn require(&mut self, holds: bool, field: &str, reason: impl Into<String>) {
        if !holds {
            self.push(field, reason);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn finish<T>(self, marketplace: Marketplace, value: T) -> Result<T, ValidationError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError {
                marketplace,
                violations: self.0,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_violation() {
        let mut v = Violations::new();
        v.require(false, "title", "must not be blank");
        v.require(true, "price", "must be positive");
        v.require(false, "images", "at least one image required");

        let err = v.finish(Marketplace::Ebay, ()).unwrap_err();
        assert_eq!(err.violations.len(), 2);
        assert!(err.has_field("title"));
        assert!(err.has_field("images"));
        assert!(!err.has_field("price"));
        assert_eq!(
            err.to_string(),
            "ebay listing invalid: title: must not be blank; images: at least one image required"
        );
    }

    #[test]
    fn empty_collector_yields_the_value() {
        assert_eq!(Violations::new().finish(Marketplace::Etsy, 7), Ok(7));
    }
}
