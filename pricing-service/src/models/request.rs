//! Resolution input and its validation.

use crate::services::PricingError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub(crate) const ZONE_NAME_MAX_LEN: usize = 120;
pub(crate) const PACKAGE_TYPE_MAX_LEN: usize = 64;

/// Caller-supplied resolution input. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PricingRequest {
    pub client_id: Option<Uuid>,
    pub governorate_id: Option<Uuid>,
    pub city_id: Option<Uuid>,
    pub zone_name: Option<String>,
    pub package_type: Option<String>,
}

impl PricingRequest {
    /// Reject malformed requests and return the normalised form used for resolution.
    pub fn validate(self, catalog: &PackageCatalog) -> Result<Self, PricingError> {
        let zone_name = normalize_label(self.zone_name, "zone_name", ZONE_NAME_MAX_LEN)?;
        let package_type =
            normalize_label(self.package_type, "package_type", PACKAGE_TYPE_MAX_LEN)?
                .map(|value| catalog.canonical(&value))
                .transpose()?;

        Ok(Self {
            zone_name,
            package_type,
            ..self
        })
    }
}

/// The set of package types the service knows about.
///
/// An empty catalog accepts any non-blank package type.
#[derive(Debug, Clone, Default)]
pub struct PackageCatalog {
    types: Vec<String>,
}

impl PackageCatalog {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types = types
            .into_iter()
            .map(Into::into)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Self { types }
    }

    /// Accept any package type.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.types.is_empty()
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Map a package type to its catalog spelling, or reject it as unknown.
    pub fn canonical(&self, value: &str) -> Result<String, PricingError> {
        if self.is_open() {
            return Ok(value.to_string());
        }
        self.types
            .iter()
            .find(|known| known.to_lowercase() == value.to_lowercase())
            .cloned()
            .ok_or_else(|| PricingError::Validation(format!("unknown package type '{}'", value)))
    }
}

/// Trim a free-form label; blank becomes absent. Overlong values are rejected.
pub(crate) fn normalize_label(
    value: Option<String>,
    field: &str,
    max_len: usize,
) -> Result<Option<String>, PricingError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max_len {
        return Err(PricingError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_package_type_rejected() {
        let catalog = PackageCatalog::new(["Standard", "Bulky"]);
        let request = PricingRequest {
            package_type: Some("Oversized".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            request.validate(&catalog),
            Err(PricingError::Validation(_))
        ));
    }

    #[test]
    fn test_package_type_canonicalised_to_catalog_spelling() {
        let catalog = PackageCatalog::new(["Standard", "Bulky"]);
        let request = PricingRequest {
            package_type: Some("  bulky ".to_string()),
            ..Default::default()
        };
        let validated = request.validate(&catalog).unwrap();
        assert_eq!(validated.package_type.as_deref(), Some("Bulky"));
    }

    #[test]
    fn test_open_catalog_accepts_any_type() {
        let request = PricingRequest {
            package_type: Some("Piano".to_string()),
            ..Default::default()
        };
        let validated = request.validate(&PackageCatalog::open()).unwrap();
        assert_eq!(validated.package_type.as_deref(), Some("Piano"));
    }

    #[test]
    fn test_blank_zone_name_treated_as_absent() {
        let request = PricingRequest {
            zone_name: Some("   ".to_string()),
            ..Default::default()
        };
        let validated = request.validate(&PackageCatalog::open()).unwrap();
        assert_eq!(validated.zone_name, None);
    }

    #[test]
    fn test_overlong_zone_name_rejected() {
        let request = PricingRequest {
            zone_name: Some("x".repeat(ZONE_NAME_MAX_LEN + 1)),
            ..Default::default()
        };
        assert!(request.validate(&PackageCatalog::open()).is_err());
    }
}
