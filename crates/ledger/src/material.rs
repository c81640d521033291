use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use drillstore_core::{CatalogItemId, DomainError, Entity, ValueObject};

/// Material type key (e.g. `gravel`, `screen_pipe`).
///
/// Unique key of the materials catalog and of material store balances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MaterialType(String);

impl MaterialType {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("material_type cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// For the crate's own non-empty constant keys.
    pub(crate) fn from_static(value: &'static str) -> Self {
        Self(value.to_string())
    }
}

impl ValueObject for MaterialType {}

impl core::fmt::Display for MaterialType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MaterialType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for MaterialType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MaterialType> for String {
    fn from(value: MaterialType) -> Self {
        value.0
    }
}

/// Reference data from the materials catalog. Read-only for the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialCatalogEntry {
    pub material_type: MaterialType,
    pub material_name: String,
    pub unit_cost: Decimal,
}

impl Entity for MaterialCatalogEntry {
    type Id = MaterialType;

    fn id(&self) -> &Self::Id {
        &self.material_type
    }
}

/// Maps a material type to its POS catalog item.
///
/// Optional: a material without a mapping has no POS-side stock to adjust.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosCatalogMapping {
    pub material_type: MaterialType,
    pub catalog_item_id: CatalogItemId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_type_is_trimmed() {
        let mt = MaterialType::new("  gravel ").unwrap();
        assert_eq!(mt.as_str(), "gravel");
    }

    #[test]
    fn empty_material_type_is_rejected() {
        assert!(MaterialType::new("   ").is_err());
        assert!(serde_json::from_str::<MaterialType>("\"\"").is_err());
    }
}
