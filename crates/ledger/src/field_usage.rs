//! Field-work consumption: the fixed material alias table and usage results.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::material::MaterialType;

/// The three material categories a field report can consume.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldMaterial {
    ScreenPipe,
    PlainPipe,
    Gravel,
}

impl FieldMaterial {
    /// Processing order for a field report.
    pub const ALL: [FieldMaterial; 3] = [
        FieldMaterial::ScreenPipe,
        FieldMaterial::PlainPipe,
        FieldMaterial::Gravel,
    ];

    /// Material store key.
    pub fn key(&self) -> &'static str {
        match self {
            FieldMaterial::ScreenPipe => "screen_pipe",
            FieldMaterial::PlainPipe => "plain_pipe",
            FieldMaterial::Gravel => "gravel",
        }
    }

    /// Field report input name (`screen_pipes_used`, ...).
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldMaterial::ScreenPipe => "screen_pipes_used",
            FieldMaterial::PlainPipe => "plain_pipes_used",
            FieldMaterial::Gravel => "gravel_used",
        }
    }

    /// Alternate input name derived from the material key (`screen_pipe_used`, ...).
    pub fn alias(&self) -> String {
        format!("{}_used", self.key())
    }

    pub fn material_type(&self) -> MaterialType {
        MaterialType::from_static(self.key())
    }
}

/// Quantities consumed by a field report, keyed by input field name.
///
/// Accepts either naming convention per category; the report field name
/// wins when both are present. Missing categories count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialsUsed(BTreeMap<String, Decimal>);

impl MaterialsUsed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, quantity: Decimal) -> Self {
        self.0.insert(field.into(), quantity);
        self
    }

    pub fn quantity_for(&self, material: FieldMaterial) -> Decimal {
        self.0
            .get(material.field_name())
            .or_else(|| self.0.get(&material.alias()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

impl FromIterator<(String, Decimal)> for MaterialsUsed {
    fn from_iter<T: IntoIterator<Item = (String, Decimal)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-material breakdown of one field-usage call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUsageLine {
    pub used: Decimal,
    pub remaining: Decimal,
    pub value: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUsageOutcome {
    pub materials: BTreeMap<FieldMaterial, FieldUsageLine>,
    pub total_value: Decimal,
}

impl FieldUsageOutcome {
    /// Adds one material's line; fails without recording if the running
    /// total would overflow.
    pub fn record(&mut self, material: FieldMaterial, line: FieldUsageLine) -> LedgerResult<()> {
        self.total_value = self
            .total_value
            .checked_add(line.value)
            .ok_or(LedgerError::Overflow("materials_value_used"))?;
        self.materials.insert(material, line);
        Ok(())
    }

    /// Values written back onto the field report.
    ///
    /// Categories that were not consumed are written as `None` (NULL).
    pub fn report_snapshot(&self) -> FieldReportMaterials {
        let remaining = |m: FieldMaterial| self.materials.get(&m).map(|l| l.remaining);
        FieldReportMaterials {
            screen_pipes_remaining: remaining(FieldMaterial::ScreenPipe),
            plain_pipes_remaining: remaining(FieldMaterial::PlainPipe),
            gravel_remaining: remaining(FieldMaterial::Gravel),
            materials_value_used: self.total_value,
        }
    }
}

/// Field report columns owned by the ledger's field-usage operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReportMaterials {
    pub screen_pipes_remaining: Option<Decimal>,
    pub plain_pipes_remaining: Option<Decimal>,
    pub gravel_remaining: Option<Decimal>,
    pub materials_value_used: Decimal,
}
