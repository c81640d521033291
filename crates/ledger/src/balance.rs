use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use drillstore_core::AggregateRoot;

use crate::error::{LedgerError, LedgerResult};
use crate::material::{MaterialCatalogEntry, MaterialType};

/// Which cumulative counter a deduction feeds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Deduction {
    /// Consumed by field work (`quantity_used`).
    Usage,
    /// Sent back to the POS material shop (`quantity_returned`).
    Return,
}

impl Deduction {
    fn counter(self) -> &'static str {
        match self {
            Deduction::Usage => "quantity_used",
            Deduction::Return => "quantity_returned",
        }
    }
}

/// Running balance of one material type in the material store.
///
/// `quantity_remaining` is maintained incrementally
/// (received − used − returned) and never goes negative. `total_value` is
/// recomputed as `quantity_remaining × unit_cost` after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialStoreBalance {
    pub material_type: MaterialType,
    pub material_name: String,
    pub quantity_received: Decimal,
    pub quantity_used: Decimal,
    pub quantity_returned: Decimal,
    pub quantity_remaining: Decimal,
    pub unit_cost: Decimal,
    pub total_value: Decimal,
    pub last_updated: DateTime<Utc>,
    /// Compare-and-swap token, bumped on every mutation.
    pub version: u64,
}

impl MaterialStoreBalance {
    /// Empty balance for a material's first transfer-in (not yet persisted).
    ///
    /// The unit cost is taken from the catalog entry and stays fixed for the
    /// life of the balance row.
    pub fn open(entry: &MaterialCatalogEntry, now: DateTime<Utc>) -> Self {
        Self {
            material_type: entry.material_type.clone(),
            material_name: entry.material_name.clone(),
            quantity_received: Decimal::ZERO,
            quantity_used: Decimal::ZERO,
            quantity_returned: Decimal::ZERO,
            quantity_remaining: Decimal::ZERO,
            unit_cost: entry.unit_cost,
            total_value: Decimal::ZERO,
            last_updated: now,
            version: 0,
        }
    }

    /// Inbound movement: material arrives from the POS shop.
    pub fn receive(&mut self, quantity: Decimal, now: DateTime<Utc>) -> LedgerResult<()> {
        ensure_positive(quantity)?;

        let received = checked(self.quantity_received.checked_add(quantity), "quantity_received")?;
        let remaining = checked(self.quantity_remaining.checked_add(quantity), "quantity_remaining")?;
        let total_value = self.value_of(remaining)?;

        self.quantity_received = received;
        self.quantity_remaining = remaining;
        self.touch(total_value, now);
        Ok(())
    }

    /// Fails with `InsufficientStock` if `quantity` exceeds what remains.
    pub fn ensure_available(&self, quantity: Decimal) -> LedgerResult<()> {
        if quantity > self.quantity_remaining {
            return Err(LedgerError::InsufficientStock {
                material: self.material_type.clone(),
                available: self.quantity_remaining,
                requested: quantity,
            });
        }
        Ok(())
    }

    /// Outbound movement. Leaves the balance untouched on failure.
    pub fn deduct(&mut self, quantity: Decimal, kind: Deduction, now: DateTime<Utc>) -> LedgerResult<()> {
        ensure_positive(quantity)?;
        self.ensure_available(quantity)?;

        let remaining = checked(self.quantity_remaining.checked_sub(quantity), "quantity_remaining")?;
        let counter = match kind {
            Deduction::Usage => &self.quantity_used,
            Deduction::Return => &self.quantity_returned,
        };
        let counted = checked(counter.checked_add(quantity), kind.counter())?;
        let total_value = self.value_of(remaining)?;

        self.quantity_remaining = remaining;
        match kind {
            Deduction::Usage => self.quantity_used = counted,
            Deduction::Return => self.quantity_returned = counted,
        }
        self.touch(total_value, now);
        Ok(())
    }

    /// Monetary value of `quantity` units at this balance's unit cost.
    pub fn value_of(&self, quantity: Decimal) -> LedgerResult<Decimal> {
        checked(quantity.checked_mul(self.unit_cost), "value")
    }

    /// Remaining stock as a percentage of everything ever received.
    ///
    /// `None` when nothing has been received yet.
    pub fn remaining_percent(&self) -> Option<Decimal> {
        if self.quantity_received.is_zero() {
            return None;
        }
        Some(self.quantity_remaining / self.quantity_received * Decimal::ONE_HUNDRED)
    }

    fn touch(&mut self, total_value: Decimal, now: DateTime<Utc>) {
        self.total_value = total_value;
        self.last_updated = now;
        self.version += 1;
    }
}

impl AggregateRoot for MaterialStoreBalance {
    type Id = MaterialType;

    fn id(&self) -> &Self::Id {
        &self.material_type
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Fails with `InvalidQuantity` unless `quantity > 0`.
pub fn ensure_positive(quantity: Decimal) -> LedgerResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidQuantity(quantity));
    }
    Ok(())
}

fn checked(value: Option<Decimal>, field: &'static str) -> LedgerResult<Decimal> {
    value.ok_or(LedgerError::Overflow(field))
}
