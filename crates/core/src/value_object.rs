//! Value object trait: equality by value, not identity.
//!
//! Material types, quantities and money amounts are value objects: two
//! `gravel` material types are the same material regardless of where the
//! value came from.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct MaterialType(String);
///
/// impl ValueObject for MaterialType {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
