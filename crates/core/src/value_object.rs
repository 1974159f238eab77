//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. An order line is
/// one: two lines with the same product, quantity and captured price are the
/// same line, and "changing" a line means building a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
