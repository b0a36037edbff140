//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**; they are defined entirely by their
//! attribute values. `Region`, product categories and units of measure are
//! value objects, while products, admins and transactions are entities.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by value. To "modify" one,
/// construct a new value.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Category(String);
///
/// impl ValueObject for Category {}
///
/// assert_eq!(Category("Gold".into()), Category("Gold".into()));
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
