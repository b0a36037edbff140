//! `salesdesk-core` - domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no storage, no HTTP).

pub mod entity;
pub mod error;
pub mod id;
pub mod region;
pub mod value_object;

pub use entity::Entity;
pub use error::{require_non_blank, require_non_negative, DomainError, DomainResult};
pub use id::{AdminId, CustomerId, ForecastRowId, TransactionId};
pub use region::Region;
pub use value_object::ValueObject;
