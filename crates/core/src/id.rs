//! Strongly-typed identifiers used across the domain.
//!
//! Records are keyed by database-assigned integers; products are keyed by
//! their catalog code instead (see `salesdesk-products`).

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of an admin (salesperson, manager or master admin).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminId(i64);

/// Identifier of a customer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(i64);

/// Identifier of a sales transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

/// Identifier of a regional forecast row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastRowId(i64);

macro_rules! impl_int_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                if value <= 0 {
                    return Err(DomainError::invalid_id(format!(
                        "{}: must be positive",
                        $name
                    )));
                }
                Ok(Self(value))
            }
        }
    };
}

impl_int_newtype!(AdminId, "AdminId");
impl_int_newtype!(CustomerId, "CustomerId");
impl_int_newtype!(TransactionId, "TransactionId");
impl_int_newtype!(ForecastRowId, "ForecastRowId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_integers() {
        let id: TransactionId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn rejects_non_numeric_and_non_positive() {
        assert!(matches!("abc".parse::<AdminId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("0".parse::<CustomerId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("-3".parse::<ForecastRowId>(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&CustomerId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
