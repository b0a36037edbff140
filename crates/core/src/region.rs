//! Sales regions.
//!
//! Every admin belongs to exactly one region, and every transaction they
//! create inherits it for geographic reporting.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// Fixed set of sales regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Region {
    Central,
    EastCoast,
    South,
    North,
}

impl ValueObject for Region {}

impl Region {
    /// All known regions, in reporting column order.
    pub const ALL: [Region; 4] = [Region::Central, Region::EastCoast, Region::South, Region::North];

    /// Stored code (`CENTRAL`, `EAST_COAST`, ...).
    pub fn code(self) -> &'static str {
        match self {
            Region::Central => "CENTRAL",
            Region::EastCoast => "EAST_COAST",
            Region::South => "SOUTH",
            Region::North => "NORTH",
        }
    }

    /// Exact stored code only. Labels and other spellings are rejected; use
    /// `FromStr` for user input.
    pub fn from_code(code: &str) -> Option<Region> {
        Region::ALL.into_iter().find(|region| region.code() == code)
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Region::Central => "Central",
            Region::EastCoast => "East Coast",
            Region::South => "South",
            Region::North => "North",
        }
    }
}

impl core::fmt::Display for Region {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// Lenient parse for user input: a stored code or a display label, ignoring
/// case and surrounding whitespace, with `-` or ` ` standing in for `_`.
impl FromStr for Region {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "CENTRAL" => Ok(Region::Central),
            "EAST_COAST" => Ok(Region::EastCoast),
            "SOUTH" => Ok(Region::South),
            "NORTH" => Ok(Region::North),
            _ => Err(DomainError::invalid_id(format!("unknown region: {s:?}"))),
        }
    }
}
