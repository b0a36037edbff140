use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use salesdesk_core::{
    require_non_blank, require_non_negative, DomainError, DomainResult, Entity, ValueObject,
};

/// Product code: the catalog's natural key (e.g. `GLD-001`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(String);

impl ProductCode {
    pub fn parse(code: impl Into<String>) -> DomainResult<Self> {
        let code = code.into();
        require_non_blank("code", &code)?;
        Ok(Self(code.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ProductCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Product category (item group), e.g. "Gold" or "Organic".
///
/// Categories are free-form in the catalog; `Category::KNOWN` lists the
/// groups the business reports on. Two categories are equal when their item
/// groups are, so `Gold` and `gold` land in the same report row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl ValueObject for Category {}

impl Category {
    pub const KNOWN: [&'static str; 4] = ["Product", "Gold", "Organic", "Straight"];

    pub fn parse(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        require_non_blank("category", &name)?;
        Ok(Self(name.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Report label: the category name upper-cased (`Gold` -> `GOLD`).
    pub fn item_group(&self) -> String {
        self.0.to_uppercase()
    }

    fn group_chars(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars().flat_map(char::to_uppercase)
    }
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        self.group_chars().eq(other.group_chars())
    }
}

impl Eq for Category {}

impl PartialOrd for Category {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Category {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.group_chars().cmp(other.group_chars())
    }
}

impl core::hash::Hash for Category {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        for c in self.group_chars() {
            c.hash(state);
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Base unit of measure of a product (`MT`, `BAG`, `UNIT`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitOfMeasure(String);

impl ValueObject for UnitOfMeasure {}

impl UnitOfMeasure {
    /// Marker for weight-tracked goods (metric tonnes).
    pub const WEIGHT: &'static str = "MT";

    pub fn parse(unit: impl Into<String>) -> DomainResult<Self> {
        let unit = unit.into();
        require_non_blank("base_uom", &unit)?;
        Ok(Self(unit.trim().to_string()))
    }

    pub fn weight() -> Self {
        Self(Self::WEIGHT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether quantities in this unit count toward weight totals.
    pub fn is_weight(&self) -> bool {
        self.0 == Self::WEIGHT
    }
}

impl core::fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub code: ProductCode,
    pub name: String,
    pub category: Category,
    pub base_uom: UnitOfMeasure,
    /// Balance quantity on hand, in `base_uom`.
    pub stock: Decimal,
    /// Current list price; sales lines keep their own price snapshot.
    pub unit_price: Decimal,
}

impl Entity for Product {
    type Id = ProductCode;

    fn id(&self) -> &Self::Id {
        &self.code
    }
}

impl Product {
    /// Case-insensitive substring match on name or code.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self.code.as_str().to_lowercase().contains(&needle)
    }

    /// Apply a validated patch, keeping current values for absent fields.
    pub fn apply_patch(&self, patch: ProductPatch) -> DomainResult<Product> {
        let name = match patch.name {
            Some(name) => {
                require_non_blank("name", &name)?;
                name.trim().to_string()
            }
            None => self.name.clone(),
        };
        let category = match patch.category {
            Some(c) => Category::parse(c)?,
            None => self.category.clone(),
        };
        let base_uom = match patch.base_uom {
            Some(u) => UnitOfMeasure::parse(u)?,
            None => self.base_uom.clone(),
        };
        let stock = match patch.stock {
            Some(s) => require_non_negative("stock", s)?,
            None => self.stock,
        };
        let unit_price = match patch.unit_price {
            Some(p) => require_non_negative("unit_price", p)?,
            None => self.unit_price,
        };

        Ok(Product {
            code: self.code.clone(),
            name,
            category,
            base_uom,
            stock,
            unit_price,
        })
    }

    /// Remove `quantity` from stock.
    ///
    /// Callers check availability first; this only guards against a negative
    /// balance slipping through.
    pub fn withdraw(&mut self, quantity: Decimal) -> DomainResult<()> {
        if quantity > self.stock {
            return Err(DomainError::invariant(format!(
                "stock for {} would go negative (available: {}, requested: {})",
                self.code, self.stock, quantity
            )));
        }
        self.stock -= quantity;
        Ok(())
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub category: String,
    pub base_uom: String,
    pub stock: Decimal,
    pub unit_price: Option<Decimal>,
}

impl NewProduct {
    pub fn validate(self) -> DomainResult<Product> {
        let code = ProductCode::parse(self.code)?;
        require_non_blank("name", &self.name)?;
        let category = Category::parse(self.category)?;
        let base_uom = UnitOfMeasure::parse(self.base_uom)?;
        let stock = require_non_negative("stock", self.stock)?;
        let unit_price = require_non_negative("unit_price", self.unit_price.unwrap_or(Decimal::ZERO))?;

        Ok(Product {
            code,
            name: self.name.trim().to_string(),
            category,
            base_uom,
            stock,
            unit_price,
        })
    }
}

/// Partial update for a product; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub base_uom: Option<String>,
    pub stock: Option<Decimal>,
    pub unit_price: Option<Decimal>,
}
