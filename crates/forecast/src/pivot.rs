//! Category × region pivot tables.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use salesdesk_core::Region;
use salesdesk_products::Category;

/// One value per region. Every field is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionTotals {
    pub central: Decimal,
    pub east_coast: Decimal,
    pub south: Decimal,
    pub north: Decimal,
}

impl RegionTotals {
    pub fn get(&self, region: Region) -> Decimal {
        match region {
            Region::Central => self.central,
            Region::EastCoast => self.east_coast,
            Region::South => self.south,
            Region::North => self.north,
        }
    }

    pub fn get_mut(&mut self, region: Region) -> &mut Decimal {
        match region {
            Region::Central => &mut self.central,
            Region::EastCoast => &mut self.east_coast,
            Region::South => &mut self.south,
            Region::North => &mut self.north,
        }
    }

    /// `None` if the total would overflow; the total is then left unchanged.
    pub fn checked_add(&mut self, region: Region, amount: Decimal) -> Option<()> {
        let total = self.get_mut(region);
        *total = total.checked_add(amount)?;
        Some(())
    }

    /// Clamps at the representable bounds instead of overflowing.
    pub fn saturating_add(&mut self, region: Region, amount: Decimal) {
        let total = self.get_mut(region);
        *total = total.saturating_add(amount);
    }
}

/// Category → per-region totals.
///
/// A category row, once present, always carries all four regions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PivotTable {
    rows: BTreeMap<Category, RegionTotals>,
}

impl PivotTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-filled row for `category`, created on first use.
    pub fn row_mut(&mut self, category: &Category) -> &mut RegionTotals {
        self.rows.entry(category.clone()).or_default()
    }

    /// Ensure a zero-filled row exists without adding anything to it.
    pub fn seed(&mut self, category: &Category) {
        self.row_mut(category);
    }

    pub fn get(&self, category: &Category) -> Option<&RegionTotals> {
        self.rows.get(category)
    }

    /// Value at `[category][region]`; zero when the category is absent.
    pub fn value(&self, category: &Category, region: Region) -> Decimal {
        self.get(category)
            .map(|totals| totals.get(region))
            .unwrap_or(Decimal::ZERO)
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.rows.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Category, &RegionTotals)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Display rows with upper-cased item groups, in category order.
    pub fn to_rows(&self) -> Vec<PivotRow> {
        self.rows
            .iter()
            .map(|(category, totals)| PivotRow::new(category.item_group(), *totals))
            .collect()
    }
}

/// A pivot row as shown next to the forecast tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotRow {
    pub item_group: String,
    pub central: Decimal,
    pub e_coast: Decimal,
    pub south: Decimal,
    pub north: Decimal,
}

impl PivotRow {
    pub fn new(item_group: impl Into<String>, totals: RegionTotals) -> Self {
        Self {
            item_group: item_group.into(),
            central: totals.central,
            e_coast: totals.east_coast,
            south: totals.south,
            north: totals.north,
        }
    }

    pub fn totals(&self) -> RegionTotals {
        RegionTotals {
            central: self.central,
            east_coast: self.e_coast,
            south: self.south,
            north: self.north,
        }
    }
}

/// Both aggregates produced from one set of approved transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    /// Sum of `quantity × unit_price`.
    pub costing: PivotTable,
    /// Sum of `quantity`, weight-tracked lines only.
    pub weight: PivotTable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gold() -> Category {
        Category::parse("Gold").unwrap()
    }

    #[test]
    fn first_touch_zero_fills_every_region() {
        let mut pivot = PivotTable::new();
        pivot.row_mut(&gold()).checked_add(Region::South, dec!(600)).unwrap();
        let row = pivot.get(&gold()).unwrap();
        assert_eq!(row.south, dec!(600));
        for region in [Region::Central, Region::EastCoast, Region::North] {
            assert_eq!(row.get(region), Decimal::ZERO);
        }
    }

    #[test]
    fn missing_category_reads_as_zero() {
        let pivot = PivotTable::new();
        assert_eq!(pivot.value(&gold(), Region::North), Decimal::ZERO);
        assert!(pivot.is_empty());
    }

    #[test]
    fn rows_use_upper_cased_item_groups() {
        let mut pivot = PivotTable::new();
        pivot.seed(&Category::parse("Organic").unwrap());
        pivot.row_mut(&gold()).checked_add(Region::Central, dec!(1.5)).unwrap();

        let rows = pivot.to_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].item_group, "GOLD");
        assert_eq!(rows[0].central, dec!(1.5));
        assert_eq!(rows[1].item_group, "ORGANIC");
        assert_eq!(rows[1].totals(), RegionTotals::default());
    }

    #[test]
    fn categories_differing_only_in_case_share_a_row() {
        let mut pivot = PivotTable::new();
        pivot.row_mut(&gold()).checked_add(Region::South, dec!(3)).unwrap();
        pivot
            .row_mut(&Category::parse("gold").unwrap())
            .checked_add(Region::South, dec!(4))
            .unwrap();

        let rows = pivot.to_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].item_group, "GOLD");
        assert_eq!(rows[0].south, dec!(7));
    }

    #[test]
    fn checked_add_leaves_total_unchanged_on_overflow() {
        let mut totals = RegionTotals::default();
        totals.checked_add(Region::North, Decimal::MAX).unwrap();
        assert_eq!(totals.checked_add(Region::North, dec!(1)), None);
        assert_eq!(totals.north, Decimal::MAX);

        totals.saturating_add(Region::North, dec!(1));
        assert_eq!(totals.north, Decimal::MAX);
    }

    #[test]
    fn serializes_as_category_keyed_map() {
        let mut pivot = PivotTable::new();
        pivot.row_mut(&gold()).checked_add(Region::North, dec!(2)).unwrap();
        let json = serde_json::to_value(&pivot).unwrap();
        assert_eq!(json["Gold"]["north"], serde_json::json!("2"));
        assert_eq!(json["Gold"]["central"], serde_json::json!("0"));
    }
}
