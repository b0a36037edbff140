//! Regional forecast targets and forecast-vs-actual comparison.

use core::str::FromStr;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use salesdesk_core::{require_non_negative, DomainError, DomainResult, ForecastRowId, Region};

use crate::pivot::{PivotTable, RegionTotals};

/// Which forecast table a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ForecastKind {
    /// Weight targets in metric tonnes.
    Mt,
    /// Currency targets.
    Costing,
}

impl ForecastKind {
    pub const ALL: [ForecastKind; 2] = [ForecastKind::Mt, ForecastKind::Costing];

    pub fn code(self) -> &'static str {
        match self {
            ForecastKind::Mt => "MT",
            ForecastKind::Costing => "COSTING",
        }
    }
}

impl core::fmt::Display for ForecastKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ForecastKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MT" => Ok(ForecastKind::Mt),
            "COSTING" => Ok(ForecastKind::Costing),
            _ => Err(DomainError::invalid_id(format!("unknown forecast kind: {s:?}"))),
        }
    }
}

/// One item group's regional targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub id: ForecastRowId,
    pub kind: ForecastKind,
    pub item_group: String,
    pub central: Decimal,
    pub e_coast: Decimal,
    pub south: Decimal,
    pub north: Decimal,
}

impl ForecastRow {
    pub fn totals(&self) -> RegionTotals {
        RegionTotals {
            central: self.central,
            east_coast: self.e_coast,
            south: self.south,
            north: self.north,
        }
    }

    pub fn apply(&mut self, targets: RegionTargets) {
        self.central = targets.central;
        self.e_coast = targets.e_coast;
        self.south = targets.south;
        self.north = targets.north;
    }
}

/// New targets for one forecast row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionTargets {
    pub central: Decimal,
    pub e_coast: Decimal,
    pub south: Decimal,
    pub north: Decimal,
}

impl RegionTargets {
    pub fn validate(self) -> DomainResult<RegionTargets> {
        Ok(RegionTargets {
            central: require_non_negative("central", self.central)?,
            e_coast: require_non_negative("e_coast", self.e_coast)?,
            south: require_non_negative("south", self.south)?,
            north: require_non_negative("north", self.north)?,
        })
    }
}

/// A displayed forecast table line; the trailing total has no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastTableRow {
    pub id: Option<ForecastRowId>,
    pub item_group: String,
    pub central: Decimal,
    pub e_coast: Decimal,
    pub south: Decimal,
    pub north: Decimal,
}

pub const TOTAL_LABEL: &str = "Total";

/// Sort rows by id and append a `Total` row summing each region column.
pub fn with_total_row(mut rows: Vec<ForecastRow>) -> Vec<ForecastTableRow> {
    rows.sort_by_key(|row| row.id);

    let mut total = RegionTotals::default();
    let mut table: Vec<ForecastTableRow> = rows
        .into_iter()
        .map(|row| {
            for region in Region::ALL {
                total.saturating_add(region, row.totals().get(region));
            }
            ForecastTableRow {
                id: Some(row.id),
                item_group: row.item_group,
                central: row.central,
                e_coast: row.e_coast,
                south: row.south,
                north: row.north,
            }
        })
        .collect();

    table.push(ForecastTableRow {
        id: None,
        item_group: TOTAL_LABEL.to_string(),
        central: total.central,
        e_coast: total.east_coast,
        south: total.south,
        north: total.north,
    });
    table
}

/// Forecast, actual and `actual - forecast` for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variance {
    pub forecast: Decimal,
    pub actual: Decimal,
    pub variance: Decimal,
}

impl Variance {
    fn new(forecast: Decimal, actual: Decimal) -> Self {
        Self {
            forecast,
            actual,
            variance: actual - forecast,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceRow {
    pub item_group: String,
    pub central: Variance,
    pub e_coast: Variance,
    pub south: Variance,
    pub north: Variance,
}

impl VarianceRow {
    fn new(item_group: String, forecast: RegionTotals, actual: RegionTotals) -> Self {
        Self {
            item_group,
            central: Variance::new(forecast.central, actual.central),
            e_coast: Variance::new(forecast.east_coast, actual.east_coast),
            south: Variance::new(forecast.south, actual.south),
            north: Variance::new(forecast.north, actual.north),
        }
    }
}

/// Pair each forecast row with the actual sales of its item group.
///
/// Item groups match case-insensitively. Forecast rows come first in id
/// order; categories sold without a forecast row follow with a zero forecast.
pub fn compare(forecast: &[ForecastRow], actual: &PivotTable) -> Vec<VarianceRow> {
    let mut rows: Vec<&ForecastRow> = forecast.iter().collect();
    rows.sort_by_key(|row| row.id);

    let actual_for = |item_group: &str| -> RegionTotals {
        actual
            .iter()
            .filter(|(category, _)| category.as_str().eq_ignore_ascii_case(item_group.trim()))
            .fold(RegionTotals::default(), |mut acc, (_, totals)| {
                for region in Region::ALL {
                    acc.saturating_add(region, totals.get(region));
                }
                acc
            })
    };

    let mut report: Vec<VarianceRow> = rows
        .iter()
        .map(|row| VarianceRow::new(row.item_group.clone(), row.totals(), actual_for(&row.item_group)))
        .collect();

    let mut unplanned: Vec<String> = Vec::new();
    for (category, _) in actual.iter() {
        let planned = rows
            .iter()
            .any(|row| row.item_group.trim().eq_ignore_ascii_case(category.as_str()));
        let group = category.item_group();
        if !planned && !unplanned.contains(&group) {
            unplanned.push(group);
        }
    }
    for group in unplanned {
        let totals = actual_for(&group);
        report.push(VarianceRow::new(group, RegionTotals::default(), totals));
    }

    report
}
