//! Regional sales forecasting.
//!
//! [`SalesForecastAggregator`] turns approved transactions into two
//! category × region pivots (currency value and weight). The rest of the crate
//! holds the forecast target tables those pivots are compared against.

pub mod aggregator;
pub mod error;
pub mod pivot;
pub mod target;

pub use aggregator::{
    ApprovedLine, ApprovedTransaction, MissingProductPolicy, ProductFacts, SalesForecastAggregator,
};
pub use error::DataIntegrityError;
pub use pivot::{PivotRow, PivotTable, RegionTotals, SalesSummary};
pub use target::{
    compare, with_total_row, ForecastKind, ForecastRow, ForecastTableRow, RegionTargets, Variance,
    VarianceRow, TOTAL_LABEL,
};
