//! Source of approved sales for the forecast dashboard.

use async_trait::async_trait;

use salesdesk_forecast::ApprovedTransaction;

use crate::error::StoreResult;

/// Supplies `APPROVED` transactions already joined with the responsible
/// admin's region code and each line's product category and base unit.
///
/// A line whose product code no longer resolves carries `product: None`;
/// deciding what that means is left to the aggregator.
#[async_trait]
pub trait SalesFeed: Send + Sync {
    async fn approved_transactions(&self) -> StoreResult<Vec<ApprovedTransaction>>;
}
