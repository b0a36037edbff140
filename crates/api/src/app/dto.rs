use serde::{Deserialize, Serialize};

use salesdesk_core::AdminId;
use salesdesk_forecast::{PivotRow, SalesSummary};

// -------------------------
// Query parameters
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ViewerQuery {
    pub viewer_id: Option<AdminId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionSearchQuery {
    #[serde(default)]
    pub q: String,
    pub admin_id: AdminId,
}

// -------------------------
// Response shapes
// -------------------------

/// One value per forecast table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ByKind<T> {
    pub mt: T,
    pub costing: T,
}

/// `mt` carries sold weight, `costing` carries sales value.
pub fn current_sales_response(summary: &SalesSummary) -> ByKind<Vec<PivotRow>> {
    ByKind {
        mt: summary.weight.to_rows(),
        costing: summary.costing.to_rows(),
    }
}

pub fn items<T: Serialize>(items: Vec<T>) -> serde_json::Value {
    serde_json::json!({ "items": items })
}
