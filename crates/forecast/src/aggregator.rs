//! Approved transactions → costing and weight pivots.
//!
//! The caller supplies transactions already joined with the responsible
//! admin's region code and each line's product facts; the aggregator runs no
//! queries and never mutates its input.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use salesdesk_core::{Region, TransactionId};
use salesdesk_products::{Category, UnitOfMeasure};

use crate::error::DataIntegrityError;
use crate::pivot::{PivotTable, SalesSummary};

/// Catalog facts the aggregator needs about a line's product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFacts {
    pub category: String,
    pub base_uom: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedLine {
    pub product_code: String,
    /// `None` when the product code no longer resolves in the catalog.
    pub product: Option<ProductFacts>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedTransaction {
    pub transaction_id: TransactionId,
    /// Raw region code of the responsible admin, validated here.
    pub region_code: String,
    pub lines: Vec<ApprovedLine>,
}

/// What to do with a line whose product cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingProductPolicy {
    /// Abort the whole aggregation.
    #[default]
    Fail,
    /// Leave the line out and log it.
    Skip,
}

impl FromStr for MissingProductPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(MissingProductPolicy::Fail),
            "skip" => Ok(MissingProductPolicy::Skip),
            other => Err(format!("unknown missing product policy: {other:?}")),
        }
    }
}

/// Builds a [`SalesSummary`] from approved transactions.
#[derive(Debug, Clone, Default)]
pub struct SalesForecastAggregator {
    missing_product: MissingProductPolicy,
    seeded: Vec<Category>,
}

impl SalesForecastAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing_product_policy(mut self, policy: MissingProductPolicy) -> Self {
        self.missing_product = policy;
        self
    }

    /// Categories that always appear in the output, zero-filled if unsold.
    pub fn with_seeded_categories<I>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = Category>,
    {
        self.seeded = categories.into_iter().collect();
        self
    }

    /// Aggregate in one pass. Either every line is accounted for or an error
    /// is returned; no partial summary escapes.
    pub fn aggregate(
        &self,
        transactions: &[ApprovedTransaction],
    ) -> Result<SalesSummary, DataIntegrityError> {
        let mut costing = PivotTable::new();
        let mut weight = PivotTable::new();
        for category in &self.seeded {
            costing.seed(category);
            weight.seed(category);
        }

        let mut skipped = 0usize;
        for tx in transactions {
            let region = Region::from_code(&tx.region_code).ok_or_else(|| {
                DataIntegrityError::UnknownRegion {
                    transaction_id: tx.transaction_id,
                    region_code: tx.region_code.clone(),
                }
            })?;

            for line in &tx.lines {
                let Some(product) = &line.product else {
                    match self.missing_product {
                        MissingProductPolicy::Fail => {
                            return Err(DataIntegrityError::UnresolvedProduct {
                                transaction_id: tx.transaction_id,
                                product_code: line.product_code.clone(),
                            });
                        }
                        MissingProductPolicy::Skip => {
                            tracing::warn!(
                                transaction_id = %tx.transaction_id,
                                product_code = %line.product_code,
                                "skipping line with unresolved product"
                            );
                            skipped += 1;
                            continue;
                        }
                    }
                };

                let (category, quantity, unit_price) = check_line(tx.transaction_id, line, product)?;
                let overflow = || DataIntegrityError::Overflow {
                    transaction_id: tx.transaction_id,
                    product_code: line.product_code.clone(),
                };

                let amount = quantity.checked_mul(unit_price).ok_or_else(overflow)?;
                costing
                    .row_mut(&category)
                    .checked_add(region, amount)
                    .ok_or_else(overflow)?;
                let weight_row = weight.row_mut(&category);
                if is_weight(&product.base_uom) {
                    weight_row.checked_add(region, quantity).ok_or_else(overflow)?;
                }
            }
        }

        tracing::debug!(
            transactions = transactions.len(),
            categories = costing.len(),
            skipped,
            "aggregated approved sales"
        );

        Ok(SalesSummary { costing, weight })
    }
}

fn is_weight(base_uom: &str) -> bool {
    UnitOfMeasure::parse(base_uom).is_ok_and(|unit| unit.is_weight())
}

fn check_line(
    transaction_id: TransactionId,
    line: &ApprovedLine,
    product: &ProductFacts,
) -> Result<(Category, Decimal, Decimal), DataIntegrityError> {
    if line.quantity < Decimal::ZERO {
        return Err(DataIntegrityError::NegativeQuantity {
            transaction_id,
            product_code: line.product_code.clone(),
            quantity: line.quantity,
        });
    }
    if line.unit_price < Decimal::ZERO {
        return Err(DataIntegrityError::NegativeUnitPrice {
            transaction_id,
            product_code: line.product_code.clone(),
            unit_price: line.unit_price,
        });
    }
    let category = Category::parse(product.category.as_str()).map_err(|_| {
        DataIntegrityError::BlankCategory {
            transaction_id,
            product_code: line.product_code.clone(),
        }
    })?;
    Ok((category, line.quantity, line.unit_price))
}
