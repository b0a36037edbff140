//! Aggregation failures.

use rust_decimal::Decimal;
use thiserror::Error;

use salesdesk_core::TransactionId;

/// The input data cannot be aggregated as-is.
///
/// Raised for the whole report: a summary is either complete or absent.
/// Retrying cannot help, the stored data itself has to be fixed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataIntegrityError {
    #[error("transaction {transaction_id}: product {product_code} could not be resolved")]
    UnresolvedProduct {
        transaction_id: TransactionId,
        product_code: String,
    },

    #[error("transaction {transaction_id}: product {product_code} has negative quantity {quantity}")]
    NegativeQuantity {
        transaction_id: TransactionId,
        product_code: String,
        quantity: Decimal,
    },

    #[error(
        "transaction {transaction_id}: product {product_code} has negative unit price {unit_price}"
    )]
    NegativeUnitPrice {
        transaction_id: TransactionId,
        product_code: String,
        unit_price: Decimal,
    },

    #[error("transaction {transaction_id}: unknown region {region_code:?}")]
    UnknownRegion {
        transaction_id: TransactionId,
        region_code: String,
    },

    #[error("transaction {transaction_id}: product {product_code} has no category")]
    BlankCategory {
        transaction_id: TransactionId,
        product_code: String,
    },

    #[error("transaction {transaction_id}: amount for product {product_code} is out of range")]
    Overflow {
        transaction_id: TransactionId,
        product_code: String,
    },
}

impl DataIntegrityError {
    pub fn transaction_id(&self) -> TransactionId {
        match self {
            DataIntegrityError::UnresolvedProduct { transaction_id, .. }
            | DataIntegrityError::NegativeQuantity { transaction_id, .. }
            | DataIntegrityError::NegativeUnitPrice { transaction_id, .. }
            | DataIntegrityError::UnknownRegion { transaction_id, .. }
            | DataIntegrityError::BlankCategory { transaction_id, .. }
            | DataIntegrityError::Overflow { transaction_id, .. } => *transaction_id,
        }
    }
}
