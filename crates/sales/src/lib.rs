//! Sales transactions domain module.
//!
//! This crate contains business rules for sales transactions (header, line
//! items, status lifecycle, remarks and the stock availability check),
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage).

pub mod stock;
pub mod transaction;

pub use stock::{check_availability, Shortfall, StockError};
pub use transaction::{
    sort_remarks, LineInput, NewTransaction, Remark, Transaction, TransactionDraft,
    TransactionEdit, TransactionHeader, TransactionLine, TransactionStatus, ValidatedEdit,
};
