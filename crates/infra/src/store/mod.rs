//! Persistence for the catalog, parties, transactions and forecast targets.
//!
//! Every store is available in two flavours: [`InMemoryStore`] for tests and
//! local development, and [`PostgresStore`] for deployments.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use serde::Serialize;

use salesdesk_core::{AdminId, CustomerId, ForecastRowId, TransactionId};
use salesdesk_forecast::{ForecastKind, ForecastRow, RegionTargets};
use salesdesk_parties::{Admin, AdminDraft, Customer, CustomerDraft};
use salesdesk_products::{Product, ProductCode};
use salesdesk_sales::{
    Remark, Transaction, TransactionDraft, TransactionEdit, TransactionLine, TransactionStatus,
};

use crate::error::StoreResult;

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Fails with a conflict when the code is taken.
    async fn insert_product(&self, product: Product) -> StoreResult<Product>;
    async fn get_product(&self, code: &ProductCode) -> StoreResult<Product>;
    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    async fn search_products(&self, query: &str) -> StoreResult<Vec<Product>>;
    async fn update_product(&self, product: Product) -> StoreResult<Product>;
    async fn delete_product(&self, code: &ProductCode) -> StoreResult<()>;
}

#[async_trait]
pub trait PartyStore: Send + Sync {
    /// Fails with a conflict when the email is already registered.
    async fn insert_admin(&self, draft: AdminDraft) -> StoreResult<Admin>;
    async fn get_admin(&self, id: AdminId) -> StoreResult<Admin>;
    async fn list_admins(&self) -> StoreResult<Vec<Admin>>;
    async fn update_admin(&self, admin: Admin) -> StoreResult<Admin>;
    /// Fails with a conflict while customers or transactions reference the admin.
    async fn delete_admin(&self, id: AdminId) -> StoreResult<()>;

    /// Fails with a conflict when a present email is already used.
    async fn insert_customer(&self, draft: CustomerDraft) -> StoreResult<Customer>;
    async fn get_customer(&self, id: CustomerId) -> StoreResult<Customer>;
    /// `owner` restricts the list to one responsible admin.
    async fn list_customers(&self, owner: Option<AdminId>) -> StoreResult<Vec<Customer>>;
    async fn replace_customer(&self, id: CustomerId, draft: CustomerDraft) -> StoreResult<Customer>;
    async fn delete_customer(&self, id: CustomerId) -> StoreResult<()>;

    async fn search_parties(&self, query: &str) -> StoreResult<PartySearch>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Check stock, then store the header, lines and remark and withdraw
    /// stock, all or nothing.
    async fn create_transaction(&self, draft: TransactionDraft) -> StoreResult<Transaction>;
    async fn get_transaction(&self, id: TransactionId) -> StoreResult<Transaction>;
    async fn transaction_detail(&self, id: TransactionId) -> StoreResult<TransactionDetail>;
    /// Replace header and lines; the status change is checked against the
    /// stored status inside the same write.
    async fn edit_transaction(
        &self,
        id: TransactionId,
        edit: TransactionEdit,
    ) -> StoreResult<EditOutcome>;
    /// Removes lines and remarks too.
    async fn delete_transaction(&self, id: TransactionId) -> StoreResult<()>;
    /// Newest transaction date first.
    async fn list_transactions(&self, owner: Option<AdminId>)
    -> StoreResult<Vec<TransactionSummary>>;
    async fn search_transactions(
        &self,
        admin_id: AdminId,
        query: &str,
    ) -> StoreResult<Vec<TransactionSummary>>;
}

#[async_trait]
pub trait ForecastStore: Send + Sync {
    /// Rows of one forecast table, in id order.
    async fn list_forecast(&self, kind: ForecastKind) -> StoreResult<Vec<ForecastRow>>;
    async fn update_forecast(
        &self,
        kind: ForecastKind,
        id: ForecastRowId,
        targets: RegionTargets,
    ) -> StoreResult<ForecastRow>;
}

/// Transaction list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSummary {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub admin_name: String,
    pub customer_name: String,
    pub lines: Vec<TransactionLine>,
    pub latest_remark: Option<Remark>,
}

/// A line with the current product name, if the product still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailLine {
    #[serde(flatten)]
    pub line: TransactionLine,
    pub product_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub admin: Admin,
    pub customer: Customer,
    pub lines: Vec<DetailLine>,
    /// Newest first.
    pub remarks: Vec<Remark>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub transaction: Transaction,
    pub previous_status: TransactionStatus,
}

impl EditOutcome {
    pub fn status_changed(&self) -> bool {
        self.previous_status != self.transaction.status
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartySearch {
    pub admins: Vec<Admin>,
    pub customers: Vec<Customer>,
}
