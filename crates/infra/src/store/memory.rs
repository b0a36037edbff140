use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::RwLock;

use salesdesk_core::{AdminId, CustomerId, DomainError, Entity, ForecastRowId, TransactionId};
use salesdesk_forecast::{
    ApprovedLine, ApprovedTransaction, ForecastKind, ForecastRow, ProductFacts, RegionTargets,
};
use salesdesk_parties::{Admin, AdminDraft, Customer, CustomerDraft};
use salesdesk_products::{Category, Product, ProductCode};
use salesdesk_sales::{
    check_availability, Remark, Transaction, TransactionDraft, TransactionEdit, TransactionLine,
    TransactionStatus,
};

use super::{
    DetailLine, EditOutcome, ForecastStore, PartySearch, PartyStore, ProductStore,
    TransactionDetail, TransactionStore, TransactionSummary,
};
use crate::error::{StoreError, StoreResult};
use crate::feed::SalesFeed;

#[derive(Debug, Clone)]
struct StoredTransaction {
    header: Transaction,
    lines: Vec<TransactionLine>,
    /// Oldest first.
    remarks: Vec<Remark>,
}

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<ProductCode, Product>,
    admins: BTreeMap<AdminId, Admin>,
    customers: BTreeMap<CustomerId, Customer>,
    transactions: BTreeMap<TransactionId, StoredTransaction>,
    forecasts: BTreeMap<ForecastRowId, ForecastRow>,
    last_admin_id: i64,
    last_customer_id: i64,
    last_transaction_id: i64,
}

impl Tables {
    fn admin(&self, id: AdminId) -> StoreResult<&Admin> {
        self.admins.get(&id).ok_or(StoreError::NotFound)
    }

    fn customer(&self, id: CustomerId) -> StoreResult<&Customer> {
        self.customers.get(&id).ok_or(StoreError::NotFound)
    }

    fn transaction(&self, id: TransactionId) -> StoreResult<&StoredTransaction> {
        self.transactions.get(&id).ok_or(StoreError::NotFound)
    }

    fn admin_email_taken(&self, email: &str, except: Option<AdminId>) -> bool {
        self.admins
            .values()
            .any(|a| a.email == email && Some(a.id) != except)
    }

    fn customer_email_taken(&self, email: Option<&str>, except: Option<CustomerId>) -> bool {
        let Some(email) = email else {
            return false;
        };
        self.customers
            .values()
            .any(|c| c.email.as_deref() == Some(email) && Some(c.id) != except)
    }

    /// Parties referenced by a transaction must exist.
    fn ensure_parties(&self, customer_id: CustomerId, admin_id: AdminId) -> StoreResult<()> {
        if !self.customers.contains_key(&customer_id) {
            return Err(DomainError::validation(format!("customer {customer_id} does not exist")).into());
        }
        if !self.admins.contains_key(&admin_id) {
            return Err(DomainError::validation(format!("admin {admin_id} does not exist")).into());
        }
        Ok(())
    }

    fn summary(&self, stored: &StoredTransaction) -> TransactionSummary {
        let header = &stored.header;
        TransactionSummary {
            transaction: header.clone(),
            admin_name: self
                .admins
                .get(&header.admin_id)
                .map(|a| a.name.clone())
                .unwrap_or_default(),
            customer_name: self
                .customers
                .get(&header.customer_id)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            lines: stored.lines.clone(),
            latest_remark: stored.remarks.last().cloned(),
        }
    }

    fn summaries<'a>(
        &self,
        matching: impl Iterator<Item = &'a StoredTransaction>,
    ) -> Vec<TransactionSummary> {
        let mut items: Vec<TransactionSummary> = matching.map(|s| self.summary(s)).collect();
        items.sort_by(|a, b| {
            b.transaction
                .transaction_date
                .cmp(&a.transaction.transaction_date)
                .then(b.transaction.id.cmp(&a.transaction.id))
        });
        items
    }
}

/// In-memory implementation of every store, for tests/dev.
///
/// All tables sit behind one lock so multi-table writes are atomic.
#[derive(Debug)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Empty store with zero-target forecast rows for the known item groups.
    pub fn new() -> Self {
        let mut tables = Tables::default();
        let mut next_id = 0;
        for kind in ForecastKind::ALL {
            for group in Category::KNOWN {
                next_id += 1;
                let id = ForecastRowId::new(next_id);
                tables.forecasts.insert(
                    id,
                    ForecastRow {
                        id,
                        kind,
                        item_group: group.to_uppercase(),
                        central: Default::default(),
                        e_coast: Default::default(),
                        south: Default::default(),
                        north: Default::default(),
                    },
                );
            }
        }
        Self {
            tables: RwLock::new(tables),
        }
    }

    fn read<R>(&self, f: impl FnOnce(&Tables) -> StoreResult<R>) -> StoreResult<R> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))?;
        f(&tables)
    }

    fn write<R>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<R>) -> StoreResult<R> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))?;
        f(&mut tables)
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn insert_product(&self, product: Product) -> StoreResult<Product> {
        self.write(|t| {
            if t.products.contains_key(&product.code) {
                return Err(StoreError::conflict(format!(
                    "product {} already exists",
                    product.code
                )));
            }
            t.products.insert(product.id().clone(), product.clone());
            Ok(product)
        })
    }

    async fn get_product(&self, code: &ProductCode) -> StoreResult<Product> {
        self.read(|t| t.products.get(code).cloned().ok_or(StoreError::NotFound))
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        self.read(|t| Ok(t.products.values().cloned().collect()))
    }

    async fn search_products(&self, query: &str) -> StoreResult<Vec<Product>> {
        self.read(|t| {
            Ok(t.products
                .values()
                .filter(|p| p.matches_query(query))
                .cloned()
                .collect())
        })
    }

    async fn update_product(&self, product: Product) -> StoreResult<Product> {
        self.write(|t| {
            let slot = t.products.get_mut(&product.code).ok_or(StoreError::NotFound)?;
            *slot = product.clone();
            Ok(product)
        })
    }

    async fn delete_product(&self, code: &ProductCode) -> StoreResult<()> {
        self.write(|t| t.products.remove(code).map(|_| ()).ok_or(StoreError::NotFound))
    }
}

#[async_trait]
impl PartyStore for InMemoryStore {
    async fn insert_admin(&self, draft: AdminDraft) -> StoreResult<Admin> {
        self.write(|t| {
            if t.admin_email_taken(&draft.email, None) {
                return Err(StoreError::conflict(format!(
                    "email {} is already registered",
                    draft.email
                )));
            }
            t.last_admin_id += 1;
            let admin = draft.into_admin(AdminId::new(t.last_admin_id), Utc::now());
            t.admins.insert(*admin.id(), admin.clone());
            Ok(admin)
        })
    }

    async fn get_admin(&self, id: AdminId) -> StoreResult<Admin> {
        self.read(|t| t.admin(id).cloned())
    }

    async fn list_admins(&self) -> StoreResult<Vec<Admin>> {
        self.read(|t| Ok(t.admins.values().cloned().collect()))
    }

    async fn update_admin(&self, admin: Admin) -> StoreResult<Admin> {
        self.write(|t| {
            t.admin(admin.id)?;
            if t.admin_email_taken(&admin.email, Some(admin.id)) {
                return Err(StoreError::conflict(format!(
                    "email {} is already registered",
                    admin.email
                )));
            }
            t.admins.insert(*admin.id(), admin.clone());
            Ok(admin)
        })
    }

    async fn delete_admin(&self, id: AdminId) -> StoreResult<()> {
        self.write(|t| {
            t.admin(id)?;
            let referenced = t.customers.values().any(|c| c.admin_id == id)
                || t.transactions.values().any(|s| s.header.admin_id == id);
            if referenced {
                return Err(StoreError::conflict(format!(
                    "admin {id} still has customers or transactions"
                )));
            }
            t.admins.remove(&id);
            Ok(())
        })
    }

    async fn insert_customer(&self, draft: CustomerDraft) -> StoreResult<Customer> {
        self.write(|t| {
            t.admin(draft.admin_id).map_err(|_| {
                StoreError::from(DomainError::validation(format!(
                    "admin {} does not exist",
                    draft.admin_id
                )))
            })?;
            if t.customer_email_taken(draft.email.as_deref(), None) {
                return Err(StoreError::conflict("customer email is already used"));
            }
            t.last_customer_id += 1;
            let customer = draft.into_customer(CustomerId::new(t.last_customer_id), Utc::now());
            t.customers.insert(*customer.id(), customer.clone());
            Ok(customer)
        })
    }

    async fn get_customer(&self, id: CustomerId) -> StoreResult<Customer> {
        self.read(|t| t.customer(id).cloned())
    }

    async fn list_customers(&self, owner: Option<AdminId>) -> StoreResult<Vec<Customer>> {
        self.read(|t| {
            Ok(t.customers
                .values()
                .filter(|c| owner.is_none_or(|o| c.admin_id == o))
                .cloned()
                .collect())
        })
    }

    async fn replace_customer(&self, id: CustomerId, draft: CustomerDraft) -> StoreResult<Customer> {
        self.write(|t| {
            let created_at = t.customer(id)?.created_at;
            if !t.admins.contains_key(&draft.admin_id) {
                return Err(DomainError::validation(format!(
                    "admin {} does not exist",
                    draft.admin_id
                ))
                .into());
            }
            if t.customer_email_taken(draft.email.as_deref(), Some(id)) {
                return Err(StoreError::conflict("customer email is already used"));
            }
            let customer = draft.into_customer(id, created_at);
            t.customers.insert(id, customer.clone());
            Ok(customer)
        })
    }

    async fn delete_customer(&self, id: CustomerId) -> StoreResult<()> {
        self.write(|t| {
            t.customer(id)?;
            if t.transactions.values().any(|s| s.header.customer_id == id) {
                return Err(StoreError::conflict(format!(
                    "customer {id} still has transactions"
                )));
            }
            t.customers.remove(&id);
            Ok(())
        })
    }

    async fn search_parties(&self, query: &str) -> StoreResult<PartySearch> {
        self.read(|t| {
            Ok(PartySearch {
                admins: t
                    .admins
                    .values()
                    .filter(|a| a.matches_query(query))
                    .cloned()
                    .collect(),
                customers: t
                    .customers
                    .values()
                    .filter(|c| c.matches_query(query))
                    .cloned()
                    .collect(),
            })
        })
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn create_transaction(&self, draft: TransactionDraft) -> StoreResult<Transaction> {
        self.write(|t| {
            t.ensure_parties(draft.header.customer_id, draft.header.admin_id)?;
            check_availability(&draft.lines, |code| t.products.get(code).map(|p| p.stock))?;

            // Nothing below can fail: availability was checked per product.
            for line in &draft.lines {
                if let Some(product) = t.products.get_mut(&line.product_code) {
                    product.withdraw(line.quantity)?;
                }
            }

            t.last_transaction_id += 1;
            let header = draft
                .header
                .into_transaction(TransactionId::new(t.last_transaction_id), TransactionStatus::Pending);
            let remarks = draft
                .remark
                .map(|message| {
                    vec![Remark {
                        message,
                        created_at: Utc::now(),
                    }]
                })
                .unwrap_or_default();
            t.transactions.insert(
                header.id,
                StoredTransaction {
                    header: header.clone(),
                    lines: draft.lines,
                    remarks,
                },
            );
            Ok(header)
        })
    }

    async fn get_transaction(&self, id: TransactionId) -> StoreResult<Transaction> {
        self.read(|t| Ok(t.transaction(id)?.header.clone()))
    }

    async fn transaction_detail(&self, id: TransactionId) -> StoreResult<TransactionDetail> {
        self.read(|t| {
            let stored = t.transaction(id)?;
            let header = &stored.header;
            let admin = t
                .admin(header.admin_id)
                .map_err(|_| StoreError::corrupt(format!("transaction {id} has no admin")))?;
            let customer = t
                .customer(header.customer_id)
                .map_err(|_| StoreError::corrupt(format!("transaction {id} has no customer")))?;
            Ok(TransactionDetail {
                transaction: header.clone(),
                admin: admin.clone(),
                customer: customer.clone(),
                lines: stored
                    .lines
                    .iter()
                    .map(|line| DetailLine {
                        line: line.clone(),
                        product_name: t.products.get(&line.product_code).map(|p| p.name.clone()),
                    })
                    .collect(),
                remarks: stored.remarks.iter().rev().cloned().collect(),
            })
        })
    }

    async fn edit_transaction(
        &self,
        id: TransactionId,
        edit: TransactionEdit,
    ) -> StoreResult<EditOutcome> {
        self.write(|t| {
            let previous_status = t.transaction(id)?.header.status;
            let edit = edit.validate(previous_status)?;
            t.ensure_parties(edit.header.customer_id, edit.header.admin_id)?;

            let stored = t.transactions.get_mut(&id).ok_or(StoreError::NotFound)?;
            stored.header = edit.header.into_transaction(id, edit.status);
            stored.lines = edit.lines;
            if let Some(message) = edit.remark {
                stored.remarks.push(Remark {
                    message,
                    created_at: Utc::now(),
                });
            }
            Ok(EditOutcome {
                transaction: stored.header.clone(),
                previous_status,
            })
        })
    }

    async fn delete_transaction(&self, id: TransactionId) -> StoreResult<()> {
        self.write(|t| t.transactions.remove(&id).map(|_| ()).ok_or(StoreError::NotFound))
    }

    async fn list_transactions(
        &self,
        owner: Option<AdminId>,
    ) -> StoreResult<Vec<TransactionSummary>> {
        self.read(|t| {
            Ok(t.summaries(
                t.transactions
                    .values()
                    .filter(|s| owner.is_none_or(|o| s.header.admin_id == o)),
            ))
        })
    }

    async fn search_transactions(
        &self,
        admin_id: AdminId,
        query: &str,
    ) -> StoreResult<Vec<TransactionSummary>> {
        let needle = query.trim().to_lowercase();
        self.read(|t| {
            Ok(t.summaries(t.transactions.values().filter(|s| {
                let customer_name = t
                    .customers
                    .get(&s.header.customer_id)
                    .map(|c| c.name.to_lowercase())
                    .unwrap_or_default();
                s.header.admin_id == admin_id
                    && (s.header.doc_num.to_lowercase().contains(&needle)
                        || customer_name.contains(&needle))
            })))
        })
    }
}

#[async_trait]
impl ForecastStore for InMemoryStore {
    async fn list_forecast(&self, kind: ForecastKind) -> StoreResult<Vec<ForecastRow>> {
        self.read(|t| {
            Ok(t.forecasts
                .values()
                .filter(|row| row.kind == kind)
                .cloned()
                .collect())
        })
    }

    async fn update_forecast(
        &self,
        kind: ForecastKind,
        id: ForecastRowId,
        targets: RegionTargets,
    ) -> StoreResult<ForecastRow> {
        let targets = targets.validate()?;
        self.write(|t| {
            let row = t
                .forecasts
                .get_mut(&id)
                .filter(|row| row.kind == kind)
                .ok_or(StoreError::NotFound)?;
            row.apply(targets);
            Ok(row.clone())
        })
    }
}

#[async_trait]
impl SalesFeed for InMemoryStore {
    async fn approved_transactions(&self) -> StoreResult<Vec<ApprovedTransaction>> {
        self.read(|t| {
            Ok(t.transactions
                .values()
                .filter(|s| s.header.status == TransactionStatus::Approved)
                .map(|s| ApprovedTransaction {
                    transaction_id: s.header.id,
                    region_code: t
                        .admins
                        .get(&s.header.admin_id)
                        .map(|a| a.region.code().to_string())
                        .unwrap_or_default(),
                    lines: s
                        .lines
                        .iter()
                        .map(|line| ApprovedLine {
                            product_code: line.product_code.to_string(),
                            product: t.products.get(&line.product_code).map(|p| ProductFacts {
                                category: p.category.to_string(),
                                base_uom: p.base_uom.to_string(),
                            }),
                            quantity: line.quantity,
                            unit_price: line.unit_price,
                        })
                        .collect(),
                })
                .collect())
        })
    }
}
