//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! | Postgres error | `StoreError` |
//! |---|---|
//! | unique violation (`23505`) | `Conflict` |
//! | foreign key violation (`23503`) | `Conflict` |
//! | anything else | `Database` |
//!
//! Stored values that no longer parse into domain types (an unknown role, a
//! blank category) surface as `Corrupt`. Region codes are the exception: they
//! are handed to the aggregator raw so it can reject them itself.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::collections::HashMap;
use tracing::instrument;

use salesdesk_core::{AdminId, CustomerId, DomainError, ForecastRowId, TransactionId};
use salesdesk_forecast::{
    ApprovedLine, ApprovedTransaction, ForecastKind, ForecastRow, ProductFacts, RegionTargets,
};
use salesdesk_parties::{Admin, AdminDraft, Customer, CustomerDraft, Registration};
use salesdesk_products::{Category, Product, ProductCode, UnitOfMeasure};
use salesdesk_sales::{
    check_availability, Remark, Transaction, TransactionDraft, TransactionEdit, TransactionLine,
    TransactionStatus,
};

use super::{
    DetailLine, EditOutcome, ForecastStore, PartySearch, PartyStore, ProductStore,
    TransactionDetail, TransactionStore, TransactionSummary,
};
use crate::error::{map_sqlx_error, StoreError, StoreResult};
use crate::feed::SalesFeed;

const SCHEMA: &str = include_str!("schema.sql");

const PRODUCT_COLUMNS: &str = "code, name, category, base_uom, stock, unit_price";
const ADMIN_COLUMNS: &str = "id, created_at, name, email, phone, role, code, region";
const CUSTOMER_COLUMNS: &str = "id, created_at, code, name, ssm_registration_no, \
     tax_identification_no, sst_no, msic_code, business_nature, pic_name, email, phone_no, \
     address, credit_term, credit_limit, admin_id";
const TRANSACTION_COLUMNS: &str = "t.id, t.doc_num, t.transaction_date, t.customer_id, \
     t.admin_id, t.total_price, t.ref_doc_no, t.delivery_date, t.shipping_method, t.commission, \
     t.status, t.location";
const FORECAST_COLUMNS: &str = "id, kind, item_group, central, e_coast, south, north";

/// Every store backed by one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and seed the forecast item groups. Idempotent.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::info!("database schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Summaries filtered by an optional owner and an optional ILIKE pattern
    /// over document number and customer name.
    async fn fetch_summaries(
        &self,
        admin_id: Option<i64>,
        pattern: Option<String>,
    ) -> StoreResult<Vec<TransactionSummary>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS}, a.name AS admin_name, c.name AS customer_name, \
                    r.message AS remark_message, r.created_at AS remark_created_at \
             FROM transactions t \
             JOIN admins a ON a.id = t.admin_id \
             JOIN customers c ON c.id = t.customer_id \
             LEFT JOIN LATERAL ( \
                 SELECT message, created_at FROM remarks \
                 WHERE transaction_id = t.id \
                 ORDER BY created_at DESC, id DESC LIMIT 1 \
             ) r ON TRUE \
             WHERE ($1::BIGINT IS NULL OR t.admin_id = $1) \
               AND ($2::TEXT IS NULL OR t.doc_num ILIKE $2 OR c.name ILIKE $2) \
             ORDER BY t.transaction_date DESC, t.id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(admin_id)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<i64> = rows
            .iter()
            .map(|row| row.try_get::<i64, _>("id"))
            .collect::<Result<_, _>>()?;
        let mut lines = self.lines_for(&ids).await?;

        rows.iter()
            .map(|row| {
                let transaction = transaction_from_row(row)?;
                let message: Option<String> = row.try_get("remark_message")?;
                let created_at: Option<DateTime<Utc>> = row.try_get("remark_created_at")?;
                Ok(TransactionSummary {
                    lines: lines.remove(&transaction.id.get()).unwrap_or_default(),
                    admin_name: row.try_get("admin_name")?,
                    customer_name: row.try_get("customer_name")?,
                    latest_remark: message
                        .zip(created_at)
                        .map(|(message, created_at)| Remark { message, created_at }),
                    transaction,
                })
            })
            .collect()
    }

    async fn lines_for(&self, ids: &[i64]) -> StoreResult<HashMap<i64, Vec<TransactionLine>>> {
        let rows = sqlx::query(
            "SELECT transaction_id, product_code, quantity, unit_price \
             FROM transaction_lines WHERE transaction_id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<TransactionLine>> = HashMap::new();
        for row in &rows {
            grouped
                .entry(row.try_get("transaction_id")?)
                .or_default()
                .push(line_from_row(row)?);
        }
        Ok(grouped)
    }
}

fn corrupt(err: DomainError) -> StoreError {
    StoreError::corrupt(err.to_string())
}

/// `%query%` for ILIKE, with LIKE metacharacters escaped.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    Ok(Product {
        code: ProductCode::parse(row.try_get::<String, _>("code")?).map_err(corrupt)?,
        name: row.try_get("name")?,
        category: Category::parse(row.try_get::<String, _>("category")?).map_err(corrupt)?,
        base_uom: UnitOfMeasure::parse(row.try_get::<String, _>("base_uom")?).map_err(corrupt)?,
        stock: row.try_get("stock")?,
        unit_price: row.try_get("unit_price")?,
    })
}

fn admin_from_row(row: &PgRow) -> StoreResult<Admin> {
    Ok(Admin {
        id: AdminId::new(row.try_get("id")?),
        created_at: row.try_get("created_at")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        role: row.try_get::<String, _>("role")?.parse().map_err(corrupt)?,
        code: row.try_get("code")?,
        region: row.try_get::<String, _>("region")?.parse().map_err(corrupt)?,
    })
}

fn customer_from_row(row: &PgRow) -> StoreResult<Customer> {
    Ok(Customer {
        id: CustomerId::new(row.try_get("id")?),
        created_at: row.try_get("created_at")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        registration: Registration {
            ssm_registration_no: row.try_get("ssm_registration_no")?,
            tax_identification_no: row.try_get("tax_identification_no")?,
            sst_no: row.try_get("sst_no")?,
            msic_code: row.try_get("msic_code")?,
            business_nature: row.try_get("business_nature")?,
        },
        pic_name: row.try_get("pic_name")?,
        email: row.try_get("email")?,
        phone_no: row.try_get("phone_no")?,
        address: row.try_get("address")?,
        credit_term: row.try_get("credit_term")?,
        credit_limit: row.try_get("credit_limit")?,
        admin_id: AdminId::new(row.try_get("admin_id")?),
    })
}

fn transaction_from_row(row: &PgRow) -> StoreResult<Transaction> {
    Ok(Transaction {
        id: TransactionId::new(row.try_get("id")?),
        doc_num: row.try_get("doc_num")?,
        transaction_date: row.try_get::<NaiveDate, _>("transaction_date")?,
        customer_id: CustomerId::new(row.try_get("customer_id")?),
        admin_id: AdminId::new(row.try_get("admin_id")?),
        total_price: row.try_get("total_price")?,
        ref_doc_no: row.try_get("ref_doc_no")?,
        delivery_date: row.try_get::<NaiveDate, _>("delivery_date")?,
        shipping_method: row.try_get("shipping_method")?,
        commission: row.try_get("commission")?,
        status: row.try_get::<String, _>("status")?.parse().map_err(corrupt)?,
        location: row.try_get("location")?,
    })
}

fn line_from_row(row: &PgRow) -> StoreResult<TransactionLine> {
    Ok(TransactionLine {
        product_code: ProductCode::parse(row.try_get::<String, _>("product_code")?)
            .map_err(corrupt)?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
    })
}

fn forecast_from_row(row: &PgRow) -> StoreResult<ForecastRow> {
    Ok(ForecastRow {
        id: ForecastRowId::new(row.try_get("id")?),
        kind: row.try_get::<String, _>("kind")?.parse().map_err(corrupt)?,
        item_group: row.try_get("item_group")?,
        central: row.try_get("central")?,
        e_coast: row.try_get("e_coast")?,
        south: row.try_get("south")?,
        north: row.try_get("north")?,
    })
}

async fn ensure_admin<'e, E>(executor: E, admin_id: AdminId) -> StoreResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let found = sqlx::query("SELECT 1 FROM admins WHERE id = $1")
        .bind(admin_id.get())
        .fetch_optional(executor)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(DomainError::validation(format!("admin {admin_id} does not exist")).into()),
    }
}

async fn ensure_customer<'e, E>(executor: E, customer_id: CustomerId) -> StoreResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let found = sqlx::query("SELECT 1 FROM customers WHERE id = $1")
        .bind(customer_id.get())
        .fetch_optional(executor)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => {
            Err(DomainError::validation(format!("customer {customer_id} does not exist")).into())
        }
    }
}

async fn insert_lines(
    conn: &mut sqlx::PgConnection,
    id: TransactionId,
    lines: &[TransactionLine],
) -> StoreResult<()> {
    for line in lines {
        sqlx::query(
            "INSERT INTO transaction_lines (transaction_id, product_code, quantity, unit_price) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(id.get())
        .bind(line.product_code.as_str())
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_remark(
    conn: &mut sqlx::PgConnection,
    id: TransactionId,
    remark: Option<&str>,
) -> StoreResult<()> {
    if let Some(message) = remark {
        sqlx::query("INSERT INTO remarks (transaction_id, message) VALUES ($1, $2)")
            .bind(id.get())
            .bind(message)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn insert_product(&self, product: Product) -> StoreResult<Product> {
        let sql = format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(product.code.as_str())
            .bind(&product.name)
            .bind(product.category.as_str())
            .bind(product.base_uom.as_str())
            .bind(product.stock)
            .bind(product.unit_price)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_product", e))?;
        product_from_row(&row)
    }

    async fn get_product(&self, code: &ProductCode) -> StoreResult<Product> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = $1");
        let row = sqlx::query(&sql)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        product_from_row(&row)
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY code");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(product_from_row).collect()
    }

    async fn search_products(&self, query: &str) -> StoreResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE name ILIKE $1 OR code ILIKE $1 ORDER BY code"
        );
        let rows = sqlx::query(&sql)
            .bind(like_pattern(query))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(product_from_row).collect()
    }

    async fn update_product(&self, product: Product) -> StoreResult<Product> {
        let sql = format!(
            "UPDATE products SET name = $2, category = $3, base_uom = $4, stock = $5, \
             unit_price = $6 WHERE code = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(product.code.as_str())
            .bind(&product.name)
            .bind(product.category.as_str())
            .bind(product.base_uom.as_str())
            .bind(product.stock)
            .bind(product.unit_price)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        product_from_row(&row)
    }

    async fn delete_product(&self, code: &ProductCode) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE code = $1")
            .bind(code.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PartyStore for PostgresStore {
    async fn insert_admin(&self, draft: AdminDraft) -> StoreResult<Admin> {
        let sql = format!(
            "INSERT INTO admins (name, email, phone, role, code, region) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ADMIN_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&draft.name)
            .bind(&draft.email)
            .bind(&draft.phone)
            .bind(draft.role.code())
            .bind(&draft.code)
            .bind(draft.region.code())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_admin", e))?;
        admin_from_row(&row)
    }

    async fn get_admin(&self, id: AdminId) -> StoreResult<Admin> {
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        admin_from_row(&row)
    }

    async fn list_admins(&self) -> StoreResult<Vec<Admin>> {
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM admins ORDER BY id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(admin_from_row).collect()
    }

    async fn update_admin(&self, admin: Admin) -> StoreResult<Admin> {
        let sql = format!(
            "UPDATE admins SET name = $2, email = $3, phone = $4, role = $5, code = $6, \
             region = $7 WHERE id = $1 RETURNING {ADMIN_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(admin.id.get())
            .bind(&admin.name)
            .bind(&admin.email)
            .bind(&admin.phone)
            .bind(admin.role.code())
            .bind(&admin.code)
            .bind(admin.region.code())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_admin", e))?
            .ok_or(StoreError::NotFound)?;
        admin_from_row(&row)
    }

    async fn delete_admin(&self, id: AdminId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM admins WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_admin", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn insert_customer(&self, draft: CustomerDraft) -> StoreResult<Customer> {
        ensure_admin(&self.pool, draft.admin_id).await?;
        let sql = format!(
            "INSERT INTO customers (code, name, ssm_registration_no, tax_identification_no, \
             sst_no, msic_code, business_nature, pic_name, email, phone_no, address, \
             credit_term, credit_limit, admin_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {CUSTOMER_COLUMNS}"
        );
        let row = bind_customer(sqlx::query(&sql), &draft)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_customer", e))?;
        customer_from_row(&row)
    }

    async fn get_customer(&self, id: CustomerId) -> StoreResult<Customer> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        customer_from_row(&row)
    }

    async fn list_customers(&self, owner: Option<AdminId>) -> StoreResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers \
             WHERE ($1::BIGINT IS NULL OR admin_id = $1) ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(owner.map(|o| o.get()))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(customer_from_row).collect()
    }

    async fn replace_customer(&self, id: CustomerId, draft: CustomerDraft) -> StoreResult<Customer> {
        ensure_admin(&self.pool, draft.admin_id).await?;
        let sql = format!(
            "UPDATE customers SET code = $1, name = $2, ssm_registration_no = $3, \
             tax_identification_no = $4, sst_no = $5, msic_code = $6, business_nature = $7, \
             pic_name = $8, email = $9, phone_no = $10, address = $11, credit_term = $12, \
             credit_limit = $13, admin_id = $14 \
             WHERE id = $15 RETURNING {CUSTOMER_COLUMNS}"
        );
        let row = bind_customer(sqlx::query(&sql), &draft)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("replace_customer", e))?
            .ok_or(StoreError::NotFound)?;
        customer_from_row(&row)
    }

    async fn delete_customer(&self, id: CustomerId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_customer", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn search_parties(&self, query: &str) -> StoreResult<PartySearch> {
        let pattern = like_pattern(query);
        let admin_sql = format!(
            "SELECT {ADMIN_COLUMNS} FROM admins \
             WHERE name ILIKE $1 OR email ILIKE $1 OR code ILIKE $1 ORDER BY id"
        );
        let customer_sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers \
             WHERE name ILIKE $1 OR code ILIKE $1 OR email ILIKE $1 OR pic_name ILIKE $1 \
             ORDER BY id"
        );
        let admins = sqlx::query(&admin_sql)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await?;
        let customers = sqlx::query(&customer_sql)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await?;
        Ok(PartySearch {
            admins: admins.iter().map(admin_from_row).collect::<StoreResult<_>>()?,
            customers: customers
                .iter()
                .map(customer_from_row)
                .collect::<StoreResult<_>>()?,
        })
    }
}

fn bind_customer<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    draft: &'q CustomerDraft,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(&draft.code)
        .bind(&draft.name)
        .bind(&draft.registration.ssm_registration_no)
        .bind(&draft.registration.tax_identification_no)
        .bind(&draft.registration.sst_no)
        .bind(&draft.registration.msic_code)
        .bind(&draft.registration.business_nature)
        .bind(&draft.pic_name)
        .bind(&draft.email)
        .bind(&draft.phone_no)
        .bind(&draft.address)
        .bind(&draft.credit_term)
        .bind(draft.credit_limit)
        .bind(draft.admin_id.get())
}

#[async_trait]
impl TransactionStore for PostgresStore {
    #[instrument(skip_all, fields(doc_num = %draft.header.doc_num), err)]
    async fn create_transaction(&self, draft: TransactionDraft) -> StoreResult<Transaction> {
        let mut tx = self.pool.begin().await?;
        ensure_customer(&mut *tx, draft.header.customer_id).await?;
        ensure_admin(&mut *tx, draft.header.admin_id).await?;

        let mut codes: Vec<String> = draft
            .lines
            .iter()
            .map(|l| l.product_code.as_str().to_string())
            .collect();
        codes.sort_unstable();
        codes.dedup();
        // Row locks keep concurrent orders from overdrawing the same product.
        let rows = sqlx::query("SELECT code, stock FROM products WHERE code = ANY($1) FOR UPDATE")
            .bind(codes.as_slice())
            .fetch_all(&mut *tx)
            .await?;
        let mut available: HashMap<String, Decimal> = HashMap::with_capacity(rows.len());
        for row in &rows {
            available.insert(row.try_get("code")?, row.try_get("stock")?);
        }
        check_availability(&draft.lines, |code| available.get(code.as_str()).copied())?;

        let header = &draft.header;
        let sql = format!(
            "INSERT INTO transactions AS t (doc_num, transaction_date, customer_id, admin_id, \
             total_price, ref_doc_no, delivery_date, shipping_method, commission, status, location) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {TRANSACTION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&header.doc_num)
            .bind(header.transaction_date)
            .bind(header.customer_id.get())
            .bind(header.admin_id.get())
            .bind(header.total_price)
            .bind(&header.ref_doc_no)
            .bind(header.delivery_date)
            .bind(&header.shipping_method)
            .bind(header.commission)
            .bind(TransactionStatus::Pending.code())
            .bind(&header.location)
            .fetch_one(&mut *tx)
            .await?;
        let transaction = transaction_from_row(&row)?;

        insert_lines(&mut tx, transaction.id, &draft.lines).await?;
        for line in &draft.lines {
            sqlx::query("UPDATE products SET stock = stock - $1 WHERE code = $2")
                .bind(line.quantity)
                .bind(line.product_code.as_str())
                .execute(&mut *tx)
                .await?;
        }
        insert_remark(&mut tx, transaction.id, draft.remark.as_deref()).await?;

        tx.commit().await?;
        Ok(transaction)
    }

    async fn get_transaction(&self, id: TransactionId) -> StoreResult<Transaction> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions t WHERE t.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        transaction_from_row(&row)
    }

    async fn transaction_detail(&self, id: TransactionId) -> StoreResult<TransactionDetail> {
        let transaction = self.get_transaction(id).await?;
        let admin = self.get_admin(transaction.admin_id).await.map_err(|e| match e {
            StoreError::NotFound => StoreError::corrupt(format!("transaction {id} has no admin")),
            other => other,
        })?;
        let customer = self
            .get_customer(transaction.customer_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => {
                    StoreError::corrupt(format!("transaction {id} has no customer"))
                }
                other => other,
            })?;

        let line_rows = sqlx::query(
            "SELECT l.product_code, l.quantity, l.unit_price, p.name AS product_name \
             FROM transaction_lines l LEFT JOIN products p ON p.code = l.product_code \
             WHERE l.transaction_id = $1 ORDER BY l.id",
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await?;
        let lines = line_rows
            .iter()
            .map(|row| {
                Ok(DetailLine {
                    line: line_from_row(row)?,
                    product_name: row.try_get("product_name")?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let remark_rows = sqlx::query(
            "SELECT message, created_at FROM remarks WHERE transaction_id = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await?;
        let remarks = remark_rows
            .iter()
            .map(|row| {
                Ok(Remark {
                    message: row.try_get("message")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(TransactionDetail {
            transaction,
            admin,
            customer,
            lines,
            remarks,
        })
    }

    #[instrument(skip(self, edit), err)]
    async fn edit_transaction(
        &self,
        id: TransactionId,
        edit: TransactionEdit,
    ) -> StoreResult<EditOutcome> {
        let mut tx = self.pool.begin().await?;
        let current: String = sqlx::query("SELECT status FROM transactions WHERE id = $1 FOR UPDATE")
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?
            .try_get("status")?;
        let previous_status: TransactionStatus = current.parse().map_err(corrupt)?;

        let edit = edit.validate(previous_status)?;
        ensure_customer(&mut *tx, edit.header.customer_id).await?;
        ensure_admin(&mut *tx, edit.header.admin_id).await?;

        let header = &edit.header;
        let sql = format!(
            "UPDATE transactions AS t SET doc_num = $2, transaction_date = $3, customer_id = $4, \
             admin_id = $5, total_price = $6, ref_doc_no = $7, delivery_date = $8, \
             shipping_method = $9, commission = $10, status = $11, location = $12 \
             WHERE t.id = $1 RETURNING {TRANSACTION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(&header.doc_num)
            .bind(header.transaction_date)
            .bind(header.customer_id.get())
            .bind(header.admin_id.get())
            .bind(header.total_price)
            .bind(&header.ref_doc_no)
            .bind(header.delivery_date)
            .bind(&header.shipping_method)
            .bind(header.commission)
            .bind(edit.status.code())
            .bind(&header.location)
            .fetch_one(&mut *tx)
            .await?;
        let transaction = transaction_from_row(&row)?;

        sqlx::query("DELETE FROM transaction_lines WHERE transaction_id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;
        insert_lines(&mut tx, id, &edit.lines).await?;
        insert_remark(&mut tx, id, edit.remark.as_deref()).await?;

        tx.commit().await?;
        Ok(EditOutcome {
            transaction,
            previous_status,
        })
    }

    async fn delete_transaction(&self, id: TransactionId) -> StoreResult<()> {
        // Lines and remarks go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_transactions(
        &self,
        owner: Option<AdminId>,
    ) -> StoreResult<Vec<TransactionSummary>> {
        self.fetch_summaries(owner.map(|o| o.get()), None).await
    }

    async fn search_transactions(
        &self,
        admin_id: AdminId,
        query: &str,
    ) -> StoreResult<Vec<TransactionSummary>> {
        self.fetch_summaries(Some(admin_id.get()), Some(like_pattern(query)))
            .await
    }
}

#[async_trait]
impl ForecastStore for PostgresStore {
    async fn list_forecast(&self, kind: ForecastKind) -> StoreResult<Vec<ForecastRow>> {
        let sql = format!("SELECT {FORECAST_COLUMNS} FROM regional_forecast WHERE kind = $1 ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(kind.code())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(forecast_from_row).collect()
    }

    async fn update_forecast(
        &self,
        kind: ForecastKind,
        id: ForecastRowId,
        targets: RegionTargets,
    ) -> StoreResult<ForecastRow> {
        let targets = targets.validate()?;
        let sql = format!(
            "UPDATE regional_forecast SET central = $3, e_coast = $4, south = $5, north = $6 \
             WHERE id = $1 AND kind = $2 RETURNING {FORECAST_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(kind.code())
            .bind(targets.central)
            .bind(targets.e_coast)
            .bind(targets.south)
            .bind(targets.north)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        forecast_from_row(&row)
    }
}

#[async_trait]
impl SalesFeed for PostgresStore {
    #[instrument(skip(self), err)]
    async fn approved_transactions(&self) -> StoreResult<Vec<ApprovedTransaction>> {
        let rows = sqlx::query(
            "SELECT t.id AS transaction_id, a.region AS region_code, \
                    l.product_code, l.quantity, l.unit_price, p.category, p.base_uom \
             FROM transactions t \
             JOIN admins a ON a.id = t.admin_id \
             LEFT JOIN transaction_lines l ON l.transaction_id = t.id \
             LEFT JOIN products p ON p.code = l.product_code \
             WHERE t.status = $1 \
             ORDER BY t.id, l.id",
        )
        .bind(TransactionStatus::Approved.code())
        .fetch_all(&self.pool)
        .await?;

        let mut feed: Vec<ApprovedTransaction> = Vec::new();
        for row in &rows {
            let transaction_id = TransactionId::new(row.try_get("transaction_id")?);
            if feed.last().map(|t| t.transaction_id) != Some(transaction_id) {
                feed.push(ApprovedTransaction {
                    transaction_id,
                    region_code: row.try_get("region_code")?,
                    lines: Vec::new(),
                });
            }

            // A transaction without lines yields one row of NULLs.
            let Some(product_code) = row.try_get::<Option<String>, _>("product_code")? else {
                continue;
            };
            let category: Option<String> = row.try_get("category")?;
            let base_uom: Option<String> = row.try_get("base_uom")?;
            let line = ApprovedLine {
                product_code,
                product: category
                    .zip(base_uom)
                    .map(|(category, base_uom)| ProductFacts { category, base_uom }),
                quantity: row.try_get("quantity")?,
                unit_price: row.try_get("unit_price")?,
            };
            if let Some(current) = feed.last_mut() {
                current.lines.push(line);
            }
        }
        Ok(feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("gold"), "%gold%");
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn schema_seeds_both_forecast_tables() {
        for kind in ForecastKind::ALL {
            for group in Category::KNOWN {
                let seed = format!("('{}', '{}')", kind.code(), group.to_uppercase());
                assert!(SCHEMA.contains(&seed), "missing seed {seed}");
            }
        }
    }
}
