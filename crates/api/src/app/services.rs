//! Store selection and the operations that span more than one store.

use std::sync::Arc;

use salesdesk_core::{AdminId, TransactionId};
use salesdesk_forecast::{
    compare, with_total_row, DataIntegrityError, ForecastKind, ForecastTableRow,
    SalesForecastAggregator, SalesSummary, VarianceRow,
};
use salesdesk_infra::{
    AppConfig, ForecastStore, InMemoryStore, LogNotifier, PartyStore, PostgresStore,
    ProductStore, SalesFeed, SalesNotifier, StoreError, StoreResult, TransactionStore,
    TransactionSummary,
};
use salesdesk_parties::Customer;
use salesdesk_sales::{NewTransaction, Transaction, TransactionEdit};

use crate::app::dto::ByKind;

/// Failure while building a sales report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Integrity(#[from] DataIntegrityError),
}

pub struct AppServices {
    pub products: Arc<dyn ProductStore>,
    pub parties: Arc<dyn PartyStore>,
    pub transactions: Arc<dyn TransactionStore>,
    pub forecasts: Arc<dyn ForecastStore>,
    feed: Arc<dyn SalesFeed>,
    notifier: Arc<dyn SalesNotifier>,
    aggregator: SalesForecastAggregator,
}

/// Postgres when `database_url` is set, in-memory stores otherwise.
pub async fn build_services(config: &AppConfig) -> StoreResult<AppServices> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url).await?;
            store.migrate().await?;
            tracing::info!("using postgres stores");
            Ok(AppServices::from_store(Arc::new(store), config))
        }
        None => {
            tracing::warn!("database_url not set; using in-memory stores");
            Ok(AppServices::in_memory(config))
        }
    }
}

impl AppServices {
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()), config)
    }

    /// Wire every store seam to one backend.
    pub fn from_store<S>(store: Arc<S>, config: &AppConfig) -> Self
    where
        S: ProductStore + PartyStore + TransactionStore + ForecastStore + SalesFeed + 'static,
    {
        let aggregator = SalesForecastAggregator::new()
            .with_missing_product_policy(config.missing_product_policy)
            .with_seeded_categories(config.seeded_categories());

        Self {
            products: store.clone(),
            parties: store.clone(),
            transactions: store.clone(),
            forecasts: store.clone(),
            feed: store,
            notifier: Arc::new(LogNotifier),
            aggregator,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn SalesNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Owner filter for a viewer: salespeople only see their own records,
    /// admins (and anonymous listing) see everything.
    pub async fn viewer_scope(&self, viewer: Option<AdminId>) -> StoreResult<Option<AdminId>> {
        match viewer {
            Some(id) => Ok(self.parties.get_admin(id).await?.visible_owner()),
            None => Ok(None),
        }
    }

    pub async fn list_customers(&self, viewer: Option<AdminId>) -> StoreResult<Vec<Customer>> {
        let owner = self.viewer_scope(viewer).await?;
        self.parties.list_customers(owner).await
    }

    pub async fn list_transactions(
        &self,
        viewer: Option<AdminId>,
    ) -> StoreResult<Vec<TransactionSummary>> {
        let owner = self.viewer_scope(viewer).await?;
        self.transactions.list_transactions(owner).await
    }

    pub async fn create_transaction(&self, new: NewTransaction) -> StoreResult<Transaction> {
        let draft = new.validate()?;
        let transaction = self.transactions.create_transaction(draft).await?;
        tracing::info!(
            transaction_id = %transaction.id,
            doc_num = %transaction.doc_num,
            "transaction created"
        );
        self.notifier.transaction_created(&transaction).await;
        Ok(transaction)
    }

    pub async fn edit_transaction(
        &self,
        id: TransactionId,
        edit: TransactionEdit,
    ) -> StoreResult<Transaction> {
        let outcome = self.transactions.edit_transaction(id, edit).await?;
        if outcome.status_changed() {
            self.notifier
                .status_changed(&outcome.transaction, outcome.previous_status)
                .await;
        }
        Ok(outcome.transaction)
    }

    /// Both forecast tables with their `Total` rows.
    pub async fn forecast_tables(&self) -> StoreResult<ByKind<Vec<ForecastTableRow>>> {
        Ok(ByKind {
            mt: with_total_row(self.forecasts.list_forecast(ForecastKind::Mt).await?),
            costing: with_total_row(self.forecasts.list_forecast(ForecastKind::Costing).await?),
        })
    }

    /// Aggregate every approved transaction. Any integrity problem fails the
    /// whole report.
    pub async fn current_sales(&self) -> Result<SalesSummary, ReportError> {
        let feed = self.feed.approved_transactions().await?;
        self.aggregator.aggregate(&feed).map_err(|err| {
            tracing::error!(
                transaction_id = %err.transaction_id(),
                error = %err,
                "sales aggregation rejected"
            );
            ReportError::from(err)
        })
    }

    /// MT targets against sold weight, COSTING targets against sales value.
    pub async fn forecast_vs_actual(&self) -> Result<ByKind<Vec<VarianceRow>>, ReportError> {
        let summary = self.current_sales().await?;
        let mt = self.forecasts.list_forecast(ForecastKind::Mt).await?;
        let costing = self.forecasts.list_forecast(ForecastKind::Costing).await?;
        Ok(ByKind {
            mt: compare(&mt, &summary.weight),
            costing: compare(&costing, &summary.costing),
        })
    }
}
