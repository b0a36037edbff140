//! Infrastructure layer: configuration, persistence, notifications.

pub mod config;
pub mod error;
pub mod feed;
pub mod notifier;
pub mod store;

pub use config::AppConfig;
pub use error::{StoreError, StoreResult};
pub use feed::SalesFeed;
pub use notifier::{LogNotifier, SalesNotifier};
pub use store::{
    DetailLine, EditOutcome, ForecastStore, InMemoryStore, PartySearch, PartyStore,
    PostgresStore, ProductStore, TransactionDetail, TransactionStore, TransactionSummary,
};
