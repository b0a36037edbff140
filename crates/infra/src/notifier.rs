//! Sales notifications.

use async_trait::async_trait;

use salesdesk_sales::{Transaction, TransactionStatus};

/// Told about new transactions and status changes.
///
/// Notification is best effort: implementations log their own failures and
/// never fail the write that triggered them.
#[async_trait]
pub trait SalesNotifier: Send + Sync {
    async fn transaction_created(&self, transaction: &Transaction);
    async fn status_changed(&self, transaction: &Transaction, previous: TransactionStatus);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl SalesNotifier for LogNotifier {
    async fn transaction_created(&self, transaction: &Transaction) {
        tracing::info!(
            transaction_id = %transaction.id,
            doc_num = %transaction.doc_num,
            admin_id = %transaction.admin_id,
            "new sales transaction"
        );
    }

    async fn status_changed(&self, transaction: &Transaction, previous: TransactionStatus) {
        tracing::info!(
            transaction_id = %transaction.id,
            from = %previous,
            to = %transaction.status,
            "sales transaction status changed"
        );
    }
}
