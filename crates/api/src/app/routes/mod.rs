use axum::Router;

pub mod admins;
pub mod common;
pub mod customers;
pub mod dashboard;
pub mod parties;
pub mod products;
pub mod system;
pub mod transactions;

/// Router for every endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/admins", admins::router())
        .nest("/customers", customers::router())
        .nest("/parties", parties::router())
        .nest("/transactions", transactions::router())
        .nest("/dashboard", dashboard::router())
}
