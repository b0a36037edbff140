//! Parties domain module (admins and customers).
//!
//! This crate contains business rules for back-office users and the customers
//! they manage, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod admin;
pub mod customer;

pub use admin::{Admin, AdminDraft, AdminPatch, NewAdmin, Role};
pub use customer::{Customer, CustomerDraft, NewCustomer, Registration};
