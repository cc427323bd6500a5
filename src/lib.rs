//! bizdash: small-business dashboard core with Hexagonal Architecture.
//!
//! Session reconciliation against an auth provider and pure metric reducers over
//! transactions, invoices, products and inventory.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
