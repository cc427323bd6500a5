//! Infrastructure adapters. Implement outbound ports.
//!
//! Record store, token caches, auth providers, exports, terminal UI. Map errors to DomainError.

pub mod auth;
pub mod export;
pub mod persistence;
pub mod ui;
