//! Auth provider adapters. Implement AuthProvider.
//!
//! GoTrue over HTTP for real deployments, an in-memory provider for local runs and tests.

pub mod broadcast;
pub mod gotrue_adapter;
pub mod memory_provider;

pub use gotrue_adapter::GoTrueAuthProvider;
pub use memory_provider::MemoryAuthProvider;
