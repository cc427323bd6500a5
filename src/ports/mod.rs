//! Port traits. API boundaries for the hexagon.
//!
//! - Inbound: Called by UI/adapter into the application
//! - Outbound: Called by application into infrastructure

pub mod inbound;
pub mod outbound;
pub mod query;

pub use inbound::InputPort;
pub use outbound::{AuthProvider, RecordStore, Subscription, TokenCache};
pub use query::{Filter, Order, Query, Row, Scalar, Table, decode_rows, decode_rows_lossy, store_timestamp};
