//! # HTTP Server Module
//!
//! REST facade over the database.
//!
//! # Endpoints
//!
//! - `/` and `/health` - Welcome message and health check
//! - `/table/*` - Table catalog, DDL and row mutations
//! - `/select/*` - Structured SELECT queries
//! - `/indexview/*` - Indexes and views
//! - `/sequences/*` - Sequences
//! - `/transactions/*` - Transaction control

pub mod config;
pub mod errors;
pub mod index_view_routes;
pub mod observability_routes;
pub mod select_routes;
pub mod sequence_routes;
pub mod server;
pub mod state;
pub mod table_routes;
pub mod transaction_routes;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult};
pub use server::HttpServer;
pub use state::DatabaseState;
