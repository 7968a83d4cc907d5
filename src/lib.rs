//! pgfacade - a generic HTTP facade over a PostgreSQL database
//!
//! Table management, structured SELECT queries, indexes and views,
//! sequences and transaction control, each exposed as REST endpoints that
//! translate directly into SQL.

pub mod cli;
pub mod db;
pub mod http_server;
pub mod observability;
pub mod operations;
