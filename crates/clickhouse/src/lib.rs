//! ClickHouse attendance store for the backblast miner.

pub mod client;
pub mod config;
pub mod health;
pub mod insert;
pub mod query;
pub mod schema;
pub mod store;

pub use client::*;
pub use config::*;
pub use query::*;
pub use store::ClickHouseStore;
