//! Discord REST client for the backblast miner.
//!
//! Implements the message source, reply sink, channel directory and guild
//! directory seams from `backblast-core` over the Discord HTTP API.

pub mod client;
pub mod config;
pub mod health;
pub mod models;
pub mod snowflake;
pub mod source;

pub use client::*;
pub use config::*;
