pub extern crate actix_web;

pub mod config;
pub mod connection;
mod connection_tx_storage;
pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod session;

pub use connection_tx_storage::ConnectionTx;
