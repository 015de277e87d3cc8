//! Authoritative server core for a real-time multi-table Pot-Limit Omaha
//! service. The `table` actor owns seats, the hand engine, acting-turn
//! scheduling, all-in runouts and the fast-fold reseat protocol; the
//! `server` module exposes the WebSocket ingress of the dev harness.

pub mod cards;
pub mod config;
pub mod engine;
pub mod equity;
pub mod history;
pub mod server;
pub mod table;

pub use config::TableConfig;
pub use table::{TableHandle, TableInstance};
