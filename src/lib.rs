//! Shared baby care log with a Telegram bot and a terminal interface.
//! Everyone in the family writes to the same file, so feedings, temperatures
//! and diaper changes stay in one place no matter who logged them.
//!

pub mod access;
pub mod bot;
pub mod cli;
pub mod config;
pub mod stats;
pub mod store;
pub mod utils;
