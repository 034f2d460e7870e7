//! CLI command modules.

pub mod account;
pub mod health;
pub mod http;
pub mod tasks;
