//! Operations shared by the HTTP API and the CLI.

pub mod balance;
pub mod keys;
