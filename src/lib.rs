pub mod config;
pub mod dune;
pub mod error;
pub mod format;
pub mod server;
pub mod tools;
