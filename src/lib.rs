pub mod config;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod reconcile;
pub mod stats;
