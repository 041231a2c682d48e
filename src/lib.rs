pub mod config;
pub mod error;
pub mod models;
pub mod placeholder;
pub mod search;
pub mod store;
