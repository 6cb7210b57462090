pub mod api;
pub mod config;
pub mod extract;
pub mod humanize;
pub mod observability;
pub mod pool;
