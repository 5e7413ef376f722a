pub mod adapter;
pub mod client;
pub mod config;
pub mod engine;
pub mod humanize;
pub mod observability;
pub mod pump;
