pub mod cache;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod resize;
pub mod warehouse;
pub mod web;
