pub mod cli;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod mirror;
pub mod observability;
pub mod push;
pub mod store;
