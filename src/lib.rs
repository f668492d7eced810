pub mod cli;
pub mod config;
pub mod platform;
pub mod scheduler;
pub mod snapshot;
pub mod source;
pub mod store;
