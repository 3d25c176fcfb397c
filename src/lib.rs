pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod identity;
pub mod media;
pub mod middleware;
pub mod services;
pub mod state;
pub mod types;

// Fakes and fixtures, public so integration tests can drive the real router.
pub mod testing;
