pub mod auth;
pub mod property;
pub mod requirement;
pub mod server;
pub mod user;
