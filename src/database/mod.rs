pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query_builder;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;
pub use repository::{Store, StoreTx};
