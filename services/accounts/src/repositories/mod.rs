//! Repositories for database operations

pub mod account;
pub mod memory;
pub mod postgres;

pub use account::{AccountRepository, AccountStore};
pub use memory::MemoryAccountStore;
pub use postgres::{PgAccountStore, run_migrations};
