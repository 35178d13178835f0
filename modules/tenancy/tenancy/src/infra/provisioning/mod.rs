//! Per-tenant resource provisioners.
//!
//! - `database` - One database per tenant behind a [`DatabaseManager`]
//! - `sqlite` / `postgres` - Database managers
//! - `memory` - Bookkeeping-only provisioner
//! - `migrations` - Schema of a tenant database

mod database;
mod memory;
pub mod migrations;
mod postgres;
mod sqlite;

pub use database::{DatabaseManager, DatabaseProvisioner};
pub use memory::InMemoryProvisioner;
pub use postgres::PostgresDatabaseManager;
pub use sqlite::SqliteDatabaseManager;
