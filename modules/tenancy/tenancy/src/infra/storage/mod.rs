//! Central registry persistence.
//!
//! - `entity` - `SeaORM` entity of the `tenants` table
//! - `mapper` - Conversions between entity models and SDK types
//! - `migrations` - Registry schema migrations

pub mod entity;
pub mod mapper;
pub mod migrations;

mod sea_orm_repo;

pub use sea_orm_repo::SeaOrmTenantRepository;
