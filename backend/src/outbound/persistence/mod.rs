//! PostgreSQL persistence adapters using Diesel.
//!
//! Adapters translate between Diesel rows and domain types and hold no
//! business rules. Row structs (`models.rs`) and table definitions
//! (`schema.rs`) stay private to this module. Deadlines are applied by the
//! domain services, not here.
//!
//! ```ignore
//! use pastebin::outbound::persistence::{DbPool, DieselPasteRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/pastebin")).await?;
//! let pastes = DieselPasteRepository::new(pool);
//! ```

mod diesel_paste_repository;
mod diesel_permission_store;
mod diesel_token_repository;
mod diesel_user_repository;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_paste_repository::DieselPasteRepository;
pub use diesel_permission_store::DieselPermissionStore;
pub use diesel_token_repository::DieselTokenRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
