//! Database layer
//!
//! The relational gateway for the blog store. It supports:
//! - SQLite (default, single-file deployment and in-memory tests)
//! - MySQL
//!
//! The driver is selected by configuration. Repositories in
//! [`repositories`] each own one table (or one join) and dispatch on
//! [`DatabasePool::handle`] to driver-specific SQL.
//!
//! ```ignore
//! use songngu::config::DatabaseConfig;
//! use songngu::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, PoolRef,
    SqliteDatabase,
};
