//! # Cost Store
//!
//! 以 SQLite 實作的成本資料來源

pub mod db;
pub mod error;
pub mod sqlite;

pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteSource;
