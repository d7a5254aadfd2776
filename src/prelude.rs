//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::{BridgeConfig, PoolOptions};
pub use crate::database::Database;
pub use crate::error::BridgeError;
pub use crate::pool::{ConnectionPool, EngineConnection, StatementExecutor};
pub use crate::postgres::PgPool;
pub use crate::request::{Request, RewrittenQuery};
pub use crate::results::{DbRow, LegacyResult, NativeResult, QueryResult};
pub use crate::translation::rewrite;
pub use crate::types::{RowValues, SqlType};
