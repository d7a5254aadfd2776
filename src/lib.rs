//! Run code written for a named-parameter T-SQL client against PostgreSQL.
//!
//! Two call surfaces share one pooled executor:
//! - the legacy surface, [`Database::new_request`] then `bind(name, type, value)` and
//!   `execute(text)`, which rebinds `@name` to `$n`, rewrites T-SQL into PostgreSQL and
//!   returns `{ recordset, rowsAffected }`;
//! - the direct surface ([`Database::query`], `get_one`, `get_all`, `insert`, `update`,
//!   `remove`) for callers already writing PostgreSQL with positional markers.
//!
//! ```rust,no_run
//! use legacy_sql_bridge::prelude::*;
//!
//! # async fn run() -> Result<(), BridgeError> {
//! let db = Database::connect(&BridgeConfig::from_env()?)?;
//! let legacy = db
//!     .new_request()
//!     .bind("client", SqlType::Int, 42)
//!     .execute("SELECT TOP 10 id, title FROM projects WHERE client_id = @client")
//!     .await?;
//! let direct = db
//!     .get_one("SELECT name FROM clients WHERE id = $1", &[RowValues::Int(42)])
//!     .await?;
//! # let _ = (legacy, direct);
//! db.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod helpers;
pub mod pool;
pub mod postgres;
pub mod prelude;
pub mod request;
pub mod results;
pub mod translation;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use config::{BridgeConfig, PoolOptions};
pub use database::Database;
pub use error::BridgeError;
pub use pool::{ConnectionPool, EngineConnection, StatementExecutor};
pub use request::{Request, RewrittenQuery};
pub use results::{DbRow, LegacyResult, NativeResult, QueryResult};
pub use translation::rewrite;
pub use types::{RowValues, SqlType};
