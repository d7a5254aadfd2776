//! Direct helpers for callers that already write PostgreSQL with `$n` markers.
//!
//! No translation and no named bindings: the text and values go to the executor as given.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::database::Database;
use crate::error::BridgeError;
use crate::pool::StatementExecutor;
use crate::results::{DbRow, QueryResult, normalize};
use crate::translation::{append_clause, code_only};
use crate::types::RowValues;

static RETURNING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bRETURNING\b").expect("static returning pattern"));

impl<E: StatementExecutor> Database<E> {
    /// Run `sql` and return `{ rows, rowCount }`.
    ///
    /// # Errors
    /// Pool errors, or `Execution` carrying the engine's error.
    pub async fn query(&self, sql: &str, values: &[RowValues]) -> Result<QueryResult, BridgeError> {
        debug!(sql, params = values.len(), "direct query");
        let native = self.executor().execute(sql, values).await?;
        Ok(normalize(native))
    }

    /// All rows `sql` returns.
    ///
    /// # Errors
    /// As [`query`](Self::query).
    pub async fn get_all(&self, sql: &str, values: &[RowValues]) -> Result<Vec<DbRow>, BridgeError> {
        Ok(self.query(sql, values).await?.rows)
    }

    /// The first row, or `None` when nothing matches.
    ///
    /// # Errors
    /// As [`query`](Self::query); zero rows is not an error.
    pub async fn get_one(
        &self,
        sql: &str,
        values: &[RowValues],
    ) -> Result<Option<DbRow>, BridgeError> {
        Ok(self.query(sql, values).await?.rows.into_iter().next())
    }

    /// Run an `INSERT` and return the inserted row.
    ///
    /// ` RETURNING *` is appended unless the statement already has a `RETURNING` clause. It
    /// goes before a terminating `;` and any trailing comments.
    ///
    /// # Errors
    /// As [`query`](Self::query).
    pub async fn insert(
        &self,
        sql: &str,
        values: &[RowValues],
    ) -> Result<Option<DbRow>, BridgeError> {
        let sql = with_returning(sql);
        self.get_one(&sql, values).await
    }

    /// Run an `UPDATE` and return the number of rows it touched.
    ///
    /// # Errors
    /// As [`query`](Self::query).
    pub async fn update(&self, sql: &str, values: &[RowValues]) -> Result<u64, BridgeError> {
        Ok(self.query(sql, values).await?.row_count)
    }

    /// Run a `DELETE` and return the number of rows it removed.
    ///
    /// # Errors
    /// As [`query`](Self::query).
    pub async fn remove(&self, sql: &str, values: &[RowValues]) -> Result<u64, BridgeError> {
        Ok(self.query(sql, values).await?.row_count)
    }
}

fn with_returning(sql: &str) -> String {
    if RETURNING.is_match(&code_only(sql)) {
        return sql.to_string();
    }
    append_clause(sql, "RETURNING *")
}
