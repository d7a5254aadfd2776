use std::time::Duration;

use thiserror::Error;

use crate::types::RowValues;

/// Boxed native error raised by the target engine's driver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// No connection became free within the configured connect timeout.
    #[error("Pool timeout: no connection available within {waited:?}")]
    PoolTimeout { waited: Duration },

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("Connection acquisition cancelled")]
    Cancelled,

    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The engine rejected the statement. `source` is the driver's error, untouched.
    #[error("SQL execution error: {source}")]
    Execution {
        #[source]
        source: BoxError,
        sql: String,
        params: Vec<RowValues>,
    },

    #[error("Statement did not complete within {0:?}")]
    StatementTimeout(Duration),

    #[error("Translation ambiguity: {0}")]
    TranslationAmbiguity(String),

    #[error("Unresolved parameter(s): {0}")]
    UnresolvedParameter(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BridgeError {
    /// The driver error carried by an `Execution` failure.
    #[must_use]
    pub fn native_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            BridgeError::Execution { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// The PostgreSQL server error (SQLSTATE, message, detail) behind an `Execution` failure.
    #[must_use]
    pub fn db_error(&self) -> Option<&tokio_postgres::error::DbError> {
        self.native_error()?
            .downcast_ref::<tokio_postgres::Error>()?
            .as_db_error()
    }

    /// Rewritten statement text and positional values for an `Execution` failure.
    #[must_use]
    pub fn statement(&self) -> Option<(&str, &[RowValues])> {
        match self {
            BridgeError::Execution { sql, params, .. } => Some((sql.as_str(), params.as_slice())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_error_keeps_native_source() {
        let native: BoxError = Box::new(std::io::Error::other("relation \"users\" does not exist"));
        let err = BridgeError::Execution {
            source: native,
            sql: "SELECT * FROM users WHERE id = $1".into(),
            params: vec![RowValues::Int(7)],
        };

        assert_eq!(
            err.to_string(),
            "SQL execution error: relation \"users\" does not exist"
        );
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<std::io::Error>().is_some());
        let (sql, params) = err.statement().unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE id = $1");
        assert_eq!(params, &[RowValues::Int(7)]);
        assert!(err.db_error().is_none());
    }

    #[test]
    fn non_execution_errors_have_no_statement() {
        let err = BridgeError::PoolTimeout {
            waited: Duration::from_millis(250),
        };
        assert!(err.native_error().is_none());
        assert!(err.statement().is_none());
    }
}
