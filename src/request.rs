//! The legacy `bind(name, type, value)` / `execute(text)` call shape.
//!
//! A [`Request`] is created per logical call, owned by the calling task and consumed by
//! [`Request::execute`], so it cannot be reused once it has run.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::error::BridgeError;
use crate::pool::StatementExecutor;
use crate::results::{LegacyResult, normalize_legacy};
use crate::translation::{rebind_named, rewrite};
use crate::types::{RowValues, SqlType};

/// Rewritten statement text and the positional values it expects.
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenQuery {
    /// Target-dialect SQL with `$n` markers.
    pub sql: String,
    /// `params[0]` binds to `$1`.
    pub params: Vec<RowValues>,
}

#[derive(Debug, Clone)]
struct Binding {
    declared: SqlType,
    value: RowValues,
}

/// Accumulates named bindings for one statement.
///
/// ```rust,no_run
/// use legacy_sql_bridge::prelude::*;
///
/// # async fn run(db: &Database<PgPool>) -> Result<(), BridgeError> {
/// let result = db
///     .new_request()
///     .bind("name", SqlType::NVarChar, "alice")
///     .bind("active", SqlType::Bit, true)
///     .execute("SELECT TOP 5 * FROM users WHERE name = @name AND active = @active")
///     .await?;
/// println!("{} rows", result.recordset.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Request<'a, E: StatementExecutor + ?Sized> {
    executor: &'a E,
    next_ordinal: usize,
    name_to_ordinal: HashMap<String, usize>,
    values_by_ordinal: BTreeMap<usize, Binding>,
    strict: bool,
}

impl<'a, E: StatementExecutor + ?Sized> Request<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        Self {
            executor,
            next_ordinal: 1,
            name_to_ordinal: HashMap::new(),
            values_by_ordinal: BTreeMap::new(),
            strict: false,
        }
    }

    /// Bind `value` to `@name`. A leading `@` on `name` is ignored.
    ///
    /// The first bind of a name assigns the next ordinal; binding the same name again
    /// replaces its value and keeps the ordinal.
    #[must_use]
    pub fn bind(mut self, name: &str, declared: SqlType, value: impl Into<RowValues>) -> Self {
        let name = name.strip_prefix('@').unwrap_or(name);
        let value = value.into();
        let ordinal = match self.name_to_ordinal.get(name) {
            Some(ordinal) => *ordinal,
            None => {
                let ordinal = self.next_ordinal;
                self.next_ordinal += 1;
                self.name_to_ordinal.insert(name.to_string(), ordinal);
                ordinal
            }
        };
        trace!(name, ordinal, ?declared, "bind");
        self.values_by_ordinal
            .insert(ordinal, Binding { declared, value });
        self
    }

    /// Fail with `UnresolvedParameter` instead of sending a statement that still references
    /// an unbound `@name`.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Declared type recorded for `name`, if bound.
    #[must_use]
    pub fn declared_type(&self, name: &str) -> Option<SqlType> {
        let name = name.strip_prefix('@').unwrap_or(name);
        self.name_to_ordinal
            .get(name)
            .and_then(|o| self.values_by_ordinal.get(o))
            .map(|b| b.declared)
    }

    /// Rebind and translate `sql` without running it.
    ///
    /// # Errors
    /// `TranslationAmbiguity` from the rule set, or `UnresolvedParameter` in strict mode.
    pub fn prepare(&self, sql: &str) -> Result<RewrittenQuery, BridgeError> {
        let rebound = rebind_named(sql, |name| self.name_to_ordinal.get(name).copied());
        if self.strict && !rebound.unresolved.is_empty() {
            return Err(BridgeError::UnresolvedParameter(rebound.unresolved.join(", ")));
        }
        let params = rebound
            .ordinals
            .iter()
            .map(|o| {
                self.values_by_ordinal
                    .get(o)
                    .map_or(RowValues::Null, |b| b.value.clone())
            })
            .collect();
        Ok(RewrittenQuery {
            sql: rewrite(&rebound.sql)?,
            params,
        })
    }

    /// Rewrite `sql`, run it on the executor and reshape the result.
    ///
    /// # Errors
    /// Anything [`prepare`](Self::prepare) returns, plus pool errors and `Execution`
    /// carrying the engine's own error.
    pub async fn execute(self, sql: &str) -> Result<LegacyResult, BridgeError> {
        let query = self.prepare(sql)?;
        debug!(sql = %query.sql, params = query.params.len(), "executing request");
        let native = self.executor.execute(&query.sql, &query.params).await?;
        Ok(normalize_legacy(native))
    }
}
