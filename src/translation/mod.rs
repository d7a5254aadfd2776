//! T-SQL to PostgreSQL rewriting.
//!
//! Literals, quoted identifiers, comments and `@name` placeholders are masked before any rule
//! runs, so a rule can never rewrite inside them:
//! ```rust
//! use legacy_sql_bridge::translation::rewrite;
//!
//! let sql = rewrite("SELECT TOP 10 id FROM logs WHERE note <> 'GETDATE()' ORDER BY id DESC")?;
//! assert_eq!(sql, "SELECT id FROM logs WHERE note <> 'GETDATE()' ORDER BY id DESC LIMIT 10");
//! # Ok::<(), legacy_sql_bridge::BridgeError>(())
//! ```

mod rebind;
mod rules;
mod scanner;

use tracing::trace;

use crate::error::BridgeError;

pub use rebind::{Rebound, rebind_named};
pub use rules::{Strategy, TranslationRule};

/// The ordered rule list `rewrite` applies.
#[must_use]
pub fn rules() -> &'static [TranslationRule] {
    rules::RULES.as_slice()
}

/// Rewrite source-dialect SQL into the target dialect.
///
/// Pure and idempotent: `rewrite(&rewrite(q)?)? == rewrite(q)?`.
///
/// # Errors
/// Returns `BridgeError::TranslationAmbiguity` when a construct has no faithful target
/// equivalent (`TOP ... PERCENT`, `TOP (expr)`, `OUTPUT ... INTO`).
pub fn rewrite(sql: &str) -> Result<String, BridgeError> {
    let masked = scanner::mask(sql);
    let mut text = masked.text.clone();
    for rule in rules() {
        let next = rule.apply(&text)?;
        if next != text {
            trace!(rule = rule.name(), "translation rule applied");
            text = next;
        }
    }
    Ok(masked.restore(&text))
}

/// `sql` with literals, comments and placeholders masked, for keyword checks on code only.
pub(crate) fn code_only(sql: &str) -> String {
    scanner::mask(sql).text
}

/// Append `clause` to the first statement in `sql`, before its `;` and any trailing comments.
pub(crate) fn append_clause(sql: &str, clause: &str) -> String {
    let masked = scanner::mask(sql);
    masked.restore(&rules::append_to_statement(&masked.text, 0, clause))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_top_with_order_by() {
        assert_eq!(
            rewrite("SELECT TOP 10 id FROM logs ORDER BY id DESC").unwrap(),
            "SELECT id FROM logs ORDER BY id DESC LIMIT 10"
        );
    }

    #[test]
    fn output_inserted_star() {
        assert_eq!(
            rewrite("INSERT INTO clients (name) OUTPUT INSERTED.* VALUES (@name)").unwrap(),
            "INSERT INTO clients (name) VALUES (@name) RETURNING *"
        );
    }

    #[test]
    fn trailing_comment_keeps_limit_executable() {
        assert_eq!(
            rewrite("SELECT TOP 2 * FROM t -- newest first").unwrap(),
            "SELECT * FROM t LIMIT 2 -- newest first"
        );
    }

    #[test]
    fn named_top_operand() {
        assert_eq!(
            rewrite("SELECT TOP (@n) * FROM t WHERE owner = @owner").unwrap(),
            "SELECT * FROM t WHERE owner = @owner LIMIT @n"
        );
    }

    #[test]
    fn literals_and_placeholders_are_untouched() {
        let sql = "UPDATE flags SET on_off = CAST(1 AS bit), note = 'nvarchar bit' WHERE owner = @bit";
        assert_eq!(
            rewrite(sql).unwrap(),
            "UPDATE flags SET on_off = CAST(1 AS BOOLEAN), note = 'nvarchar bit' WHERE owner = @bit"
        );
    }

    #[test]
    fn create_table_types() {
        let sql = "CREATE TABLE invoices (id INT IDENTITY(1,1) PRIMARY KEY, ref UNIQUEIDENTIFIER, \
                   title NVARCHAR(200), body NVARCHAR(MAX), paid BIT DEFAULT 0, \
                   issued DATETIME2(7) DEFAULT GETDATE(), synced DATETIMEOFFSET, pdf VARBINARY(MAX))";
        assert_eq!(
            rewrite(sql).unwrap(),
            "CREATE TABLE invoices (id SERIAL PRIMARY KEY, ref UUID, \
             title VARCHAR(200), body TEXT, paid BOOLEAN DEFAULT 0, \
             issued TIMESTAMP DEFAULT NOW(), synced TIMESTAMPTZ, pdf BYTEA)"
        );
    }

    #[test]
    fn function_aliases() {
        assert_eq!(
            rewrite("SELECT ISNULL(name, ''), LEN(name), GETUTCDATE() FROM t").unwrap(),
            "SELECT COALESCE(name, ''), LENGTH(name), (NOW() AT TIME ZONE 'UTC') FROM t"
        );
    }

    #[test]
    fn target_dialect_passes_through() {
        let sql = "SELECT id FROM t WHERE created_at < NOW() LIMIT 5";
        assert_eq!(rewrite(sql).unwrap(), sql);
    }

    #[test]
    fn appended_clause_stays_ahead_of_comments() {
        assert_eq!(
            append_clause("INSERT INTO t (a) VALUES ($1) -- note; RETURNING", "RETURNING *"),
            "INSERT INTO t (a) VALUES ($1) RETURNING * -- note; RETURNING"
        );
        assert_eq!(
            append_clause("INSERT INTO t (a) VALUES ('x;y');", "RETURNING id"),
            "INSERT INTO t (a) VALUES ('x;y') RETURNING id;"
        );
    }

    #[test]
    fn rules_are_exposed_in_order() {
        let names: Vec<&str> = rules().iter().map(TranslationRule::name).collect();
        assert_eq!(names.first(), Some(&"getdate"));
        assert!(names.contains(&"select-top"));
    }
}
