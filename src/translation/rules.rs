use std::sync::LazyLock;

use regex::Regex;

use super::scanner::{COMMENT_TOKEN, NAMED_TOKEN};
use crate::error::BridgeError;

/// How a rule turns a match into target-dialect text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Plain regex substitution of every match.
    Template(&'static str),
    /// `SELECT TOP n` becomes `SELECT ... LIMIT n`.
    RowLimit,
    /// `OUTPUT INSERTED.x` becomes a trailing `RETURNING x`.
    Returning,
}

/// One source-to-target rewrite. Rules are built once and never change.
#[derive(Debug)]
pub struct TranslationRule {
    name: &'static str,
    pattern: Regex,
    strategy: Strategy,
}

impl TranslationRule {
    fn new(name: &'static str, pattern: &str, strategy: Strategy) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("static translation rule pattern"),
            strategy,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Apply this rule to masked SQL.
    pub(crate) fn apply(&self, text: &str) -> Result<String, BridgeError> {
        match self.strategy {
            Strategy::Template(replacement) => {
                Ok(self.pattern.replace_all(text, replacement).into_owned())
            }
            Strategy::RowLimit => rewrite_row_limits(&self.pattern, text),
            Strategy::Returning => rewrite_output_clauses(&self.pattern, text),
        }
    }
}

const IDENTITY_SEED: &str = r"(?:\s*\(\s*\d+\s*,\s*\d+\s*\))?";
const OUTPUT_COLUMN: &str = r"(?:INSERTED|DELETED)\.(?:\*|[A-Za-z_][A-Za-z0-9_]*)";

pub(crate) static RULES: LazyLock<Vec<TranslationRule>> = LazyLock::new(|| {
    use Strategy::{Returning, RowLimit, Template};

    vec![
        // 1. current timestamp and scalar function aliases
        TranslationRule::new("getdate", r"(?i)\bGETDATE\s*\(\s*\)", Template("NOW()")),
        TranslationRule::new("sysdatetime", r"(?i)\bSYSDATETIME\s*\(\s*\)", Template("NOW()")),
        TranslationRule::new(
            "getutcdate",
            r"(?i)\bGETUTCDATE\s*\(\s*\)",
            Template("(NOW() AT TIME ZONE 'UTC')"),
        ),
        TranslationRule::new("isnull", r"(?i)\bISNULL\s*\(", Template("COALESCE(")),
        TranslationRule::new("len", r"(?i)\bLEN\s*\(", Template("LENGTH(")),
        // 2. row limit, before anything else touches the TOP clause
        TranslationRule::new(
            "select-top",
            r"(?i)((?:^|;)\s*SELECT(?:\s+DISTINCT)?)\s+TOP\b",
            RowLimit,
        ),
        // 3. output clause
        TranslationRule::new(
            "output-inserted",
            &format!(r"(?i)\s*\bOUTPUT\s+({OUTPUT_COLUMN}(?:\s*,\s*{OUTPUT_COLUMN})*)"),
            Returning,
        ),
        // 4. identity columns
        TranslationRule::new(
            "bigint-identity",
            &format!(r"(?i)\bBIGINT\s+IDENTITY\b{IDENTITY_SEED}"),
            Template("BIGSERIAL"),
        ),
        TranslationRule::new(
            "smallint-identity",
            &format!(r"(?i)\b(?:SMALL|TINY)INT\s+IDENTITY\b{IDENTITY_SEED}"),
            Template("SMALLSERIAL"),
        ),
        TranslationRule::new(
            "int-identity",
            &format!(r"(?i)\bINT(?:EGER)?\s+IDENTITY\b{IDENTITY_SEED}"),
            Template("SERIAL"),
        ),
        TranslationRule::new(
            "identity",
            r"(?i)\bIDENTITY\s*\(\s*\d+\s*,\s*\d+\s*\)",
            Template("GENERATED BY DEFAULT AS IDENTITY"),
        ),
        // 5. type names
        TranslationRule::new("varchar-max", r"(?i)\bN?VARCHAR\s*\(\s*MAX\s*\)", Template("TEXT")),
        TranslationRule::new(
            "varbinary",
            r"(?i)\bVARBINARY\b(?:\s*\(\s*(?:MAX|\d+)\s*\))?",
            Template("BYTEA"),
        ),
        TranslationRule::new("ntext", r"(?i)\bNTEXT\b", Template("TEXT")),
        TranslationRule::new("nvarchar", r"(?i)\bNVARCHAR\b", Template("VARCHAR")),
        TranslationRule::new("nchar", r"(?i)\bNCHAR\b", Template("CHAR")),
        TranslationRule::new("bit", r"(?i)\bBIT\b", Template("BOOLEAN")),
        TranslationRule::new(
            "datetime",
            r"(?i)\b(?:SMALLDATETIME|DATETIME2|DATETIME)\b(?:\s*\(\s*\d+\s*\))?",
            Template("TIMESTAMP"),
        ),
        TranslationRule::new(
            "datetimeoffset",
            r"(?i)\bDATETIMEOFFSET\b(?:\s*\(\s*\d+\s*\))?",
            Template("TIMESTAMPTZ"),
        ),
        TranslationRule::new("uniqueidentifier", r"(?i)\bUNIQUEIDENTIFIER\b", Template("UUID")),
        TranslationRule::new("tinyint", r"(?i)\bTINYINT\b", Template("SMALLINT")),
    ]
});

static LIMIT_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?:\d+|\$\d+|{NAMED_TOKEN})$")).expect("static limit value pattern")
});

static LIMIT_MODIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:PERCENT\b|WITH\s+TIES\b)").expect("static limit modifier pattern")
});

static OUTPUT_INTO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s+INTO\b").expect("static output into pattern"));

static OUTPUT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:INSERTED|DELETED)\.").expect("static output prefix pattern")
});

static TRAILING_FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?:\s|{COMMENT_TOKEN})*$")).expect("static trailing filler pattern")
});

/// Byte offset inside `statement` where a trailing clause belongs: after the last
/// executable token, before trailing whitespace and comments.
fn clause_insertion_point(statement: &str) -> usize {
    TRAILING_FILLER
        .find(statement)
        .map_or(statement.len(), |m| m.start())
}

/// Insert `clause` at the end of the statement that starts at `from` in `text`.
pub(crate) fn append_to_statement(text: &str, from: usize, clause: &str) -> String {
    let end = text[from..].find(';').map_or(text.len(), |pos| from + pos);
    let insert_at = from + clause_insertion_point(&text[from..end]);
    let mut out = String::with_capacity(text.len() + clause.len() + 1);
    out.push_str(&text[..insert_at]);
    out.push(' ');
    out.push_str(clause);
    out.push_str(&text[insert_at..]);
    out
}

/// Split the operand that follows `TOP`: `5`, `(5)`, `($1)`, ... Returns the trimmed
/// operand and the offset just past it.
fn take_limit_operand(rest: &str) -> Option<(&str, usize)> {
    let skipped = rest.len() - rest.trim_start().len();
    let body = &rest[skipped..];
    if let Some(inner) = body.strip_prefix('(') {
        let close = inner.find(')')?;
        Some((inner[..close].trim(), skipped + close + 2))
    } else {
        let len = body
            .find(|c: char| c.is_whitespace() || c == ';' || c == ',' || c == '(')
            .unwrap_or(body.len());
        Some((&body[..len], skipped + len))
    }
}

fn rewrite_row_limits(pattern: &Regex, text: &str) -> Result<String, BridgeError> {
    let mut current = text.to_string();
    while let Some(caps) = pattern.captures(&current) {
        let (Some(whole), Some(head)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let after_top = whole.end();
        let (operand, consumed) = take_limit_operand(&current[after_top..]).ok_or_else(|| {
            BridgeError::TranslationAmbiguity("TOP clause has an unterminated operand".into())
        })?;
        if !LIMIT_VALUE.is_match(operand) {
            return Err(BridgeError::TranslationAmbiguity(format!(
                "TOP operand `{operand}` is not a literal or parameter"
            )));
        }
        let rest_start = after_top + consumed;
        if LIMIT_MODIFIER.is_match(&current[rest_start..]) {
            return Err(BridgeError::TranslationAmbiguity(
                "TOP ... PERCENT / WITH TIES has no LIMIT equivalent".into(),
            ));
        }

        let clause = format!("LIMIT {operand}");
        let mut stripped = String::with_capacity(current.len());
        stripped.push_str(&current[..head.end()]);
        let rest = &current[rest_start..];
        if !rest.starts_with(char::is_whitespace) {
            stripped.push(' ');
        }
        stripped.push_str(rest);
        current = append_to_statement(&stripped, head.end(), &clause);
    }
    Ok(current)
}

fn rewrite_output_clauses(pattern: &Regex, text: &str) -> Result<String, BridgeError> {
    let mut current = text.to_string();
    while let Some(caps) = pattern.captures(&current) {
        let (Some(whole), Some(list)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        if OUTPUT_INTO.is_match(&current[whole.end()..]) {
            return Err(BridgeError::TranslationAmbiguity(
                "OUTPUT ... INTO has no RETURNING equivalent".into(),
            ));
        }
        let columns = OUTPUT_PREFIX
            .replace_all(list.as_str(), "")
            .split(',')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(", ");
        let clause = format!("RETURNING {columns}");

        let mut stripped = String::with_capacity(current.len());
        stripped.push_str(&current[..whole.start()]);
        stripped.push_str(&current[whole.end()..]);
        current = append_to_statement(&stripped, whole.start(), &clause);
    }
    Ok(current)
}
