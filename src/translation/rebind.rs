use std::collections::BTreeMap;

use super::scanner::find_named;

/// Result of turning `@name` placeholders into `$n` markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rebound {
    /// SQL with every resolved placeholder replaced.
    pub sql: String,
    /// Caller ordinals in positional order: `ordinals[0]` feeds `$1`.
    pub ordinals: Vec<usize>,
    /// Referenced names the lookup could not resolve, first occurrence order.
    pub unresolved: Vec<String>,
}

/// Replace `@name` placeholders with positional `$n` markers.
///
/// `lookup` maps a name to the ordinal the caller assigned it. Referenced ordinals are
/// renumbered densely in ordinal order, so bindings that never appear in the text leave no
/// gap. Names `lookup` does not know are left in the text untouched.
pub fn rebind_named<F>(sql: &str, lookup: F) -> Rebound
where
    F: Fn(&str) -> Option<usize>,
{
    let refs = find_named(sql);
    let resolved: Vec<Option<usize>> = refs.iter().map(|r| lookup(r.name)).collect();

    let mut positions: BTreeMap<usize, usize> = resolved.iter().flatten().map(|o| (*o, 0)).collect();
    for (idx, position) in positions.values_mut().enumerate() {
        *position = idx + 1;
    }

    let mut out = String::with_capacity(sql.len());
    let mut unresolved: Vec<String> = Vec::new();
    let mut cursor = 0;
    for (named, ordinal) in refs.iter().zip(&resolved) {
        out.push_str(&sql[cursor..named.range.start]);
        match ordinal.and_then(|o| positions.get(&o)) {
            Some(position) => {
                out.push('$');
                out.push_str(&position.to_string());
            }
            None => {
                out.push_str(&sql[named.range.clone()]);
                if !unresolved.iter().any(|n| n == named.name) {
                    unresolved.push(named.name.to_string());
                }
            }
        }
        cursor = named.range.end;
    }
    out.push_str(&sql[cursor..]);

    Rebound {
        sql: out,
        ordinals: positions.into_keys().collect(),
        unresolved,
    }
}
