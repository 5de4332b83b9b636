//! Drive search query construction.
//!
//! Every value is emitted as a quoted literal with `\` and `'` escaped, so
//! user-supplied names cannot break out of their clause.

use std::fmt;

/// A conjunction of Drive query clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveQuery {
    clauses: Vec<String>,
}

impl DriveQuery {
    /// Empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match files whose name is exactly `name`.
    pub fn name_equals(mut self, name: &str) -> Self {
        self.clauses.push(format!("name = {}", literal(name)));
        self
    }

    /// Exclude trashed files.
    pub fn not_trashed(mut self) -> Self {
        self.clauses.push("trashed = false".to_string());
        self
    }

    /// Restrict to direct children of `folder_id`.
    pub fn in_parent(mut self, folder_id: &str) -> Self {
        self.clauses.push(format!("{} in parents", literal(folder_id)));
        self
    }
}

impl fmt::Display for DriveQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clauses.join(" and "))
    }
}

/// Quote `value` as a Drive query string literal.
pub fn literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}
