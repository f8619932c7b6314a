//! Parameterized SQL rendering.
//!
//! Statements render themselves into a [`SqlBuilder`], which owns the text,
//! the bound values and the dialect's placeholder style. Identifiers are
//! quoted only when they collide with a keyword or contain anything besides
//! ASCII letters, digits and underscores.

use std::borrow::Cow;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::filter::Value;

/// Keywords that must be quoted when used as identifiers. Kept sorted.
const KEYWORDS: &[&str] = &[
    "all", "and", "as", "between", "by", "case", "check", "cross", "default", "delete",
    "distinct", "else", "end", "except", "from", "group", "having", "in", "index", "inner",
    "insert", "intersect", "into", "is", "join", "key", "left", "like", "limit", "not", "null",
    "offset", "on", "or", "order", "outer", "right", "select", "set", "table", "then", "union",
    "update", "user", "using", "values", "when", "where",
];

fn is_keyword(name: &str) -> bool {
    KEYWORDS
        .binary_search(&name.to_ascii_lowercase().as_str())
        .is_ok()
}

/// Whether `name` has to be quoted to be read as an identifier.
pub fn needs_quoting(name: &str) -> bool {
    name.is_empty()
        || is_keyword(name)
        || name
            .bytes()
            .any(|b| !(b.is_ascii_alphanumeric() || b == b'_'))
}

/// Quote `name` unconditionally, doubling embedded quotes.
pub fn escape_identifier(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for ch in name.chars() {
        if ch == '"' {
            quoted.push('"');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// `name` as written when it is a plain identifier, quoted otherwise.
pub fn quote_identifier(name: &str) -> Cow<'_, str> {
    if needs_quoting(name) {
        Cow::Owned(escape_identifier(name))
    } else {
        Cow::Borrowed(name)
    }
}

/// Quote each segment of a dotted `alias.column` path.
pub fn quote_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for (i, segment) in path.split('.').enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(&quote_identifier(segment));
    }
    out
}

/// SQL dialect. Only the placeholder style differs between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// Numbered placeholders: `$1`, `$2`, ...
    #[default]
    PostgreSQL,
    /// Positional `?` placeholders.
    MySQL,
    /// Positional `?` placeholders.
    SQLite,
}

impl DatabaseType {
    /// Write the placeholder for the 1-based parameter `index`.
    fn write_placeholder(self, out: &mut String, index: usize) {
        match self {
            Self::PostgreSQL => {
                let _ = write!(out, "${index}");
            }
            Self::MySQL | Self::SQLite => out.push('?'),
        }
    }

    /// The placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        let mut out = String::new();
        self.write_placeholder(&mut out, index);
        out
    }
}

/// Accumulates SQL text and its bound values.
///
/// Nested filters and sub-selects render into the same builder, so
/// placeholders stay numbered in the order their values were bound.
#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
    dialect: DatabaseType,
    sql: String,
    params: Vec<Value>,
}

impl SqlBuilder {
    /// An empty builder for `dialect`.
    pub fn new(dialect: DatabaseType) -> Self {
        Self {
            dialect,
            sql: String::with_capacity(128),
            params: Vec::new(),
        }
    }

    /// An empty PostgreSQL builder.
    pub fn postgres() -> Self {
        Self::new(DatabaseType::PostgreSQL)
    }

    /// An empty MySQL builder.
    pub fn mysql() -> Self {
        Self::new(DatabaseType::MySQL)
    }

    /// An empty SQLite builder.
    pub fn sqlite() -> Self {
        Self::new(DatabaseType::SQLite)
    }

    /// The dialect this builder renders for.
    pub fn db_type(&self) -> DatabaseType {
        self.dialect
    }

    /// Append raw SQL.
    pub fn push(&mut self, sql: impl AsRef<str>) -> &mut Self {
        self.sql.push_str(sql.as_ref());
        self
    }

    /// Bind `value` and append its placeholder.
    pub fn push_param(&mut self, value: impl Into<Value>) -> &mut Self {
        self.params.push(value.into());
        self.dialect.write_placeholder(&mut self.sql, self.params.len());
        self
    }

    /// Append an identifier, quoted when needed.
    pub fn push_identifier(&mut self, name: &str) -> &mut Self {
        self.sql.push_str(&quote_identifier(name));
        self
    }

    /// Append a dotted column path, quoting segments when needed.
    pub fn push_path(&mut self, path: &str) -> &mut Self {
        self.sql.push_str(&quote_path(path));
        self
    }

    /// Append `table alias`, or just `table` when the alias is the table name.
    pub fn push_table(&mut self, table: &str, alias: &str) -> &mut Self {
        self.push_identifier(table);
        if table != alias {
            self.sql.push(' ');
            self.push_identifier(alias);
        }
        self
    }

    /// The SQL rendered so far.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The values bound so far.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Finish, returning the SQL and its values in placeholder order.
    pub fn build(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}
