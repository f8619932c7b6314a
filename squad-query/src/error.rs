//! Query errors.
//!
//! Building a filter or a statement never fails. Errors come from the
//! execution boundary (an engine meeting a statement), from reading records
//! into typed values, and from loading configuration.
//!
//! Every [`QueryError`] has a stable [`ErrorCode`] rendered as `S` plus four
//! digits, where the first digit is the [`ErrorCategory`]:
//!
//! | Range | Category |
//! |-------|----------|
//! | 1xxx  | query: missing rows, unknown tables or columns, bad projections |
//! | 6xxx  | data: values of the wrong type |
//! | 7xxx  | configuration |
//! | 9xxx  | internal |
//!
//! ```rust
//! use squad_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::not_unique("Member", 2).with_sql("SELECT member.* FROM member");
//! assert_eq!(err.code, ErrorCode::NotUnique);
//! assert_eq!(err.to_string(), "[S1002] Expected at most one Member record but found 2");
//! assert!(err.display_full().contains("SELECT member.* FROM member"));
//! ```

use std::fmt::{self, Write};

use thiserror::Error;

/// Result of anything that can fail with a [`QueryError`].
pub type QueryResult<T> = Result<T, QueryError>;

/// Broad class of an [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The statement could not be answered as written.
    Query,
    /// A value did not fit the requested type.
    Data,
    /// Settings could not be loaded.
    Configuration,
    /// A bug in this crate.
    Internal,
}

/// Stable, matchable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// A required row was missing (S1001).
    RecordNotFound = 1001,
    /// More than one row where at most one was expected (S1002).
    NotUnique = 1002,
    /// A filter could not be evaluated (S1003).
    InvalidFilter = 1003,
    /// A projection, grouping or label lookup is malformed (S1004).
    InvalidSelect = 1004,
    /// The table is not registered with the engine (S1005).
    UnknownTable = 1005,
    /// No table in the statement has the column (S1006).
    UnknownColumn = 1006,
    /// A value has the wrong type for the requested conversion (S6001).
    InvalidDataType = 6001,
    /// Settings are unreadable or malformed (S7001).
    InvalidConfiguration = 7001,
    /// Internal error (S9001).
    Internal = 9001,
}

impl ErrorCode {
    /// The code as printed, e.g. `S1006`.
    pub fn code(&self) -> String {
        format!("S{}", *self as u16)
    }

    /// The class this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match *self as u16 / 1000 {
            1 => ErrorCategory::Query,
            6 => ErrorCategory::Data,
            7 => ErrorCategory::Configuration,
            _ => ErrorCategory::Internal,
        }
    }

    /// One-line description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::NotUnique => "More than one record found",
            Self::InvalidFilter => "Filter cannot be evaluated",
            Self::InvalidSelect => "Invalid projection",
            Self::UnknownTable => "Unknown table",
            Self::UnknownColumn => "Unknown column",
            Self::InvalidDataType => "Unexpected value type",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", *self as u16)
    }
}

/// A hint attached to an error, optionally with a snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// What to try.
    pub text: String,
    /// A snippet showing it.
    pub code: Option<String>,
}

impl Suggestion {
    /// A text-only hint.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Attach a snippet.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Where an error happened.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// What was being done.
    pub operation: Option<String>,
    /// Table or entity involved.
    pub model: Option<String>,
    /// Column or label involved.
    pub field: Option<String>,
    /// The statement as rendered for the configured dialect.
    pub sql: Option<String>,
    /// Hints, in the order they were added.
    pub suggestions: Vec<Suggestion>,
    /// Closing help line.
    pub help: Option<String>,
}

/// An error raised while executing a statement or reading its results.
#[derive(Error, Debug)]
#[error("[{code}] {message}")]
pub struct QueryError {
    /// Stable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Where it happened.
    pub context: ErrorContext,
    /// Underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl QueryError {
    /// An error with no context.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Record the operation in progress.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Record the table or entity involved.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Record the column or label involved.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Record the rendered statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Add a hint.
    pub fn with_suggestion(mut self, text: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(text));
        self
    }

    /// Add a hint with a snippet.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Set the closing help line.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// `fetch_one_required` found nothing.
    pub fn not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {model} record found matching the query"),
        )
        .with_model(model)
        .with_code_suggestion(
            "Use fetch_one() to get None instead of an error",
            "query.select_from(&member).r#where(...).fetch_one().await",
        )
    }

    /// A single-row terminal found `found` rows.
    pub fn not_unique(model: impl Into<String>, found: usize) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::NotUnique,
            format!("Expected at most one {model} record but found {found}"),
        )
        .with_model(model)
        .with_suggestion("Narrow the filter to a single record")
        .with_suggestion("Use fetch() or fetch_first() when several rows are expected")
    }

    /// The engine has no table of this name.
    pub fn unknown_table(table: impl Into<String>) -> Self {
        let table = table.into();
        Self::new(ErrorCode::UnknownTable, format!("Table '{table}' is not registered"))
            .with_model(table)
            .with_suggestion("Register the table with the engine before querying it")
    }

    /// No table in the statement has this column.
    pub fn unknown_column(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(ErrorCode::UnknownColumn, format!("Column '{column}' does not exist"))
            .with_field(column)
            .with_suggestion("Check that the alias is joined into the query")
    }

    /// A filter cannot be evaluated.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFilter, message)
    }

    /// A projection, grouping or label lookup is malformed.
    pub fn invalid_select(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidSelect, message)
    }

    /// `field` held `found` where `expected` was asked for.
    pub fn type_mismatch(field: impl Into<String>, expected: &str, found: impl fmt::Debug) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::InvalidDataType,
            format!("Expected {expected} for '{field}', found {found:?}"),
        )
        .with_field(field)
    }

    /// Settings could not be loaded.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConfiguration,
            format!("Invalid configuration: {}", message.into()),
        )
        .with_help("See the [database], [query] and [debug] sections of squad.toml")
    }

    /// A bug in this crate.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message.into()))
    }

    /// Whether a required row was missing.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Whether a single-row terminal saw several rows.
    pub fn is_not_unique(&self) -> bool {
        self.code == ErrorCode::NotUnique
    }

    /// Whether a table or column is unknown.
    pub fn is_schema_error(&self) -> bool {
        matches!(self.code, ErrorCode::UnknownTable | ErrorCode::UnknownColumn)
    }

    /// Multi-line report with context, hints and help.
    pub fn display_full(&self) -> String {
        const MAX_SQL: usize = 200;

        let mut out = format!("Error [{}]: {}\n", self.code, self.message);
        let context = &self.context;
        for (label, value) in [
            ("While", &context.operation),
            ("Model", &context.model),
            ("Field", &context.field),
        ] {
            if let Some(value) = value {
                let _ = writeln!(out, "  → {label}: {value}");
            }
        }

        if let Some(sql) = &context.sql {
            match sql.char_indices().nth(MAX_SQL) {
                Some((cut, _)) => {
                    let _ = writeln!(out, "  → SQL: {}...", &sql[..cut]);
                }
                None => {
                    let _ = writeln!(out, "  → SQL: {sql}");
                }
            }
        }

        if !context.suggestions.is_empty() {
            out.push_str("\nSuggestions:\n");
            for (n, suggestion) in context.suggestions.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}", n + 1, suggestion.text);
                if let Some(code) = &suggestion.code {
                    for line in code.lines() {
                        let _ = writeln!(out, "     {line}");
                    }
                }
            }
        }

        if let Some(help) = &context.help {
            let _ = writeln!(out, "\nHelp: {help}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_codes_and_categories() {
        assert_eq!(ErrorCode::RecordNotFound.code(), "S1001");
        assert_eq!(ErrorCode::UnknownColumn.to_string(), "S1006");
        assert_eq!(ErrorCode::UnknownColumn.category(), ErrorCategory::Query);
        assert_eq!(ErrorCode::InvalidDataType.category(), ErrorCategory::Data);
        assert_eq!(
            ErrorCode::InvalidConfiguration.category(),
            ErrorCategory::Configuration
        );
        assert_eq!(ErrorCode::Internal.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_not_found() {
        let err = QueryError::not_found("Member");
        assert!(err.is_not_found());
        assert_eq!(err.context.model.as_deref(), Some("Member"));
        assert!(err.context.suggestions[0].code.is_some());
    }

    #[test]
    fn test_not_unique() {
        let err = QueryError::not_unique("Member", 3);
        assert!(err.is_not_unique());
        assert_eq!(
            err.to_string(),
            "[S1002] Expected at most one Member record but found 3"
        );
    }

    #[test]
    fn test_schema_errors() {
        assert!(QueryError::unknown_table("ghost").is_schema_error());
        assert!(QueryError::unknown_column("member.height").is_schema_error());
        assert!(!QueryError::internal("boom").is_schema_error());
    }

    #[test]
    fn test_display_full() {
        let err = QueryError::unknown_column("team.motto")
            .with_context("evaluating WHERE")
            .with_sql("SELECT member.* FROM member WHERE team.motto = $1");

        let output = err.display_full();
        assert!(output.starts_with("Error [S1006]: Column 'team.motto' does not exist\n"));
        assert!(output.contains("  → While: evaluating WHERE\n"));
        assert!(output.contains("  → Field: team.motto\n"));
        assert!(output.contains("  1. Check that the alias is joined into the query\n"));
        assert!(!output.contains("Model"));
    }

    #[test]
    fn test_display_full_truncates_long_sql() {
        let sql = format!("SELECT {} FROM member", "member.age, ".repeat(40));
        let output = QueryError::internal("x").with_sql(sql).display_full();
        let line = output
            .lines()
            .find(|l| l.contains("SQL:"))
            .unwrap();
        assert!(line.ends_with("..."));
    }

    #[test]
    fn test_source_is_kept() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = QueryError::invalid_configuration("squad.toml not readable").with_source(io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
