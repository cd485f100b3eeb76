// =====================================================
// SQL UTILITIES MODULE
// Identifier quoting, placeholders and validation
// =====================================================

use crate::db_types::DatabaseType;
use regex::Regex;
use std::sync::LazyLock;

static PLAIN_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$#]*$").expect("identifier pattern"));

pub fn quote_identifier_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

pub fn quote_identifier_ansi(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn quote_column_name(db_type: &DatabaseType, column: &str) -> String {
    match db_type {
        DatabaseType::MySQL => quote_identifier_mysql(column),
        _ => quote_identifier_ansi(column),
    }
}

pub fn quote_table_name(db_type: &DatabaseType, table: &str) -> String {
    match db_type {
        DatabaseType::MySQL => quote_identifier_mysql(table),
        _ => quote_identifier_ansi(table),
    }
}

/// Positional bind placeholder, 1-based.
pub fn placeholder(db_type: &DatabaseType, position: usize) -> String {
    match db_type {
        DatabaseType::PostgreSQL => format!("${}", position),
        _ => "?".to_string(),
    }
}

/// Structural sanity check applied beneath the schema allow-list. Names
/// arriving from caller-selected metadata still must not smuggle quoting
/// or statement text into synthesized SQL.
pub fn is_plain_identifier(name: &str) -> bool {
    PLAIN_IDENTIFIER.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_mysql() {
        assert_eq!(quote_identifier_mysql("NAME"), "`NAME`");
        assert_eq!(quote_identifier_mysql("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_quote_identifier_ansi() {
        assert_eq!(quote_identifier_ansi("NAME"), "\"NAME\"");
        assert_eq!(quote_identifier_ansi("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_placeholder_per_backend() {
        assert_eq!(placeholder(&DatabaseType::MySQL, 1), "?");
        assert_eq!(placeholder(&DatabaseType::SQLite, 3), "?");
        assert_eq!(placeholder(&DatabaseType::PostgreSQL, 2), "$2");
    }

    #[test]
    fn test_is_plain_identifier() {
        assert!(is_plain_identifier("RSRC_ID"));
        assert!(is_plain_identifier("_hidden"));
        assert!(is_plain_identifier("COL$1"));
        assert!(!is_plain_identifier("1col"));
        assert!(!is_plain_identifier("name; DROP TABLE x"));
        assert!(!is_plain_identifier(""));
    }
}
