//! Shared SQL helpers for catalog repositories.
//!
//! # Responsibility
//! - Verify that a connection carries the tables a repository reads.
//! - Validate identifiers before they are stored.
//! - Translate catalog masks into `LIKE` patterns.

use crate::repo::error::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::Connection;

/// Table name plus the columns a repository depends on.
pub(crate) type TableSpec = (&'static str, &'static [&'static str]);

/// Fails with `MissingRequiredTable`/`MissingRequiredColumn` on schema drift.
pub(crate) fn ensure_tables_ready(conn: &Connection, tables: &[TableSpec]) -> RepoResult<()> {
    for &(table, columns) in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

/// Trims and validates one identifier.
///
/// Blank values and control characters are rejected.
pub(crate) fn normalize_identifier(field: &str, value: &str) -> RepoResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepoError::InvalidInput(format!("{field} cannot be empty")));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(RepoError::InvalidInput(format!(
            "{field} cannot contain control characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Offices are stored upper-case.
pub(crate) fn normalize_office(office_id: &str) -> RepoResult<String> {
    normalize_identifier("office_id", office_id).map(|office| office.to_ascii_uppercase())
}

/// Trims optional free text, mapping blank values to `None`.
pub(crate) fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Converts a catalog mask into a `LIKE` pattern using `\` as escape.
///
/// `*` matches any run of characters and `?` exactly one; `%`, `_` and `\`
/// are matched literally.
pub fn mask_to_like(mask: &str) -> String {
    let mut pattern = String::with_capacity(mask.len());
    for ch in mask.trim().chars() {
        match ch {
            '*' => pattern.push('%'),
            '?' => pattern.push('_'),
            '%' | '_' | '\\' => {
                pattern.push('\\');
                pattern.push(ch);
            }
            other => pattern.push(other),
        }
    }
    pattern
}

/// Appends `AND <column> LIKE ? ESCAPE '\'` for a non-blank mask.
pub(crate) fn push_mask_filter(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    column: &str,
    mask: Option<&str>,
) {
    let Some(mask) = mask.map(str::trim).filter(|value| !value.is_empty()) else {
        return;
    };
    sql.push_str(&format!(" AND {column} LIKE ? ESCAPE '\\'"));
    bind_values.push(Value::Text(mask_to_like(mask)));
}

/// Appends a case-insensitive office equality filter.
pub(crate) fn push_office_filter(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    column: &str,
    office_id: Option<&str>,
) {
    let Some(office) = office_id.map(str::trim).filter(|value| !value.is_empty()) else {
        return;
    };
    sql.push_str(&format!(" AND {column} = ? COLLATE NOCASE"));
    bind_values.push(Value::Text(office.to_string()));
}

pub(crate) fn limit_value(limit: u32) -> Value {
    Value::Integer(i64::from(limit))
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{mask_to_like, normalize_identifier, normalize_office, normalize_text};
    use crate::repo::error::RepoError;

    #[test]
    fn mask_wildcards_translate_to_like_wildcards() {
        assert_eq!(mask_to_like("KEYS*"), "KEYS%");
        assert_eq!(mask_to_like("Elev?Flow"), "Elev_Flow");
        assert_eq!(mask_to_like(" * "), "%");
    }

    #[test]
    fn mask_escapes_like_metacharacters() {
        assert_eq!(mask_to_like("100%_done"), "100\\%\\_done");
        assert_eq!(mask_to_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn identifiers_are_trimmed_and_control_characters_rejected() {
        assert_eq!(
            normalize_identifier("group_id", "  Flow Gages ").expect("valid id"),
            "Flow Gages"
        );
        let err = normalize_identifier("group_id", "a\u{1f}b").expect_err("delimiter rejected");
        assert!(matches!(err, RepoError::InvalidInput(_)));
        let err = normalize_identifier("group_id", "   ").expect_err("blank rejected");
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn office_is_upper_cased_and_blank_text_dropped() {
        assert_eq!(normalize_office("swt").expect("valid office"), "SWT");
        assert_eq!(normalize_text(Some("   ")), None);
        assert_eq!(normalize_text(Some(" note ")), Some("note".to_string()));
    }
}
