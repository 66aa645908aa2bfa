//! Builders for the literal statements the business layer emits.

/// Builds a key-targeted delete: `DELETE FROM t WHERE a = ? AND b = ?`.
///
/// One positional placeholder per key column, in declaration order.
#[must_use]
pub fn delete_by_key_statement(table: &str, key_columns: &[&str]) -> String {
    let conditions = key_columns
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ");
    format!("DELETE FROM {table} WHERE {conditions}")
}

/// Builds a filtered delete with a caller-supplied filter string.
///
/// The filter is embedded verbatim; whether it is acceptable is the
/// executor's concern.
#[must_use]
pub fn delete_where_statement(table: &str, filter: &str) -> String {
    format!("DELETE FROM {table} WHERE {filter}")
}

/// Builds a row-count query, optionally filtered.
#[must_use]
pub fn count_statement(table: &str, filter: Option<&str>) -> String {
    match filter {
        Some(filter) => format!("SELECT COUNT(*) FROM {table} WHERE {filter}"),
        None => format!("SELECT COUNT(*) FROM {table}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::parse_statement;

    #[test]
    fn builds_single_key_delete() {
        let sql = delete_by_key_statement("customers", &["id"]);
        assert_eq!(sql, "DELETE FROM customers WHERE id = ?");
        parse_statement(&sql).unwrap();
    }

    #[test]
    fn builds_composite_key_delete() {
        let sql = delete_by_key_statement("archive.notes", &["tenant", "id"]);
        assert_eq!(
            sql,
            "DELETE FROM archive.notes WHERE tenant = ? AND id = ?"
        );
        parse_statement(&sql).unwrap();
    }

    #[test]
    fn builds_filtered_delete() {
        let sql = delete_where_statement("customers", "active = FALSE");
        assert_eq!(sql, "DELETE FROM customers WHERE active = FALSE");
        parse_statement(&sql).unwrap();
    }

    #[test]
    fn builds_count() {
        parse_statement(&count_statement("customers", None)).unwrap();
        parse_statement(&count_statement("customers", Some("active = TRUE"))).unwrap();
    }
}
