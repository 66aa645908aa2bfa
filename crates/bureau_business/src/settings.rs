//! Lazily resolved connection settings.

use std::sync::OnceLock;

/// Memoized per-wrapper settings: the connection string and the qualified
/// table name of the bound entity type.
///
/// Both values are computed once, on first use, from the wrapper's own
/// context. Keeping the cache on the instance keys it by (context, entity
/// type), so two wrappers over contexts with different connection strings
/// or schemas never see each other's values.
#[derive(Debug, Default)]
pub struct ConnectionSettings {
    connection: OnceLock<String>,
    table: OnceLock<String>,
}

impl ConnectionSettings {
    /// Creates an unresolved settings holder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the connection string, resolving it on first use.
    pub fn connection_string(&self, resolve: impl FnOnce() -> String) -> &str {
        self.connection.get_or_init(resolve)
    }

    /// Returns the qualified table name, resolving it on first use.
    pub fn table_name(&self, resolve: impl FnOnce() -> String) -> &str {
        self.table.get_or_init(resolve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn resolves_once() {
        let settings = ConnectionSettings::new();
        let calls = Cell::new(0);
        let resolve = || {
            calls.set(calls.get() + 1);
            "memory://x".to_string()
        };
        assert_eq!(settings.connection_string(resolve), "memory://x");
        assert_eq!(settings.connection_string(|| "other".to_string()), "memory://x");
        assert_eq!(calls.get(), 1);

        assert_eq!(settings.table_name(|| "app.orders".to_string()), "app.orders");
    }
}
