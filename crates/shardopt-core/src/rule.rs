//! # Rule Views
//!
//! The optimize layer consults two kinds of read-only configuration:
//!
//! - **Sharding rule**: which columns shard each logical table, which column holds a
//!   generated key, and which key generator produces it.
//! - **Encrypt rule**: which columns of each table are encrypted, with which
//!   encryptor, and which companion column receives the assisted-query value.
//!
//! Both are traits behind `&dyn` so that the surrounding middleware can back them with
//! its own rule objects. `InMemoryShardingRule` / `InMemoryEncryptRule` are simple
//! HashMap-based implementations used by the server and the tests. Table and column
//! names are matched case-insensitively, as SQL identifiers are.

use crate::encrypt::Encryptor;
use crate::keygen::KeyGenerator;
use std::collections::HashMap;
use std::sync::Arc;

/// Sharding configuration lookups.
pub trait ShardingRule: Send + Sync {
    /// Columns the table is sharded on (database and table strategies combined).
    fn sharding_columns(&self, table: &str) -> &[String];
    /// Column that receives a generated key, if the table has one.
    fn generate_key_column(&self, table: &str) -> Option<&str>;
    /// Generator for the table's key column, if configured.
    fn key_generator(&self, table: &str) -> Option<&dyn KeyGenerator>;
}

/// Encryption configuration lookups.
pub trait EncryptRule: Send + Sync {
    fn encryptor(&self, table: &str, column: &str) -> Option<&dyn Encryptor>;
    fn assisted_query_column(&self, table: &str, column: &str) -> Option<&str>;
}

/// Sharding configuration of one logical table.
#[derive(Clone, Default)]
pub struct ShardingTable {
    pub sharding_columns: Vec<String>,
    pub key_column: Option<String>,
    pub key_generator: Option<Arc<dyn KeyGenerator>>,
}

/// In-memory sharding rule keyed by lower-cased table name.
#[derive(Clone, Default)]
pub struct InMemoryShardingRule {
    tables: HashMap<String, ShardingTable>,
}

impl InMemoryShardingRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: &str, config: ShardingTable) {
        self.tables.insert(table.to_ascii_lowercase(), config);
    }

    pub fn table(&self, table: &str) -> Option<&ShardingTable> {
        self.tables.get(&table.to_ascii_lowercase())
    }

    /// Configured table names, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ShardingRule for InMemoryShardingRule {
    fn sharding_columns(&self, table: &str) -> &[String] {
        self.table(table)
            .map(|t| t.sharding_columns.as_slice())
            .unwrap_or(&[])
    }

    fn generate_key_column(&self, table: &str) -> Option<&str> {
        self.table(table)?.key_column.as_deref()
    }

    fn key_generator(&self, table: &str) -> Option<&dyn KeyGenerator> {
        self.table(table)?.key_generator.as_deref()
    }
}

/// Encryption configuration of one column.
#[derive(Clone)]
pub struct EncryptColumn {
    pub encryptor: Arc<dyn Encryptor>,
    pub assisted_query_column: Option<String>,
}

/// In-memory encrypt rule keyed by lower-cased table and column names.
#[derive(Clone, Default)]
pub struct InMemoryEncryptRule {
    tables: HashMap<String, HashMap<String, EncryptColumn>>,
}

impl InMemoryEncryptRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column(&mut self, table: &str, column: &str, config: EncryptColumn) {
        self.tables
            .entry(table.to_ascii_lowercase())
            .or_default()
            .insert(column.to_ascii_lowercase(), config);
    }

    fn column(&self, table: &str, column: &str) -> Option<&EncryptColumn> {
        self.tables
            .get(&table.to_ascii_lowercase())?
            .get(&column.to_ascii_lowercase())
    }

    /// Configured table names, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl EncryptRule for InMemoryEncryptRule {
    fn encryptor(&self, table: &str, column: &str) -> Option<&dyn Encryptor> {
        self.column(table, column).map(|c| c.encryptor.as_ref())
    }

    fn assisted_query_column(&self, table: &str, column: &str) -> Option<&str> {
        self.column(table, column)?.assisted_query_column.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encrypt::Md5Encryptor;
    use crate::keygen::IncrementKeyGenerator;

    #[test]
    fn test_sharding_lookups_ignore_case() {
        let mut rule = InMemoryShardingRule::new();
        rule.add_table(
            "T_ORDER",
            ShardingTable {
                sharding_columns: vec!["user_id".into()],
                key_column: Some("order_id".into()),
                key_generator: Some(Arc::new(IncrementKeyGenerator::default())),
            },
        );
        assert_eq!(rule.sharding_columns("t_order"), ["user_id".to_string()]);
        assert_eq!(rule.generate_key_column("t_Order"), Some("order_id"));
        assert!(rule.key_generator("t_order").is_some());
        assert!(rule.sharding_columns("t_user").is_empty());
        assert_eq!(rule.table_names(), vec!["t_order"]);
    }

    #[test]
    fn test_encrypt_lookups() {
        let mut rule = InMemoryEncryptRule::new();
        rule.add_column(
            "t_user",
            "pwd",
            EncryptColumn {
                encryptor: Arc::new(Md5Encryptor),
                assisted_query_column: Some("pwd_assisted".into()),
            },
        );
        assert!(rule.encryptor("t_user", "PWD").is_some());
        assert!(rule.encryptor("t_user", "name").is_none());
        assert_eq!(rule.assisted_query_column("t_user", "pwd"), Some("pwd_assisted"));
    }
}
