//! # Server Configuration
//!
//! Two sources:
//!
//! - **Environment**: `SHARDOPT_LISTEN_ADDR` (default `0.0.0.0:3000`) and
//!   `SHARDOPT_RULES`, an optional path to the rule file.
//! - **Rule file** (YAML): sharded tables with their key generators, and encrypted
//!   columns with their encryptors.
//!
//! ```yaml
//! sharding:
//!   tables:
//!     - name: t_order
//!       sharding_columns: [user_id]
//!       key_column: order_id
//!       key_generator: { type: snowflake, worker_id: 3 }
//! encrypt:
//!   tables:
//!     - name: t_user
//!       columns:
//!         - name: pwd
//!           encryptor: md5
//!           assisted_query_column: pwd_assisted
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use shardopt_core::encrypt::{Encryptor, Md5Encryptor};
use shardopt_core::keygen::{
    IncrementKeyGenerator, KeyGenerator, SnowflakeKeyGenerator, UuidKeyGenerator, MAX_WORKER_ID,
};
use shardopt_core::rule::{EncryptColumn, InMemoryEncryptRule, InMemoryShardingRule, ShardingTable};
use std::fs;
use std::sync::Arc;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Process-level settings read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub rules_path: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("SHARDOPT_LISTEN_ADDR")
                .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string()),
            rules_path: std::env::var("SHARDOPT_RULES").ok(),
        }
    }

    /// The configured rules, or empty rules when no file is configured.
    pub fn load_rules(&self) -> Result<RuleConfig> {
        match &self.rules_path {
            Some(path) => RuleConfig::from_file(path),
            None => Ok(RuleConfig::default()),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RuleConfig {
    #[serde(default)]
    pub sharding: ShardingConfig,
    #[serde(default)]
    pub encrypt: EncryptConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct ShardingConfig {
    #[serde(default)]
    pub tables: Vec<ShardingTableConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ShardingTableConfig {
    pub name: String,
    #[serde(default)]
    pub sharding_columns: Vec<String>,
    pub key_column: Option<String>,
    pub key_generator: Option<KeyGeneratorConfig>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KeyGeneratorConfig {
    Snowflake {
        #[serde(default)]
        worker_id: u16,
    },
    Increment {
        #[serde(default = "default_increment_start")]
        start: i64,
    },
    Uuid,
}

fn default_increment_start() -> i64 {
    1
}

#[derive(Debug, Deserialize, Default)]
pub struct EncryptConfig {
    #[serde(default)]
    pub tables: Vec<EncryptTableConfig>,
}

#[derive(Debug, Deserialize)]
pub struct EncryptTableConfig {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<EncryptColumnConfig>,
}

#[derive(Debug, Deserialize)]
pub struct EncryptColumnConfig {
    pub name: String,
    pub encryptor: EncryptorKind,
    pub assisted_query_column: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EncryptorKind {
    Md5,
}

impl KeyGeneratorConfig {
    fn build(self, table: &str) -> Result<Arc<dyn KeyGenerator>> {
        Ok(match self {
            KeyGeneratorConfig::Snowflake { worker_id } => {
                if worker_id > MAX_WORKER_ID {
                    bail!(
                        "Snowflake worker_id {} for table {} exceeds {}",
                        worker_id,
                        table,
                        MAX_WORKER_ID
                    );
                }
                Arc::new(SnowflakeKeyGenerator::new(worker_id))
            }
            KeyGeneratorConfig::Increment { start } => Arc::new(IncrementKeyGenerator::new(start)),
            KeyGeneratorConfig::Uuid => Arc::new(UuidKeyGenerator),
        })
    }
}

impl EncryptorKind {
    fn build(self) -> Arc<dyn Encryptor> {
        match self {
            EncryptorKind::Md5 => Arc::new(Md5Encryptor),
        }
    }
}

impl RuleConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read rule file at {}", path))?;
        Self::from_yaml(&content).context(format!("Failed to parse rule file at {}", path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn sharding_rule(&self) -> Result<InMemoryShardingRule> {
        let mut rule = InMemoryShardingRule::new();
        for table in &self.sharding.tables {
            if table.key_generator.is_some() && table.key_column.is_none() {
                bail!("Table {} has a key_generator but no key_column", table.name);
            }
            let key_generator = table
                .key_generator
                .map(|g| g.build(&table.name))
                .transpose()?;
            rule.add_table(
                &table.name,
                ShardingTable {
                    sharding_columns: table.sharding_columns.clone(),
                    key_column: table.key_column.clone(),
                    key_generator,
                },
            );
        }
        Ok(rule)
    }

    pub fn encrypt_rule(&self) -> InMemoryEncryptRule {
        let mut rule = InMemoryEncryptRule::new();
        for table in &self.encrypt.tables {
            for column in &table.columns {
                rule.add_column(
                    &table.name,
                    &column.name,
                    EncryptColumn {
                        encryptor: column.encryptor.build(),
                        assisted_query_column: column.assisted_query_column.clone(),
                    },
                );
            }
        }
        rule
    }
}
