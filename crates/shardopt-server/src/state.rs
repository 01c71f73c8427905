//! # Application State
//!
//! Shared by all request handlers via `Arc`. The rules are built once at startup from
//! the rule file and never change while the server runs. Key generators inside the
//! sharding rule keep their own counters, so concurrent requests share them safely.

use shardopt_core::rule::{InMemoryEncryptRule, InMemoryShardingRule};
use std::sync::Arc;

use crate::config::RuleConfig;

pub struct AppState {
    /// Sharding columns, key columns and key generators per logical table.
    pub sharding_rule: Arc<InMemoryShardingRule>,
    /// Encryptors and assisted-query columns per logical table.
    pub encrypt_rule: Arc<InMemoryEncryptRule>,
}

impl AppState {
    pub fn new(sharding_rule: InMemoryShardingRule, encrypt_rule: InMemoryEncryptRule) -> Self {
        Self {
            sharding_rule: Arc::new(sharding_rule),
            encrypt_rule: Arc::new(encrypt_rule),
        }
    }

    pub fn from_config(config: &RuleConfig) -> anyhow::Result<Self> {
        Ok(Self::new(config.sharding_rule()?, config.encrypt_rule()))
    }
}
