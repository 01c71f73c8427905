//! # Optimize Engines
//!
//! `OptimizeEngine` is the closed set of engines the factory can build. Each engine
//! does all of its work (and all of its validation) at construction, so holding an
//! engine means the statement has already been optimized successfully; `optimize`
//! only hands over the result.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::encrypt_insert::EncryptInsertOptimizeEngine;
use crate::insert::InsertOptimizeEngine;
use crate::query::QueryOptimizeEngine;
use crate::result::{InsertOptimizeResult, RoutingInput};

/// Engine for statements that need no encryption rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncryptDefaultOptimizeEngine;

#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeEngine {
    Insert(InsertOptimizeEngine),
    Query(QueryOptimizeEngine),
    EncryptInsert(EncryptInsertOptimizeEngine),
    EncryptDefault(EncryptDefaultOptimizeEngine),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineKind {
    Insert,
    Query,
    EncryptInsert,
    EncryptDefault,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineKind::Insert => "insert",
            EngineKind::Query => "query",
            EngineKind::EncryptInsert => "encrypt-insert",
            EngineKind::EncryptDefault => "encrypt-default",
        };
        f.write_str(name)
    }
}

/// What an engine produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptimizeResult {
    /// A single routing input for the whole statement.
    Query(RoutingInput),
    /// One unit per insert row.
    Insert(InsertOptimizeResult),
    /// Insert rows with encrypted columns rewritten.
    EncryptInsert(InsertOptimizeResult),
    /// The statement is left as it is.
    Unchanged,
}

impl OptimizeEngine {
    pub fn kind(&self) -> EngineKind {
        match self {
            OptimizeEngine::Insert(_) => EngineKind::Insert,
            OptimizeEngine::Query(_) => EngineKind::Query,
            OptimizeEngine::EncryptInsert(_) => EngineKind::EncryptInsert,
            OptimizeEngine::EncryptDefault(_) => EngineKind::EncryptDefault,
        }
    }

    pub fn optimize(self) -> OptimizeResult {
        match self {
            OptimizeEngine::Insert(engine) => OptimizeResult::Insert(engine.optimize()),
            OptimizeEngine::Query(engine) => OptimizeResult::Query(engine.optimize()),
            OptimizeEngine::EncryptInsert(engine) => {
                OptimizeResult::EncryptInsert(engine.optimize())
            }
            OptimizeEngine::EncryptDefault(_) => OptimizeResult::Unchanged,
        }
    }
}
