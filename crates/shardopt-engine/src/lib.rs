//! # Sharding Optimize Engines
//!
//! Turns a parsed statement, its bound parameters and the active rule into the
//! routing-ready structure the shard router and SQL rewriter consume.
//!
//! ## Module Overview
//!
//! - **`factory`**: The two entry points, [`new_sharding_engine`] and
//!   [`new_encrypt_engine`], plus the MERGE condition folding.
//! - **`engine`**: The closed [`OptimizeEngine`] union and its [`OptimizeResult`].
//! - **`generated_key`**: Surrogate-key resolution for inserts.
//! - **`insert`** / **`query`**: The sharding engines.
//! - **`encrypt_insert`**: Cipher rewriting of insert values.
//! - **`result`**: Routing inputs and per-row insert units.
//!
//! ## Usage
//!
//! ```ignore
//! let key = GeneratedKey::resolve(&rule, &insert, &parameters)?;
//! let engine = new_sharding_engine(&rule, &statement, &parameters, key.as_ref())?;
//! match engine.optimize() {
//!     OptimizeResult::Insert(rows) => route_rows(rows),
//!     OptimizeResult::Query(routing) => route(routing),
//!     _ => unreachable!("sharding engines never produce encrypt results"),
//! }
//! ```

pub mod encrypt_insert;
pub mod engine;
pub mod factory;
pub mod generated_key;
pub mod insert;
pub mod query;
pub mod result;
mod rows;

pub use engine::{EngineKind, OptimizeEngine, OptimizeResult};
pub use factory::{
    merge_condition, new_encrypt_engine, new_encrypt_engine_with, new_sharding_engine,
    new_sharding_engine_with,
};
pub use generated_key::GeneratedKey;
pub use result::{InsertOptimizeResult, InsertOptimizeUnit, RoutingInput};
