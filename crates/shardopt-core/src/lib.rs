//! # shardopt-core: Routing Conditions for a Sharding Middleware
//!
//! This crate holds the data model shared by the optimize engines: values, condition
//! trees, the parsed-statement model and the read-only rule views consulted while
//! optimizing a statement.
//!
//! ## Module Overview
//!
//! - **`value`**: `ScalarValue`, with structural equality and SQL comparison.
//! - **`condition`**: condition trees (AND/OR over column predicates) with
//!   `combine`, `optimize`, parameter binding and evaluation against a binding.
//! - **`statement`**: the closed statement union produced by the external parser.
//! - **`rule`**: sharding and encrypt rule traits plus in-memory implementations.
//! - **`keygen`**: key generators (snowflake, increment, uuid).
//! - **`encrypt`**: the encryptor trait and an MD5 digest encryptor.
//! - **`function`**: evaluation of SQL functions found in insert values.
//! - **`error`**: `OptimizeError`, the single error type of the optimize layer.

pub mod condition;
pub mod encrypt;
pub mod error;
pub mod function;
pub mod keygen;
pub mod rule;
pub mod statement;
pub mod value;

pub use error::{OptimizeError, Result};
