//! # Bureau SQL
//!
//! The raw-statement seam for bureau.
//!
//! This crate provides:
//! - The [`StatementExecutor`] trait that business layers use to run literal
//!   statements outside the tracked-entity path
//! - [`SqlValue`] parameter values
//! - Builders for the delete/count statements the business layer emits
//! - The minimal statement grammar understood by the reference in-memory
//!   executor
//!
//! The trait is the contract. The grammar in [`statement`] exists so the
//! reference executor can apply the statements the builders produce; it is
//! deliberately not a SQL engine.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod error;
pub mod executor;
pub mod statement;
pub mod value;

pub use builder::{count_statement, delete_by_key_statement, delete_where_statement};
pub use error::{SqlError, SqlResult};
pub use executor::StatementExecutor;
pub use statement::{parse_statement, Condition, Filter, Operand, Statement};
pub use value::SqlValue;
