//! HRE Core - Core abstractions and traits for the research data tools
//!
//! This crate provides the fundamental traits and types that all other
//! HRE crates depend on. It defines:
//!
//! - `DatabaseDriver` - Trait for database driver implementations
//! - `Connection` - Trait for database connections
//! - `SchemaIntrospection` - Trait for catalog inspection
//! - Common types like `Value`, `Row`, `ColumnMeta`, etc.
//!
//! Every call is synchronous and runs to completion on the calling thread.

mod connection;
mod driver;
mod error;
mod schema;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use schema::*;
pub use types::*;
