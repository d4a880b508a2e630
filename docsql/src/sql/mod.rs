//! SQL text generation shared by the compilers and the adapters.

pub mod ddl;
mod dialect;

pub use dialect::*;
