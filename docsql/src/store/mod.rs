//! The adapter seam between the compilers and a relational engine.
//!
//! Adapter crates implement [DocumentStoreAdapter] over a native driver;
//! the façade only ever talks to `Arc<dyn DocumentStoreAdapter>`.

mod adapter;
#[cfg(test)]
pub(crate) mod fake_adapter;

pub use adapter::*;
