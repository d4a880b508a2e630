//! Common types shared by the compilers, the store layer and the façade.

mod constants;
mod policy;
mod sort_order;
mod value;

pub use constants::*;
pub use policy::*;
pub use sort_order::*;
pub use value::*;
