//! Query filters and their translation into SQL predicates.
//!
//! A filter is a [Document](crate::collection::Document) in a MongoDB-like
//! shape. Keys are either field paths or logical combinators:
//!
//! - `{field: scalar}` - equality (`null` means `IS NULL`)
//! - `{field: {op: operand, ...}}` - comparison operators `eq`, `ne`, `gt`,
//!   `gte`, `lt`, `lte`, `in`, `nin`, `not`, `exists`
//! - `{and: [f1, f2]}`, `{or: [..]}`, `{nor: [..]}`, `{not: f}` - combinators
//!
//! Operator and combinator names may carry a leading `$`. Entries at one
//! level are AND-ed. The empty filter matches every document.
//!
//! Filters can be written with `doc!` or the fluent API:
//!
//! ```rust
//! use docsql::doc;
//! use docsql::filter::{and, field};
//!
//! let by_hand = doc!{ and: [ { age: { gt: 30 } }, { status: "active" } ] };
//! let fluent = and(vec![field("age").gt(30), field("status").eq("active")]);
//! assert_eq!(by_hand, fluent);
//! ```

mod fluent;
mod predicate;

pub use fluent::*;
pub use predicate::*;
pub(crate) use predicate::PredicateCompiler;
