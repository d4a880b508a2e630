//! Transaction sessions.
//!
//! A [Session] owns one connection checked out of the adapter's pool for the
//! lifetime of a transaction. The façade's `with_transaction` wraps the
//! begin, commit or rollback, and release sequence around a unit of work:
//!
//! ```rust,ignore
//! db.with_transaction(|session| async move {
//!     accounts.update_one_in(&session, doc!{ id: "a" }, doc!{ inc: { balance: (-10) } }).await?;
//!     accounts.update_one_in(&session, doc!{ id: "b" }, doc!{ inc: { balance: 10 } }).await?;
//!     Ok(())
//! })
//! .await?;
//! ```

mod session;

pub use session::*;
