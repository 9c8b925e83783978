//! # rsharp_core - Cross-Language Handle Ownership
//!
//! Values created by a native library are handed to a host runtime as
//! opaque addresses. This crate wraps those addresses in handles that know
//! who is responsible for freeing them:
//! - **Owned**: the handle frees the value, exactly once
//! - **SharedRef**: a read-only borrow that never frees
//! - **MutRef**: a mutable borrow that never frees
//!
//! Misuse (access after dispose, stealing from a borrow, mutating through
//! a shared reference) is reported as a [`HandleError`] before any native
//! call is made.
//!
//! Two layers are provided. [`Handle`] carries the ownership mode at
//! runtime, as a binding layer sees it. [`Owned`], [`Ref`] and [`RefMut`]
//! encode the same rules in the type system for Rust callers.

pub mod dispatch;
pub mod error;
pub mod handle;
pub mod ledger;
pub mod naming;
pub mod owned;

pub use dispatch::{DropEntry, DropFn, DropTable, NativeType};
pub use error::{HandleError, Result};
pub use handle::{BorrowScope, Handle, HandleState, OwnershipMode, Ptr};
pub use ledger::OwnershipLedger;
pub use owned::{Owned, Ref, RefMut};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::dispatch::{DropTable, NativeType};
    pub use crate::error::{HandleError, Result};
    pub use crate::handle::{BorrowScope, Handle, HandleState, OwnershipMode, Ptr};
    pub use crate::owned::{Owned, Ref, RefMut};
}
