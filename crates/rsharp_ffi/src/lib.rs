//! # rsharp_ffi - Native Side of the Boundary
//!
//! Exports the C ABI a host runtime binds against. Every exported type has
//! a constructor, a destructor, and accessors, named by the scheme in
//! [`rsharp_core::naming`]:
//!
//! ```text
//! rsharp__Box_I32__new      rsharp__String__copy_utf8   rsharp__RVec_I32__new
//! rsharp__Box_I32__get      rsharp__String__value       rsharp__RVec_I32__get
//! rsharp__Box_I32__set      rsharp__Box_String__new     rsharp__RVec_I32__push
//! rsharp__Box_I32__drop     rsharp__String__drop        rsharp__RVec_I32__drop
//! ```
//!
//! Boxes and vectors are exported for every primitive: `U8` through `U64`,
//! `I8` through `I64`, `Bool`, `F32` and `F64`.
//!
//! Destructors accept only pointers returned by the matching constructor
//! and ignore null. Functions that take a boxed item (`push`, `set`)
//! consume it; the caller must steal it from its handle first.
//!
//! The [`bindings`] module wraps the exports in [`rsharp_core::Handle`]s,
//! the way a host-language binding layer does.
//!
//! ## Example
//!
//! ```ignore
//! use rsharp_ffi::{RBox, RVecI32};
//!
//! let mut vec = RVecI32::new();
//! let mut item = RBox::new(7);
//! vec.push(&mut item)?;          // item is stolen, not freed
//! assert!(item.get().is_err());  // use after steal
//! ```

pub mod bindings;
pub mod boxes;
pub mod ffi;
pub mod string;
pub mod vec;

pub use bindings::{RBox, RString, RStringBox, RVec, RVecI32};
pub use boxes::{BoxValue, Boxed, StringBox};
pub use ffi::{ByteSlice, SYMBOL_PATH};
pub use string::NativeString;
pub use vec::{NativeVec, NativeVecI32, VecValue};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bindings::{RBox, RString, RStringBox, RVec, RVecI32};
    pub use crate::boxes::{BoxValue, Boxed};
    pub use crate::vec::VecValue;
    pub use rsharp_core::prelude::*;
}
