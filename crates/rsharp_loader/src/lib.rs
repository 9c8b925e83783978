//! # rsharp_loader - Native Library Loading
//!
//! Opens a native library at runtime and binds the destructors it exports
//! into a [`DropTable`](rsharp_core::DropTable), so handles to types
//! declared with [`native_type!`](rsharp_core::native_type) can free what
//! the library allocated.
//!
//! ## Overview
//!
//! The library exports one destructor per type, named after the type's
//! schema name (`rsharp__String__drop`), plus `rsharp__api_version`. A
//! [`LoaderConfig`] says where the library is and which types to bind.
//!
//! ## Example
//!
//! ```ignore
//! use rsharp_core::native_type;
//! use rsharp_loader::{NativeLibrary, TypeBinder};
//!
//! native_type! {
//!     pub struct NativeString => "String";
//! }
//!
//! let library = NativeLibrary::load("native.toml")?;
//! library.bind_global(&[TypeBinder::of::<NativeString>()])?;
//! ```

mod config;
mod error;
mod library;

pub use config::{LoaderConfig, DEFAULT_SYMBOL_PREFIX};
pub use error::{LoaderError, Result};
pub use library::{ApiVersionFn, NativeLibrary, TypeBinder};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::LoaderConfig;
    pub use crate::error::{LoaderError, Result};
    pub use crate::library::{NativeLibrary, TypeBinder};
}
