//! Dynamic library loading and destructor binding
//!
//! Handles opening a native library, checking its API version, and
//! resolving the destructors named in the config into a [`DropTable`].

use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result};
use libloading::{Library, Symbol};
use rsharp_core::dispatch::{self, DropFn, DropTable, NativeType};
use rsharp_core::naming;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;

/// Signature of the exported API version function
pub type ApiVersionFn = unsafe extern "C" fn() -> u32;

/// Binds the destructor of one native type
///
/// The config names types by schema name; a binder connects that name to
/// the Rust type the table is keyed on.
#[derive(Clone, Copy)]
pub struct TypeBinder {
    name: &'static str,
    bind: fn(&NativeLibrary, &mut DropTable) -> Result<()>,
}

impl TypeBinder {
    /// Binder for `T`
    pub fn of<T: NativeType>() -> Self {
        Self {
            name: T::NAME,
            bind: NativeLibrary::bind::<T>,
        }
    }

    /// Schema name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for TypeBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeBinder({})", self.name)
    }
}

/// An opened native library
///
/// Every destructor bound from the library pins it, so the code stays
/// mapped until the last binding is replaced or removed, even after this
/// value is dropped.
pub struct NativeLibrary {
    library: Arc<Library>,
    config: LoaderConfig,
    api_version: Option<u32>,
}

impl NativeLibrary {
    /// Open the library named in `config`
    pub fn open(config: LoaderConfig) -> Result<Self> {
        config.validate()?;
        let path = config.library.clone();

        // Safety: running the library's initializers is the caller's trust decision
        let library = unsafe { Library::new(&path).map_err(|e| LoaderError::load(&path, e.to_string()))? };

        let mut native = Self {
            library: Arc::new(library),
            config,
            api_version: None,
        };

        if native.config.check_version {
            let version = native.query_api_version()?;
            if version != naming::ABI_VERSION {
                return Err(LoaderError::VersionMismatch {
                    library_version: version,
                    expected_version: naming::ABI_VERSION,
                });
            }
            native.api_version = Some(version);
        }

        log::info!(
            "Loaded native library '{}' with symbol prefix '{}'",
            path.display(),
            native.config.symbol_prefix
        );

        Ok(native)
    }

    /// Read a config file and open the library it names
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        Self::open(LoaderConfig::load(config_path)?)
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config.library
    }

    /// Version reported by the library, if it was checked
    pub fn api_version(&self) -> Option<u32> {
        self.api_version
    }

    fn query_api_version(&self) -> Result<u32> {
        let symbol = naming::api_version_symbol(&self.config.symbol_prefix);
        // Safety: the symbol is declared with this signature on the native side
        let version_fn: ApiVersionFn = unsafe { self.resolve(&symbol)? };
        Ok(unsafe { version_fn() })
    }

    /// Look up an exported function
    ///
    /// # Safety
    /// `F` must match the exported signature. The function must not be
    /// called once this value and every destructor bound from it are gone,
    /// since the library is unloaded then.
    pub unsafe fn resolve<F: Copy>(&self, symbol: &str) -> Result<F> {
        let mut name = Vec::with_capacity(symbol.len() + 1);
        name.extend_from_slice(symbol.as_bytes());
        name.push(0);

        let func: Symbol<F> = self
            .library
            .get(&name)
            .map_err(|_| LoaderError::symbol_not_found(self.config.library.display().to_string(), symbol))?;
        Ok(*func)
    }

    /// Bind the destructor exported for `T` into `table`
    pub fn bind<T: NativeType>(&self, table: &mut DropTable) -> Result<()> {
        let symbol = naming::drop_symbol(&self.config.symbol_prefix, T::NAME);
        // Safety: destructors are exported as `extern "C" fn(*mut T)`
        let drop_fn: DropFn = unsafe { self.resolve(&symbol)? };

        let keepalive: Arc<dyn Any + Send + Sync> = self.library.clone();
        log::debug!("Bound {} to '{}'", T::NAME, symbol);
        table.bind_pinned::<T>(symbol, drop_fn, keepalive);
        Ok(())
    }

    /// Bind every type listed in the config
    ///
    /// Returns how many destructors were bound. In strict mode the first
    /// unknown type or missing symbol is an error and `table` is left as it
    /// was; otherwise it is logged and skipped.
    pub fn bind_all(&self, binders: &[TypeBinder], table: &mut DropTable) -> Result<usize> {
        let mut staged = DropTable::new();
        let mut bound = 0;

        for name in &self.config.types {
            let Some(binder) = binders.iter().find(|b| b.name == name.as_str()) else {
                if self.config.strict {
                    return Err(LoaderError::UnknownType(name.clone()));
                }
                log::warn!("No binder for type '{}', skipping", name);
                continue;
            };

            match (binder.bind)(self, &mut staged) {
                Ok(()) => bound += 1,
                Err(e @ LoaderError::SymbolNotFound { .. }) if !self.config.strict => {
                    log::warn!("{}, skipping", e);
                }
                Err(e) => return Err(e),
            }
        }

        table.merge(staged);
        log::info!(
            "Bound {}/{} destructors from '{}'",
            bound,
            self.config.types.len(),
            self.config.library.display()
        );
        Ok(bound)
    }

    /// [`bind_all`](Self::bind_all) into the process-wide table
    pub fn bind_global(&self, binders: &[TypeBinder]) -> Result<usize> {
        let mut table = dispatch::global().write();
        self.bind_all(binders, &mut table)
    }
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.config.library)
            .field("symbol_prefix", &self.config.symbol_prefix)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl Drop for NativeLibrary {
    fn drop(&mut self) {
        let pins = Arc::strong_count(&self.library) - 1;
        if pins == 0 {
            log::debug!("Unloading native library '{}'", self.config.library.display());
        } else {
            log::debug!(
                "Releasing native library '{}', still pinned by {} bindings",
                self.config.library.display(),
                pins
            );
        }
    }
}
