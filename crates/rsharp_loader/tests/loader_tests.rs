//! Integration tests for loader configuration and library binding

use rsharp_core::{native_type, DropTable};
use rsharp_loader::prelude::*;
use std::fs;

native_type! {
    pub struct Ticket => "Ticket";
}

#[test]
fn test_config_file_resolves_relative_library() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("native.toml");
    fs::write(
        &path,
        r#"
library = "lib/libnative.so"
symbol_prefix = "tp_client::object"
types = ["Ticket", "String"]
strict = false
"#,
    )
    .unwrap();

    let config = LoaderConfig::load(&path).unwrap();
    assert_eq!(config.library, dir.path().join("lib/libnative.so"));
    assert_eq!(config.symbol_prefix, "tp_client::object");
    assert_eq!(config.types, vec!["Ticket", "String"]);
    assert!(!config.strict);
    assert!(config.check_version);
}

#[test]
fn test_absolute_library_path_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let library = dir.path().join("libnative.so");
    let path = dir.path().join("native.toml");
    fs::write(&path, format!("library = {:?}\n", library.display().to_string())).unwrap();

    assert_eq!(LoaderConfig::load(&path).unwrap().library, library);
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = LoaderConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, LoaderError::Io(_)));
}

#[test]
fn test_malformed_config_is_config_error() {
    let err = LoaderConfig::from_toml_str("library = [").unwrap_err();
    assert!(matches!(err, LoaderError::Config(_)));

    let err = LoaderConfig::from_toml_str("library = \"x.so\"\nstrict = \"yes\"").unwrap_err();
    assert!(matches!(err, LoaderError::Config(_)));
}

#[test]
fn test_opening_without_library_is_config_error() {
    let err = NativeLibrary::open(LoaderConfig::default()).unwrap_err();
    assert!(matches!(err, LoaderError::Config(_)));
}

#[test]
fn test_nonexistent_library_is_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = LoaderConfig::new(dir.path().join("libmissing.so")).with_type("Ticket");

    match NativeLibrary::open(config) {
        Err(LoaderError::Load { path, .. }) => assert_eq!(path, dir.path().join("libmissing.so")),
        other => panic!("expected load error, got {:?}", other),
    }
}

/// The C library is always loadable and exports none of our symbols
#[cfg(all(target_os = "linux", target_env = "gnu"))]
mod foreign_library {
    use super::*;

    const LIBC: &str = "libc.so.6";

    #[test]
    fn test_missing_api_version_is_reported() {
        match NativeLibrary::open(LoaderConfig::new(LIBC)) {
            Err(LoaderError::SymbolNotFound { symbol, .. }) => assert_eq!(symbol, "rsharp__api_version"),
            other => panic!("expected missing symbol, got {:?}", other),
        }
    }

    fn unchecked(strict: bool) -> LoaderConfig {
        LoaderConfig {
            strict,
            check_version: false,
            ..LoaderConfig::new(LIBC).with_type("Ticket")
        }
    }

    #[test]
    fn test_strict_binding_fails_on_missing_destructor() {
        let library = NativeLibrary::open(unchecked(true)).unwrap();
        assert_eq!(library.api_version(), None);

        let mut table = DropTable::new();
        match library.bind_all(&[TypeBinder::of::<Ticket>()], &mut table) {
            Err(LoaderError::SymbolNotFound { symbol, .. }) => assert_eq!(symbol, "rsharp__Ticket__drop"),
            other => panic!("expected missing symbol, got {:?}", other),
        }
        assert!(table.is_empty());
    }

    #[test]
    fn test_lenient_binding_skips_missing_destructor() {
        let library = NativeLibrary::open(unchecked(false).with_type("Unlisted")).unwrap();

        let mut table = DropTable::new();
        let bound = library.bind_all(&[TypeBinder::of::<Ticket>()], &mut table).unwrap();
        assert_eq!(bound, 0);
        assert!(!table.contains("Ticket"));
    }

    #[test]
    fn test_strict_binding_fails_on_unknown_type() {
        let library = NativeLibrary::open(unchecked(true)).unwrap();

        let mut table = DropTable::new();
        match library.bind_all(&[], &mut table) {
            Err(LoaderError::UnknownType(name)) => assert_eq!(name, "Ticket"),
            other => panic!("expected unknown type, got {:?}", other),
        }
    }
}

/// The exporting library built from `rsharp_ffi`
mod exporting_library {
    use super::*;
    use rsharp_core::{dispatch, naming, Handle, HandleError, Ptr};
    use rsharp_ffi::ByteSlice;
    use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
    use std::path::PathBuf;

    native_type! {
        pub struct LoadedString => "String";
    }

    native_type! {
        pub struct LoadedBox => "Box_I32";
    }

    native_type! {
        /// Has a binder but no exported destructor
        pub struct Unexported => "Unexported";
    }

    type CopyUtf8Fn = unsafe extern "C" fn(*const u8, usize) -> *mut LoadedString;
    type ValueFn = unsafe extern "C" fn(*const LoadedString) -> ByteSlice;

    /// Find the cdylib cargo built next to this test binary
    fn cdylib_path() -> PathBuf {
        let exe = std::env::current_exe().unwrap();
        let deps = exe.parent().unwrap();
        let exact = format!("{}rsharp_ffi{}", DLL_PREFIX, DLL_SUFFIX);
        let hashed = format!("{}rsharp_ffi-", DLL_PREFIX);

        let mut found: Vec<PathBuf> = Vec::new();
        for dir in [deps, deps.parent().unwrap()] {
            let exact_path = dir.join(&exact);
            if exact_path.is_file() {
                return exact_path;
            }
            for entry in fs::read_dir(dir).unwrap().flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with(&hashed) && name.ends_with(DLL_SUFFIX) {
                    found.push(entry.path());
                }
            }
        }

        found
            .into_iter()
            .max_by_key(|path| fs::metadata(path).and_then(|m| m.modified()).ok())
            .unwrap_or_else(|| panic!("no {} built under {}", exact, deps.display()))
    }

    fn binders() -> [TypeBinder; 3] {
        [
            TypeBinder::of::<LoadedString>(),
            TypeBinder::of::<LoadedBox>(),
            TypeBinder::of::<Unexported>(),
        ]
    }

    #[test]
    fn test_bound_destructor_frees_through_global_table() {
        let library = NativeLibrary::open(LoaderConfig::new(cdylib_path()).with_type("String")).unwrap();
        assert_eq!(library.api_version(), Some(naming::ABI_VERSION));
        assert_eq!(library.bind_global(&binders()).unwrap(), 1);
        assert_eq!(
            dispatch::global().read().entry("String").unwrap().symbol,
            "rsharp__String__drop"
        );

        let copy_utf8: CopyUtf8Fn = unsafe { library.resolve("rsharp__String__copy_utf8") }.unwrap();
        let value: ValueFn = unsafe { library.resolve("rsharp__String__value") }.unwrap();

        let text = "loaded at runtime";
        let raw = unsafe { copy_utf8(text.as_ptr(), text.len()) };
        let mut handle = unsafe { Handle::owned(Ptr::new(raw)) };
        let bytes = unsafe { value(handle.access().unwrap().as_ptr()).as_slice().to_vec() };
        assert_eq!(bytes, text.as_bytes());

        // The global binding keeps the library mapped
        drop(library);
        handle.dispose().unwrap();
        handle.dispose().unwrap();
        assert!(matches!(handle.access(), Err(HandleError::UseAfterDispose { .. })));
    }

    #[test]
    fn test_load_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("native.toml");
        fs::write(
            &path,
            format!(
                "library = {:?}\ntypes = [\"String\", \"Box_I32\"]\n",
                cdylib_path().display().to_string()
            ),
        )
        .unwrap();

        let library = NativeLibrary::load(&path).unwrap();
        let mut table = DropTable::new();
        assert_eq!(library.bind_all(&binders(), &mut table).unwrap(), 2);
        assert_eq!(table.entry("Box_I32").unwrap().symbol, "rsharp__Box_I32__drop");
        assert!(table.resolve::<LoadedString>().is_ok());
    }

    #[test]
    fn test_strict_unknown_type_leaves_table_untouched() {
        let config = LoaderConfig::new(cdylib_path()).with_type("String").with_type("Nope");
        let library = NativeLibrary::open(config).unwrap();

        let mut table = DropTable::new();
        match library.bind_all(&binders(), &mut table) {
            Err(LoaderError::UnknownType(name)) => assert_eq!(name, "Nope"),
            other => panic!("expected unknown type, got {:?}", other),
        }
        assert!(table.is_empty());
    }

    #[test]
    fn test_strict_missing_symbol_leaves_table_untouched() {
        let config = LoaderConfig::new(cdylib_path())
            .with_type("Box_I32")
            .with_type("String")
            .with_type("Unexported");
        let library = NativeLibrary::open(config).unwrap();

        let mut table = DropTable::new();
        match library.bind_all(&binders(), &mut table) {
            Err(LoaderError::SymbolNotFound { symbol, .. }) => assert_eq!(symbol, "rsharp__Unexported__drop"),
            other => panic!("expected missing symbol, got {:?}", other),
        }
        assert!(table.is_empty());
    }

    #[test]
    fn test_lenient_binding_keeps_what_resolved() {
        let config = LoaderConfig {
            strict: false,
            ..LoaderConfig::new(cdylib_path())
                .with_type("String")
                .with_type("Nope")
                .with_type("Unexported")
                .with_type("Box_I32")
        };
        let library = NativeLibrary::open(config).unwrap();

        let mut table = DropTable::new();
        assert_eq!(library.bind_all(&binders(), &mut table).unwrap(), 2);
        assert_eq!(table.len(), 2);
        assert!(table.contains("String"));
        assert!(table.contains("Box_I32"));
        assert!(!table.contains("Unexported"));
    }
}
