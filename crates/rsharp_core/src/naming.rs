//! Exported symbol naming
//!
//! Both sides of the boundary derive symbol names from the same scheme:
//! module path segments joined by `__`, then the schema type name, then
//! the operation. `rsharp` + `Box_I32` + `drop` is `rsharp__Box_I32__drop`.

/// Constructor operation
pub const OP_NEW: &str = "new";
/// Destructor operation
pub const OP_DROP: &str = "drop";

/// Version of the exported function set. Bumped whenever a signature changes.
pub const ABI_VERSION: u32 = 1;

/// Turn a `::`-separated path into a symbol prefix
///
/// Every segment is followed by `__`; empty segments are skipped.
pub fn mangle_path(path: &str) -> String {
    let mut result = String::with_capacity(path.len() + 2);
    for segment in path.split("::") {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        result.push_str(segment);
        result.push_str("__");
    }
    result
}

/// Symbol for an operation on a type
pub fn symbol(path: &str, type_name: &str, op: &str) -> String {
    format!("{}{}__{}", mangle_path(path), type_name, op)
}

/// Symbol of the destructor for a type
pub fn drop_symbol(path: &str, type_name: &str) -> String {
    symbol(path, type_name, OP_DROP)
}

/// Symbol of the function reporting [`ABI_VERSION`]
pub fn api_version_symbol(path: &str) -> String {
    format!("{}api_version", mangle_path(path))
}
