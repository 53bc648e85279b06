use std::path::{Path, PathBuf};

pub const PACKAGE_SUFFIXES: [&str; 3] = [".tar.gz", ".tgz", ".targz"];

/// Appends `.tar.gz` unless the name already carries a package suffix.
pub fn normalize_package_name(name: &str) -> String {
    if PACKAGE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        name.to_string()
    } else {
        format!("{name}.tar.gz")
    }
}

/// `label` right-aligned to 15 columns, e.g. `"          added: a.txt"`.
pub fn op_line(label: &str, subject: &str) -> String {
    format!("{label:>15}: {subject}")
}

pub fn canonical_or_self(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
