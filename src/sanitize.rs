//! Path safety for archive entry names and metadata-derived file names.

use std::path::{Component, PathBuf};

/// Turn a stored entry name into a path relative to the extraction root.
///
/// Both `/` and `\` count as separators since archives built on Windows
/// often use the latter. `.` segments are dropped. Returns `Err` with a
/// reason when the name is absolute, carries a drive prefix or climbs out
/// with `..`. An empty result (e.g. `./`) is returned as `Ok` with an empty
/// path and is left to the caller to skip.
pub fn entry_relative_path(name: &str) -> Result<PathBuf, &'static str> {
    if name.contains('\0') {
        return Err("contains a NUL byte");
    }

    let unified = name.replace('\\', "/");
    if unified.starts_with('/') {
        return Err("is an absolute path");
    }

    let mut relative = PathBuf::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err("escapes the target directory"),
            s if s.contains(':') => return Err("contains a drive or stream separator"),
            s => relative.push(s),
        }
    }

    // Whatever the platform's own parser makes of it must still be plain
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err("is not a plain relative path");
    }

    Ok(relative)
}

/// Check that `value` can be used as exactly one path component.
pub fn validate_component(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("must not be empty".to_string());
    }
    if value == "." || value == ".." {
        return Err(format!("`{value}` is not a valid name"));
    }
    if let Some(c) = value
        .chars()
        .find(|c| matches!(c, '/' | '\\' | ':' | '\0'))
    {
        return Err(format!("must not contain {c:?}"));
    }
    Ok(())
}
