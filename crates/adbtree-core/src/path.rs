//! Remote path helpers.
//!
//! Device paths are `/`-separated absolute strings, independent of the host
//! platform's `std::path` conventions. Directory nodes conventionally carry a
//! trailing separator in UI state; every helper here canonicalizes by
//! stripping trailing separators first, so `"/a/b/"` and `"/a/b"` derive the
//! same basename and the same rename target.

/// The remote path separator.
pub const SEPARATOR: char = '/';

/// Strips all trailing separators from a path.
///
/// The root path `"/"` is returned unchanged; there is nothing left to name
/// once its separator is removed.
pub fn strip_trailing_separator(path: &str) -> &str {
    let stripped = path.trim_end_matches(SEPARATOR);
    if stripped.is_empty() && !path.is_empty() {
        // Path was all separators; keep the root.
        &path[..1]
    } else {
        stripped
    }
}

/// Returns the last component of a path, after canonicalizing trailing
/// separators. The root path has an empty basename.
pub fn basename(path: &str) -> &str {
    let canonical = strip_trailing_separator(path);
    match canonical.rfind(SEPARATOR) {
        Some(idx) => &canonical[idx + 1..],
        None => canonical,
    }
}

/// Replaces the last component of a path with `new_name`.
///
/// Used to derive rename targets: the result lives in the same parent
/// directory as the canonicalized input.
pub fn replace_basename(path: &str, new_name: &str) -> String {
    let canonical = strip_trailing_separator(path);
    match canonical.rfind(SEPARATOR) {
        Some(idx) => format!("{}{new_name}", &canonical[..idx + 1]),
        None => new_name.to_string(),
    }
}

/// Joins a directory path and a child name with exactly one separator.
pub fn join(dir: &str, name: &str) -> String {
    let base = strip_trailing_separator(dir);
    if base == "/" {
        format!("/{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Wraps a shell argument in double quotes, escaping the characters the
/// remote shell interprets inside them (`"`, `\`, `` ` ``, `$`).
///
/// Every shell command builder applies this to every path argument, so a
/// path containing a quote character cannot break out of the command string.
pub fn quote_argument(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for ch in arg.chars() {
        if matches!(ch, '"' | '\\' | '`' | '$') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

// ── Tests ─────────────────────────────────────────────────────────────────────
