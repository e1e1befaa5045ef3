//! Pure string helpers for building canonical paths
//!
//! Canonical paths use `/` as the only separator and are ASCII lower-cased,
//! which makes them usable as identity keys on case-insensitive filesystems.

/// Replace every backslash with a forward slash
pub fn fix_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Fix separators and case-fold the whole string
///
/// Idempotent: `normalize(&normalize(p)) == normalize(p)`.
pub fn normalize(path: &str) -> String {
    let mut normalized = fix_slashes(path);
    normalized.make_ascii_lowercase();
    normalized
}

/// Collapse `.` and `..` segments (and repeated separators)
///
/// Returns `None` when a `..` would climb above the start of the path, i.e.
/// the path points outside the root it is relative to. Callers must reject
/// the path in that case instead of using a partial result.
///
/// # Example
/// ```
/// use paths::remove_dot_slashes;
///
/// assert_eq!(remove_dot_slashes("a/./b").as_deref(), Some("a/b"));
/// assert_eq!(remove_dot_slashes("a/../../b"), None);
/// ```
pub fn remove_dot_slashes(path: &str) -> Option<String> {
    let path = fix_slashes(path);
    let absolute = path.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    let collapsed = segments.join("/");
    if absolute {
        Some(format!("/{}", collapsed))
    } else {
        Some(collapsed)
    }
}

/// Join two path pieces with exactly one `/` between them
pub fn join(base: &str, sub: &str) -> String {
    let sub = sub.trim_start_matches('/');
    let mut joined = String::with_capacity(base.len() + sub.len() + 1);
    joined.push_str(base);
    if !joined.is_empty() && !joined.ends_with('/') {
        joined.push('/');
    }
    joined.push_str(sub);
    joined
}

/// Drop the last `/`-delimited segment, leaving the containing directory
///
/// No-op when the path has no separator.
pub fn strip_file_name(path: &str) -> String {
    match path.rfind('/') {
        Some(pos) => path[..pos].to_string(),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fixes_separators_and_case() {
        assert_eq!(normalize(r"C:\Games\GarrysMod\Lua"), "c:/games/garrysmod/lua");
        assert_eq!(normalize("already/fine"), "already/fine");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in [
            "",
            "A\\B/c",
            "/Srv/GMod/garrysmod/addons/Test/LUA/x.lua",
            "MiXeD\\\\double",
            "ünïcödé/Ö",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_remove_dot_slashes() {
        assert_eq!(remove_dot_slashes("a/./b").as_deref(), Some("a/b"));
        assert_eq!(remove_dot_slashes("a/b/../c").as_deref(), Some("a/c"));
        assert_eq!(remove_dot_slashes("a//b/").as_deref(), Some("a/b"));
        assert_eq!(remove_dot_slashes(r"a\.\b").as_deref(), Some("a/b"));
        assert_eq!(remove_dot_slashes("/a/../b").as_deref(), Some("/b"));
        assert_eq!(remove_dot_slashes("a/..").as_deref(), Some(""));
    }

    #[test]
    fn test_remove_dot_slashes_rejects_escape() {
        assert_eq!(remove_dot_slashes("a/../../b"), None);
        assert_eq!(remove_dot_slashes("../../etc"), None);
        assert_eq!(remove_dot_slashes(".."), None);
    }

    #[test]
    fn test_join_uses_single_separator() {
        assert_eq!(join("a/b", "c.lua"), "a/b/c.lua");
        assert_eq!(join("a/b/", "c.lua"), "a/b/c.lua");
        assert_eq!(join("a/b/", "/c.lua"), "a/b/c.lua");
        assert_eq!(join("", "c.lua"), "c.lua");
    }

    #[test]
    fn test_strip_file_name() {
        assert_eq!(strip_file_name("a/b/c.lua"), "a/b");
        assert_eq!(strip_file_name("/srv/x"), "/srv");
        assert_eq!(strip_file_name("plain"), "plain");
    }
}
