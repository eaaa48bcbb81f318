//! Virtual path resolution.
//!
//! Paths address objects of the infrastructure model independently of how the
//! backend indexes them, e.g. `/Physical/SITE/BLDG/ROOM/RACK`. Resolution is
//! purely textual: nothing here checks that an object exists.

/// Sentinel standing for the current selection.
pub const SELECTION: &str = "_";

pub const PHYSICAL: &str = "/Physical";
pub const STRAY: &str = "/Physical/Stray";
pub const LOGICAL: &str = "/Logical";
pub const OBJECT_TEMPLATES: &str = "/Logical/ObjectTemplates";
pub const ROOM_TEMPLATES: &str = "/Logical/RoomTemplates";
pub const BLDG_TEMPLATES: &str = "/Logical/BldgTemplates";
pub const GROUPS: &str = "/Logical/Groups";
pub const TAGS: &str = "/Logical/Tags";
pub const ORGANISATION: &str = "/Organisation";
pub const DOMAINS: &str = "/Organisation/Domain";

/// Namespaces that exist without any backend object behind them.
pub const NAMESPACES: [&str; 11] = [
    "/",
    PHYSICAL,
    STRAY,
    LOGICAL,
    OBJECT_TEMPLATES,
    ROOM_TEMPLATES,
    BLDG_TEMPLATES,
    GROUPS,
    TAGS,
    ORGANISATION,
    DOMAINS,
];

/// Turns a raw path into a normalized absolute path.
///
/// Rules, in order:
///
/// - an empty path is `.`
/// - `_` is returned as is and stands for the selection
/// - `-` is `previous`, verbatim
/// - a leading `/` makes the path absolute, otherwise it is relative to
///   `current`
/// - `.` segments are dropped and `..` pops one segment, never above root
/// - a first segment `P`, `L` or `O` expands to `Physical`, `Logical` or
///   `Organisation`
///
/// The result always starts with `/` and never ends with one, except for the
/// root itself.
///
/// # Examples
///
/// ```
/// use ogree_cli::path::resolve;
///
/// assert_eq!(resolve("..", "/a/b/c", "/"), "/a/b");
/// assert_eq!(resolve("rack1", "/P/site", "/"), "/Physical/site/rack1");
/// assert_eq!(resolve("-", "/a", "/Logical/Tags"), "/Logical/Tags");
/// ```
pub fn resolve(raw: &str, current: &str, previous: &str) -> String {
    let raw = if raw.is_empty() { "." } else { raw };
    if raw == SELECTION {
        return SELECTION.to_string();
    }
    if raw == "-" {
        return previous.to_string();
    }

    let (mut segments, relative) = match raw.strip_prefix('/') {
        Some(rest) => (Vec::new(), rest),
        None => (split(current), raw),
    };

    for word in relative.split('/') {
        match word {
            "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(word.to_string()),
        }
    }

    if let Some(first) = segments.first_mut() {
        match first.as_str() {
            "P" => *first = "Physical".to_string(),
            "L" => *first = "Logical".to_string(),
            "O" => *first = "Organisation".to_string(),
            _ => {}
        }
    }

    clean(&format!("/{}", segments.join("/")))
}

/// Collapses duplicate slashes and drops the trailing one.
pub fn clean(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

fn split(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Last segment of a path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Everything but the last segment, `/` for top-level paths.
pub fn parent(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Joins a parent path and a child name.
pub fn join(parent: &str, name: &str) -> String {
    clean(&format!("{}/{}", parent, name))
}

pub fn is_namespace(path: &str) -> bool {
    NAMESPACES.contains(&path)
}

/// Whether `path` is `prefix` itself or lies below it.
pub fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix || (path.starts_with(prefix) && path[prefix.len()..].starts_with('/'))
}

/// Dotted object id used by the backend, e.g. `site.bldg.room` for
/// `/Physical/site/bldg/room`.
pub fn object_id(path: &str, namespace: &str) -> Option<String> {
    let rest = path.strip_prefix(namespace)?.strip_prefix('/')?;
    if rest.is_empty() {
        return None;
    }
    Some(rest.replace('/', "."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        assert_eq!(clean("//a///b/"), "/a/b");
        assert_eq!(clean("/"), "/");
        assert_eq!(clean(""), "/");
    }

    #[test]
    fn test_parent_and_base_name() {
        assert_eq!(parent("/Physical/site"), "/Physical");
        assert_eq!(parent("/Physical"), "/");
        assert_eq!(base_name("/Physical/site/R1"), "R1");
    }

    #[test]
    fn test_is_under() {
        assert!(is_under("/Physical/Stray/dev", STRAY));
        assert!(!is_under("/Physical/StrayCat", STRAY));
    }

    #[test]
    fn test_object_id() {
        assert_eq!(
            object_id("/Physical/site/bldg", PHYSICAL),
            Some("site.bldg".to_string())
        );
        assert_eq!(object_id("/Physical", PHYSICAL), None);
    }
}
