//! Route prefix normalization and joining.

/// Holds the configured base path in normalized form (no leading or trailing
/// slash) and joins it onto route tails at the wire boundary.
#[derive(Debug, Clone, Default)]
pub struct RoutePrefixer {
    prefix: String,
}

impl RoutePrefixer {
    /// Normalize the configured base path, stripping one leading and one
    /// trailing `/` if present.
    pub fn new(base_path: &str) -> Self {
        let stripped = base_path.strip_prefix('/').unwrap_or(base_path);
        let stripped = stripped.strip_suffix('/').unwrap_or(stripped);
        Self {
            prefix: stripped.to_string(),
        }
    }

    /// The normalized prefix. Empty when the site is served at the root.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Join the prefix onto a tail, reattaching the leading slash and
    /// collapsing any doubled slashes.
    pub fn join(&self, tail: &str) -> String {
        let raw = format!("/{}/{}", self.prefix, tail);
        collapse_slashes(&raw)
    }

    /// Strip the prefix from an inbound request path, yielding the tail the
    /// catch-all chain operates on. Returns `None` when the path is not
    /// under the prefix.
    pub fn tail_of<'a>(&self, path: &'a str) -> Option<&'a str> {
        let path = path.strip_prefix('/').unwrap_or(path);
        if self.prefix.is_empty() {
            return Some(path);
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some("") => Some(""),
            Some(rest) => rest.strip_prefix('/'),
            None => None,
        }
    }
}

fn collapse_slashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_slash = false;
    for c in s.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_surrounding_slashes() {
        assert_eq!(RoutePrefixer::new("/docs/").prefix(), "docs");
        assert_eq!(RoutePrefixer::new("docs").prefix(), "docs");
        assert_eq!(RoutePrefixer::new("/").prefix(), "");
        assert_eq!(RoutePrefixer::new("").prefix(), "");
    }

    #[test]
    fn test_join_with_prefix() {
        let p = RoutePrefixer::new("docs");
        assert_eq!(p.join("api/{*params}"), "/docs/api/{*params}");
        assert_eq!(p.join("/styles.css"), "/docs/styles.css");
        assert_eq!(p.join(""), "/docs/");
    }

    #[test]
    fn test_join_without_prefix() {
        let p = RoutePrefixer::new("");
        assert_eq!(p.join("index.html"), "/index.html");
        assert_eq!(p.join(""), "/");
    }

    #[test]
    fn test_tail_of() {
        let p = RoutePrefixer::new("docs");
        assert_eq!(p.tail_of("/docs/a/b"), Some("a/b"));
        assert_eq!(p.tail_of("/docs"), Some(""));
        assert_eq!(p.tail_of("/other/a"), None);

        let root = RoutePrefixer::new("");
        assert_eq!(root.tail_of("/a/b"), Some("a/b"));
        assert_eq!(root.tail_of("/"), Some(""));
    }
}
