//! Request path cleaning.
//!
//! Scope claims are matched against the request path as text, while the
//! upstream URL builder resolves dot segments. Both must see the same path, so
//! a path with `.` or `..` segments (literal or percent-encoded) or repeated
//! slashes is answered with a redirect to its clean form before any rule runs.

use std::borrow::Cow;

/// `Some(1)` for `.`, `Some(2)` for `..`, with `%2e` accepted for a dot.
fn dot_segment(segment: &str) -> Option<usize> {
    let mut rest = segment;
    let mut dots = 0;
    while !rest.is_empty() {
        if let Some(r) = rest.strip_prefix('.') {
            rest = r;
        } else if rest.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("%2e")) {
            rest = &rest[3..];
        } else {
            return None;
        }
        dots += 1;
    }
    matches!(dots, 1 | 2).then_some(dots)
}

/// Rooted path with dot segments resolved and empty segments dropped.
///
/// A trailing slash survives unless the result is `/`. Clean input comes back
/// borrowed.
pub fn clean_path(path: &str) -> Cow<'_, str> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match dot_segment(segment) {
            Some(1) => {}
            Some(_) => {
                segments.pop();
            }
            None if segment.is_empty() => {}
            None => segments.push(segment),
        }
    }

    let mut cleaned = format!("/{}", segments.join("/"));
    if path.ends_with('/') && cleaned != "/" {
        cleaned.push('/');
    }

    if cleaned == path {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_paths_are_borrowed() {
        for path in ["/", "/k8s/", "/k8s/api/v1/pods", "/k8s/api/v1/namespaces/a/", "/a.b/..c/"] {
            assert!(matches!(clean_path(path), Cow::Borrowed(_)), "{path}");
        }
    }

    #[test]
    fn dot_segments_resolved() {
        assert_eq!(
            clean_path("/k8s/api/v1/namespaces/a/../b/secrets"),
            "/k8s/api/v1/namespaces/b/secrets"
        );
        assert_eq!(clean_path("/k8s/./api/v1/pods"), "/k8s/api/v1/pods");
        assert_eq!(clean_path("/k8s/api/v1/.."), "/k8s/api");
        assert_eq!(clean_path("/k8s/api/v1/../"), "/k8s/api/");
        assert_eq!(clean_path("/../../etc/passwd"), "/etc/passwd");
        assert_eq!(clean_path("/k8s/.."), "/");
    }

    #[test]
    fn encoded_dots_count_as_dots() {
        assert_eq!(
            clean_path("/k8s/api/v1/namespaces/a/%2e%2e/b/secrets"),
            "/k8s/api/v1/namespaces/b/secrets"
        );
        assert_eq!(clean_path("/k8s/api/%2E./v1"), "/k8s/v1");
        assert_eq!(clean_path("/k8s/api/.%2e/v1"), "/k8s/v1");
        assert_eq!(clean_path("/k8s/%2e/api"), "/k8s/api");
    }

    #[test]
    fn repeated_slashes_collapsed() {
        assert_eq!(clean_path("/k8s//api/v1"), "/k8s/api/v1");
        assert_eq!(clean_path("//k8s/api//"), "/k8s/api/");
    }

    #[test]
    fn dotted_names_are_not_dot_segments() {
        assert_eq!(dot_segment("..."), None);
        assert_eq!(dot_segment(".hidden"), None);
        assert_eq!(dot_segment("%2e%2e%2e"), None);
        assert_eq!(dot_segment("%2"), None);
        assert_eq!(dot_segment(".."), Some(2));
    }
}
