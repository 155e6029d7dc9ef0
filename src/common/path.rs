//! Path normalization shared by mount paths, route paths and route reversal.

use regex::Regex;
use std::sync::LazyLock;

static REPEATED_SLASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^/]*)/+").expect("valid regex"));
static SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(:/|://)").expect("valid regex"));
static SLASH_BEFORE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\?|&|#[^!])").expect("valid regex"));
static SECOND_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\?.+)\?").expect("valid regex"));

/// Join path segments with `/` and normalize the result.
///
/// Rewrites, in order:
/// 1. a run of slashes after a segment collapses to one slash
/// 2. `:/` becomes `://`
/// 3. a slash directly before `?`, `&` or `#` is dropped (`#!` keeps it)
/// 4. a `?` after an already started query becomes `&`
///
/// ```
/// use arbor::common::url_join;
///
/// assert_eq!(url_join(&["/", "widgets"]), "/widgets");
/// assert_eq!(url_join(&["/widgets", "/", "/parts/"]), "/widgets/parts/");
/// ```
pub fn url_join<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("/");

    let ret = REPEATED_SLASHES.replace_all(&joined, "${1}/");
    let ret = SCHEME.replace_all(&ret, "://");
    let ret = SLASH_BEFORE_MARKER.replace_all(&ret, "${1}");
    let ret = SECOND_QUERY.replace_all(&ret, "${1}&");
    ret.into_owned()
}

/// Normalize a single user supplied mount path: one leading slash, no
/// trailing slash unless the path is the root.
pub fn mount_path(path: &str) -> String {
    let joined = url_join(&["/", path]);
    match joined.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => joined,
    }
}

/// Check that `path` is a route template axum will accept.
///
/// A capture spans a whole segment (`{id}`), and a catch-all (`{*rest}`)
/// may only be the last segment. `{{` and `}}` are literal braces. The
/// `:id` and `*rest` forms of older routers are rejected.
pub(crate) fn check_route_path(path: &str) -> Result<(), String> {
    if !path.starts_with('/') {
        return Err("route paths must start with `/`".to_string());
    }

    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len() - 1;
    let mut captures: Vec<&str> = Vec::new();

    for (index, segment) in segments.iter().enumerate() {
        if let Some(name) = segment.strip_prefix(':') {
            return Err(format!("segment `{segment}` uses `:` captures, write `{{{name}}}` instead"));
        }
        if let Some(name) = segment.strip_prefix('*') {
            return Err(format!("segment `{segment}` uses a bare wildcard, write `{{*{name}}}` instead"));
        }

        let literal = segment.replace("{{", "").replace("}}", "");
        if !literal.contains(['{', '}']) {
            continue;
        }

        let name = segment
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .filter(|name| !name.is_empty() && !name.contains(['{', '}']))
            .ok_or_else(|| format!("segment `{segment}` must be a single capture like `{{id}}` or contain no braces"))?;

        let name = match name.strip_prefix('*') {
            Some("") => return Err(format!("catch-all `{segment}` has no name")),
            Some(rest) if index == last => rest,
            Some(_) => return Err(format!("catch-all `{segment}` must be the last segment")),
            None => name,
        };
        if captures.contains(&name) {
            return Err(format!("capture `{name}` appears twice"));
        }
        captures.push(name);
    }
    Ok(())
}

/// The trailing-slash twin of a route path, if it has one. Catch-all routes
/// have none.
pub(crate) fn slash_alias(path: &str) -> Option<String> {
    if path == "/" || path.rsplit('/').next().is_some_and(|segment| segment.starts_with("{*")) {
        return None;
    }
    match path.strip_suffix('/') {
        Some(stripped) => Some(stripped.to_string()),
        None => Some(format!("{path}/")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joins_and_collapses_slashes() {
        assert_eq!(url_join(&["/", "widgets"]), "/widgets");
        assert_eq!(url_join(&["/widgets", "/", "/parts"]), "/widgets/parts");
        assert_eq!(url_join(&["/widgets/parts", "/"]), "/widgets/parts/");
        assert_eq!(url_join(&["", "x"]), "/x");
        assert_eq!(url_join(&["/"]), "/");
        assert_eq!(url_join(&["a", "b", "c"]), "a/b/c");
    }

    #[test]
    fn test_scheme_is_restored() {
        assert_eq!(url_join(&["http:", "example.com"]), "http://example.com");
        assert_eq!(url_join(&["http://", "/example.com"]), "http://example.com");
    }

    #[test]
    fn test_slash_before_query_and_fragment() {
        assert_eq!(url_join(&["/search", "?q=1"]), "/search?q=1");
        assert_eq!(url_join(&["/page", "#top"]), "/page#top");
        assert_eq!(url_join(&["/app", "#!/route"]), "/app/#!/route");
    }

    #[test]
    fn test_second_question_mark_becomes_ampersand() {
        assert_eq!(url_join(&["/search?a=1", "?b=2"]), "/search?a=1&b=2");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let samples: &[&[&str]] = &[
            &["/", "widgets"],
            &["/widgets/", "/", "/parts/"],
            &["//", "", "///x//y"],
            &["http:/", "host", "path"],
            &["/search", "?q=1"],
            &["/page", "#top"],
            &["/app", "#!/route"],
            &["/"],
            &[""],
        ];

        for parts in samples {
            let once = url_join(parts);
            assert_eq!(url_join(&[once.as_str()]), once, "input: {parts:?}");
        }
    }

    #[test]
    fn test_mount_path() {
        assert_eq!(mount_path("widgets"), "/widgets");
        assert_eq!(mount_path("/widgets/"), "/widgets");
        assert_eq!(mount_path("//a//b//"), "/a/b");
        assert_eq!(mount_path("/"), "/");
        assert_eq!(mount_path(""), "/");
    }

    #[test]
    fn test_slash_alias() {
        assert_eq!(slash_alias("/widgets"), Some("/widgets/".to_string()));
        assert_eq!(slash_alias("/widgets/"), Some("/widgets".to_string()));
        assert_eq!(slash_alias("/"), None);
        assert_eq!(slash_alias("/files/{*rest}"), None);
    }

    #[test]
    fn test_route_path_syntax() {
        assert!(check_route_path("/").is_ok());
        assert!(check_route_path("/widgets/{id}/parts/").is_ok());
        assert!(check_route_path("/files/{*rest}").is_ok());
        assert!(check_route_path("/literal/{{braces}}").is_ok());

        assert!(check_route_path("widgets").is_err());
        assert!(check_route_path("/widgets/:id").unwrap_err().contains("{id}"));
        assert!(check_route_path("/files/*rest").is_err());
        assert!(check_route_path("/widgets/{id").is_err());
        assert!(check_route_path("/widgets/id}").is_err());
        assert!(check_route_path("/widgets/{}").is_err());
        assert!(check_route_path("/widgets/{id}.json").is_err());
        assert!(check_route_path("/files/{*rest}/meta").is_err());
        assert!(check_route_path("/files/{*}").is_err());
        assert!(check_route_path("/{id}/parts/{id}").is_err());
    }
}
