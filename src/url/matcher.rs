/// Checks if a host matches a scope pattern
///
/// `"example.com"` matches only itself; `"*.example.com"` matches the bare
/// domain and any subdomain of it.
///
/// ```
/// use delta_ripple::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "myexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_wildcard("localhost", "localhost"));
        assert!(!matches_wildcard("example.com", "blog.example.com"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_nested() {
        assert!(matches_wildcard("*.example.com", "example.com"));
        assert!(matches_wildcard("*.example.com", "www.example.com"));
        assert!(matches_wildcard("*.example.com", "deep.nested.example.com"));
    }

    #[test]
    fn test_wildcard_rejects_lookalikes() {
        assert!(!matches_wildcard("*.example.com", "example.org"));
        assert!(!matches_wildcard("*.example.com", "notexample.com"));
        assert!(!matches_wildcard("*.example.com", "example.com.evil.org"));
    }
}
