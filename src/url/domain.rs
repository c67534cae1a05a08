use url::Url;

/// Extracts the lowercase host of a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use delta_ripple::url::extract_domain;
///
/// let url = Url::parse("http://App.Example.com:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("app.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_extract_ignores_port() {
        let url = Url::parse("http://localhost:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("localhost".to_string()));
    }

    #[test]
    fn test_extract_ip_host() {
        let url = Url::parse("http://127.0.0.1:3000/app").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }
}
