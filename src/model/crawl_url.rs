/// A URL known to the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlUrl {
    /// Normalized address
    pub url: String,

    /// Depth of the page the URL was found on; `None` for the start page
    pub depth_of_finding: Option<u32>,

    /// Response code recorded by the visit, `None` until visited
    pub response_code: Option<u16>,
}

impl CrawlUrl {
    pub fn new(url: &str, depth_of_finding: Option<u32>) -> Self {
        Self {
            url: url.to_string(),
            depth_of_finding,
            response_code: None,
        }
    }
}
