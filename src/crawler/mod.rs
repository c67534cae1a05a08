//! State exploration engine
//!
//! This module contains the core of the crawler:
//! - The crawl loop interleaving normal pages and delta pages
//! - The clickable execution loop with its retry and session checks
//! - Delta differencing, classification and near-duplicate suppression
//! - The collaborator traits the engine is driven through

mod classifier;
mod clickables;
mod clustering;
mod coordinator;
mod delta;
mod fetcher;
mod ids;
mod parser;
mod session;
mod similarity;
mod traits;

pub use classifier::{
    disposition, is_near_duplicate, presence_mask, Dispatcher, Disposition, Verdict, AJAX,
    CLICKABLES, FORMS, LINKS,
};
pub use clustering::{PageCluster, SimilarityClusters};
pub use coordinator::{Collaborators, CrawlState, CrawlSummary, Crawler};
pub use delta::{difference, DeltaCandidate};
pub use fetcher::{build_http_client, is_html, probe_url, ProbeResult};
pub use ids::PageIdAllocator;
pub use parser::{parse_content, resolve_link, xpath_of};
pub use session::{find_login_form, SessionGuard};
pub use similarity::{collection_overlap, page_similarity, SimilarityWeights};
pub use traits::{
    AcceptAll, AnalyzedPage, Analyzer, ClickableFilter, Clustering, DeltaObservation,
    EventExecutor, EventOutcome, FormHandler, Frontier, XhrMode,
};
