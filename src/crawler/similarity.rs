//! Similarity oracle
//!
//! Two page-like states are compared collection by collection. For each of
//! clickables, forms and links the score is the number of structurally equal
//! items divided by the size of the larger collection (two empty collections
//! are identical). The page score is the weighted mean of the three.

use crate::config::SimilarityConfig;
use crate::model::PageContent;

/// Relative importance of each collection in the page score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub clickables: f64,
    pub forms: f64,
    pub links: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            clickables: 1.0,
            forms: 1.0,
            links: 1.0,
        }
    }
}

impl From<&SimilarityConfig> for SimilarityWeights {
    fn from(config: &SimilarityConfig) -> Self {
        Self {
            clickables: config.clickable_weight,
            forms: config.form_weight,
            links: config.link_weight,
        }
    }
}

/// Scores two states in `[0, 1]`; 1 means indistinguishable
pub fn page_similarity(a: &PageContent, b: &PageContent, weights: SimilarityWeights) -> f64 {
    let total = weights.clickables + weights.forms + weights.links;
    if total <= 0.0 {
        return 0.0;
    }

    let weighted = weights.clickables * collection_overlap(&a.clickables, &b.clickables)
        + weights.forms * collection_overlap(&a.forms, &b.forms)
        + weights.links * collection_overlap(&a.links, &b.links);

    weighted / total
}

/// Share of items two collections have in common
///
/// Each item of `b` can match at most one item of `a`.
pub fn collection_overlap<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    let larger = a.len().max(b.len());
    if larger == 0 {
        return 1.0;
    }

    let mut used = vec![false; b.len()];
    let mut matches = 0usize;
    for item in a {
        let found = b
            .iter()
            .enumerate()
            .position(|(i, other)| !used[i] && other == item);
        if let Some(i) = found {
            used[i] = true;
            matches += 1;
        }
    }

    matches as f64 / larger as f64
}
