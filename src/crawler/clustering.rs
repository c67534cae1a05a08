//! Similarity clustering of normal pages
//!
//! Pages are assigned greedily: each new page joins the first cluster whose
//! representative (its first member) scores at least the cluster threshold,
//! otherwise it opens a new cluster.

use crate::config::SimilarityConfig;
use crate::crawler::similarity::{page_similarity, SimilarityWeights};
use crate::crawler::traits::Clustering;
use crate::model::{PageContent, PageId, WebPage};
use tracing::debug;

/// A group of pages that look alike
#[derive(Debug, Clone)]
pub struct PageCluster {
    pub representative: PageContent,
    pub members: Vec<PageId>,
}

#[derive(Debug, Clone)]
pub struct SimilarityClusters {
    threshold: f64,
    weights: SimilarityWeights,
    clusters: Vec<PageCluster>,
}

impl SimilarityClusters {
    pub fn new(config: &SimilarityConfig) -> Self {
        Self {
            threshold: config.cluster_threshold,
            weights: SimilarityWeights::from(config),
            clusters: Vec::new(),
        }
    }

    pub fn clusters(&self) -> &[PageCluster] {
        &self.clusters
    }
}

impl Clustering for SimilarityClusters {
    fn add_webpage(&mut self, page: &WebPage) {
        let found = self.clusters.iter_mut().find(|cluster| {
            page_similarity(&cluster.representative, &page.content, self.weights) >= self.threshold
        });

        match found {
            Some(cluster) => {
                cluster.members.push(page.id);
                debug!("Page {} joins a cluster of {}", page.id, cluster.members.len());
            }
            None => {
                debug!("Page {} opens cluster {}", page.id, self.clusters.len() + 1);
                self.clusters.push(PageCluster {
                    representative: page.content.clone(),
                    members: vec![page.id],
                });
            }
        }
    }

    fn clusters(&self) -> Vec<Vec<PageId>> {
        self.clusters.iter().map(|c| c.members.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Link;

    fn page(id: PageId, links: &[&str]) -> WebPage {
        let mut page = WebPage::new(id, "http://localhost/", "");
        page.content.links = links
            .iter()
            .map(|l| Link::new(l, "/html[1]/body[1]/a[1]"))
            .collect();
        page
    }

    #[test]
    fn test_similar_pages_share_a_cluster() {
        let mut clusters = SimilarityClusters::new(&SimilarityConfig::default());
        clusters.add_webpage(&page(1, &["http://localhost/a"]));
        clusters.add_webpage(&page(2, &["http://localhost/a"]));
        clusters.add_webpage(&page(3, &["http://localhost/b"]));

        let groups = Clustering::clusters(&clusters);
        assert_eq!(groups, vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_threshold_controls_grouping() {
        let config = SimilarityConfig {
            cluster_threshold: 0.5,
            ..SimilarityConfig::default()
        };
        let mut clusters = SimilarityClusters::new(&config);
        // Links differ, clickables and forms are both empty: score 2/3.
        clusters.add_webpage(&page(1, &["http://localhost/a"]));
        clusters.add_webpage(&page(2, &["http://localhost/b"]));

        assert_eq!(clusters.clusters().len(), 1);
        assert_eq!(clusters.clusters()[0].members, vec![1, 2]);
    }
}
