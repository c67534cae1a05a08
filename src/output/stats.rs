//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::model::ClickableType;
use crate::storage::{PageCounts, Persistence, StorageResult, UrlCounts};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Stored web pages and delta pages
    pub pages: PageCounts,

    /// Discovered, visited and failed URLs
    pub urls: UrlCounts,

    /// Count of clickables by classification
    pub clickables_by_type: HashMap<ClickableType, u64>,
}

impl CrawlStatistics {
    pub fn total_clickables(&self) -> u64 {
        self.clickables_by_type.values().sum()
    }

    /// Share of clickables the crawler managed to classify, in percent
    pub fn classified_rate(&self) -> f64 {
        let total = self.total_clickables();
        if total == 0 {
            return 0.0;
        }
        let unclassified = self
            .clickables_by_type
            .get(&ClickableType::Unclassified)
            .copied()
            .unwrap_or(0);
        ((total - unclassified) as f64 / total as f64) * 100.0
    }

    /// Clickable types sorted by count, largest first
    pub fn sorted_clickable_types(&self) -> Vec<(ClickableType, u64)> {
        let mut counts: Vec<_> = self
            .clickables_by_type
            .iter()
            .map(|(t, c)| (*t, *c))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.to_db_string().cmp(b.0.to_db_string())));
        counts
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Persistence) -> StorageResult<CrawlStatistics> {
    Ok(CrawlStatistics {
        pages: storage.count_pages()?,
        urls: storage.count_urls()?,
        clickables_by_type: storage.count_clickables_by_type()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Web pages: {}", stats.pages.web);
    println!("  Delta pages: {}", stats.pages.delta);
    println!("  URLs discovered: {}", stats.urls.discovered);
    println!("  URLs visited: {}", stats.urls.visited);
    println!("  URLs failed: {}", stats.urls.failed);
    println!();

    let total = stats.total_clickables();
    println!("Clickables by Type ({} total):", total);
    for (clickable_type, count) in stats.sorted_clickable_types() {
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", clickable_type, count, percentage);
    }
    println!();

    println!("Classified: {:.1}% of clickables", stats.classified_rate());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Clickable, WebPage};
    use crate::storage::SqliteStorage;

    #[test]
    fn test_classified_rate() {
        let mut stats = CrawlStatistics::default();
        assert_eq!(stats.classified_rate(), 0.0);

        stats.clickables_by_type.insert(ClickableType::UiChange, 3);
        stats.clickables_by_type.insert(ClickableType::Unclassified, 1);
        assert_eq!(stats.total_clickables(), 4);
        assert!((stats.classified_rate() - 75.0).abs() < 0.01);
    }

    #[test]
    fn test_sorted_clickable_types() {
        let mut stats = CrawlStatistics::default();
        stats.clickables_by_type.insert(ClickableType::Link, 2);
        stats.clickables_by_type.insert(ClickableType::Error, 5);

        let sorted = stats.sorted_clickable_types();
        assert_eq!(sorted[0], (ClickableType::Error, 5));
        assert_eq!(sorted[1], (ClickableType::Link, 2));
    }

    #[test]
    fn test_load_statistics_from_storage() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut page = WebPage::new(1, "http://localhost/", "<html></html>");
        let mut clickable = Clickable::new("onclick", "div", "/html[1]/body[1]/div[1]");
        page.content.clickables.push(clickable.clone());
        storage.store_web_page(&page).unwrap();

        clickable.clickable_type = ClickableType::UiChange;
        storage.update_clickable(1, &clickable).unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.pages.web, 1);
        assert_eq!(stats.pages.delta, 0);
        assert_eq!(stats.clickables_by_type.get(&ClickableType::UiChange), Some(&1));
    }
}
