//! Delta classification and dispatch
//!
//! A differenced delta is classified by which of its four collections are
//! non-empty. The resulting 4-bit presence mask selects one disposition from
//! a 16-entry table; the work shared by every non-empty case (tagging the
//! generator, registering links, folding ajax observations, persisting) is
//! written once in `Dispatcher::dispatch`.
//!
//! | mask | new content              | disposition |
//! |------|--------------------------|-------------|
//! | 0    | nothing                  | UI change   |
//! | 2    | ajax only                | ajax only   |
//! | 1, 3 | links (+ ajax)           | store       |
//! | 8, 9 | forms (+ links)          | store       |
//! | rest | clickables, or ajax+forms| queue       |

use crate::config::SimilarityConfig;
use crate::crawler::delta::DeltaCandidate;
use crate::crawler::ids::PageIdAllocator;
use crate::crawler::similarity::{page_similarity, SimilarityWeights};
use crate::crawler::traits::{Frontier, XhrMode};
use crate::model::{Clickable, ClickableType, DeltaPage, Page, PageContent};
use crate::storage::Persistence;
use crate::Result;
use std::collections::VecDeque;
use tracing::{debug, trace};

pub const LINKS: u8 = 1;
pub const AJAX: u8 = 1 << 1;
pub const CLICKABLES: u8 = 1 << 2;
pub const FORMS: u8 = 1 << 3;

/// What happens to a delta with a given presence mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// No new content; the interaction only had a visual effect
    UiChange,
    /// Only backend calls; recorded on the parent, or the clickable is retried
    AjaxOnly,
    /// Persist the delta right away, never explore it
    Store,
    /// Queue the delta for exploration unless a near-duplicate is known
    Queue,
}

use Disposition::{AjaxOnly, Queue, Store, UiChange};

const DISPATCH: [Disposition; 16] = [
    UiChange, // -
    Store,    // L
    AjaxOnly, // A
    Store,    // L A
    Queue,    // C
    Queue,    // L C
    Queue,    // A C
    Queue,    // L A C
    Store,    // F
    Store,    // L F
    Queue,    // A F
    Queue,    // L A F
    Queue,    // C F
    Queue,    // L C F
    Queue,    // A C F
    Queue,    // L A C F
];

/// Presence mask of the four content collections
pub fn presence_mask(content: &PageContent) -> u8 {
    let mut mask = 0;
    if !content.links.is_empty() {
        mask |= LINKS;
    }
    if !content.ajax_requests.is_empty() {
        mask |= AJAX;
    }
    if !content.clickables.is_empty() {
        mask |= CLICKABLES;
    }
    if !content.forms.is_empty() {
        mask |= FORMS;
    }
    mask
}

pub fn disposition(mask: u8) -> Disposition {
    DISPATCH[usize::from(mask & 0x0f)]
}

/// What the execution loop does with the clickable after dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The clickable is done for this round
    Finalize,
    /// Execute the clickable again, now that its type is known
    Retry,
}

/// Returns true if a known delta at the same URL scores at least `threshold`
/// against the candidate
pub fn is_near_duplicate<'a, I, F>(
    url: &str,
    content: &PageContent,
    known: I,
    threshold: f64,
    score: F,
) -> bool
where
    I: IntoIterator<Item = &'a DeltaPage>,
    F: Fn(&PageContent, &PageContent) -> f64,
{
    known
        .into_iter()
        .filter(|page| page.url == url)
        .any(|page| score(content, &page.content) >= threshold)
}

/// Applies the disposition of a differenced delta
///
/// Borrows the pieces of crawler state a disposition may touch.
pub struct Dispatcher<'a> {
    pub ids: &'a mut PageIdAllocator,
    pub pending: &'a mut VecDeque<DeltaPage>,
    pub storage: &'a mut dyn Persistence,
    pub frontier: &'a mut dyn Frontier,
    pub similarity: &'a SimilarityConfig,
    pub max_delta_depth: u32,
}

impl Dispatcher<'_> {
    /// Classifies `candidate`, produced by executing `clickable` on `parent`
    pub fn dispatch(
        &mut self,
        clickable: &mut Clickable,
        mut candidate: DeltaCandidate,
        parent: &mut Page,
        mode: XhrMode,
    ) -> Result<Verdict> {
        let mask = presence_mask(&candidate.content);
        let disposition = disposition(mask);
        trace!(
            "Delta of {} on page {}: mask {:04b} -> {:?} ({:?})",
            clickable.event,
            parent.id(),
            mask,
            disposition,
            mode
        );

        match disposition {
            UiChange => {
                clickable.clickable_type = ClickableType::UiChange;
                self.storage.update_clickable(parent.id(), clickable)?;
                Ok(Verdict::Finalize)
            }

            AjaxOnly => {
                clickable.clickable_type = ClickableType::SendingAjax;
                if mode == XhrMode::Intercept {
                    return Ok(Verdict::Retry);
                }

                let requests = candidate.content.ajax_requests;
                self.storage.extend_ajax_requests(parent.id(), &requests)?;
                parent.content_mut().ajax_requests.extend(requests);
                self.storage.update_clickable(parent.id(), clickable)?;
                Ok(Verdict::Finalize)
            }

            Store | Queue => {
                if mask & AJAX != 0 && mode == XhrMode::Intercept {
                    clickable.clickable_type = ClickableType::SendingAjax;
                    return Ok(Verdict::Retry);
                }

                clickable.clickable_type = ClickableType::CreatesNewNavigatables;
                candidate.generator = clickable.clone();

                for url in self
                    .frontier
                    .extract_new_links(&candidate.content.links, candidate.current_depth)
                {
                    self.storage.insert_url(&url)?;
                }
                candidate.fold_ajax_into_generator();
                self.storage.update_clickable(parent.id(), clickable)?;

                if disposition == Store {
                    let page = candidate.into_page(self.ids.allocate());
                    debug!("Storing delta page {} ({})", page.id, page.url);
                    self.storage.store_delta_page(&page)?;
                } else {
                    self.enqueue(candidate)?;
                }
                Ok(Verdict::Finalize)
            }
        }
    }

    /// Pushes a delta onto the pending queue unless it is too deep or a
    /// near-duplicate of a queued or crawled delta
    fn enqueue(&mut self, candidate: DeltaCandidate) -> Result<()> {
        if candidate.delta_depth > self.max_delta_depth {
            debug!(
                "Not queueing delta of {}: delta depth {} exceeds {}",
                candidate.generator.dom_address, candidate.delta_depth, self.max_delta_depth
            );
            return Ok(());
        }

        let crawled = self.storage.get_crawled_delta_pages(&candidate.url)?;
        let weights = SimilarityWeights::from(self.similarity);
        let duplicate = is_near_duplicate(
            &candidate.url,
            &candidate.content,
            self.pending.iter().chain(crawled.iter()),
            self.similarity.duplicate_threshold,
            |a, b| page_similarity(a, b, weights),
        );

        if duplicate {
            debug!(
                "Delta of {} is a near-duplicate of a known state",
                candidate.generator.dom_address
            );
            return Ok(());
        }

        let page = candidate.into_page(self.ids.allocate());
        debug!(
            "Queueing delta page {} (delta depth {})",
            page.id, page.delta_depth
        );
        self.pending.push_back(page);
        Ok(())
    }
}
