//! Delta differencing
//!
//! A raw observation taken after executing a clickable still contains
//! everything the parent state already had. Differencing removes every item
//! that is structurally equal to one found in an ancestor, leaving only what
//! the interaction genuinely introduced.

use crate::crawler::DeltaObservation;
use crate::model::{AjaxRequest, Clickable, DeltaPage, Page, PageContent, PageId};

/// Returns the part of `delta` not already present in `ancestor`
pub fn difference(delta: &PageContent, ancestor: &PageContent) -> PageContent {
    PageContent {
        clickables: novel(&delta.clickables, &ancestor.clickables),
        links: novel(&delta.links, &ancestor.links),
        forms: novel(&delta.forms, &ancestor.forms),
        ajax_requests: novel(&delta.ajax_requests, &ancestor.ajax_requests),
    }
}

fn novel<T: PartialEq + Clone>(items: &[T], inherited: &[T]) -> Vec<T> {
    items
        .iter()
        .filter(|item| !inherited.contains(item))
        .cloned()
        .collect()
}

/// A delta page that has not been given an identity yet
///
/// Candidates only receive an id once the classifier decides to keep them.
#[derive(Debug, Clone)]
pub struct DeltaCandidate {
    pub url: String,
    pub html: String,
    pub current_depth: u32,
    pub delta_depth: u32,
    pub parent_id: PageId,
    pub generator: Clickable,
    pub generator_requests: Vec<AjaxRequest>,
    pub content: PageContent,
}

impl DeltaCandidate {
    /// Wraps an observation made on `parent` by executing `generator`
    ///
    /// The candidate sits one interaction below its parent and shares its
    /// interaction-free depth.
    pub fn new(observation: DeltaObservation, parent: &Page, generator: Clickable) -> Self {
        Self {
            url: observation.url,
            html: observation.html,
            current_depth: parent.current_depth(),
            delta_depth: parent.delta_depth() + 1,
            parent_id: parent.id(),
            generator,
            generator_requests: Vec::new(),
            content: observation.content,
        }
    }

    /// Strips content inherited from one ancestor
    pub fn subtract(&mut self, ancestor: &PageContent) {
        self.content = difference(&self.content, ancestor);
    }

    /// Strips content inherited from each ancestor in turn
    pub fn subtract_all<'a, I>(&mut self, ancestors: I)
    where
        I: IntoIterator<Item = &'a PageContent>,
    {
        for ancestor in ancestors {
            self.subtract(ancestor);
        }
    }

    /// Moves observed backend calls onto the generator's footprint
    pub fn fold_ajax_into_generator(&mut self) {
        let requests = std::mem::take(&mut self.content.ajax_requests);
        self.generator_requests.extend(requests);
    }

    pub fn into_page(self, id: PageId) -> DeltaPage {
        DeltaPage {
            id,
            url: self.url,
            html: self.html,
            current_depth: self.current_depth,
            delta_depth: self.delta_depth,
            parent_id: self.parent_id,
            generator: self.generator,
            generator_requests: self.generator_requests,
            content: self.content,
        }
    }
}
