//! Clickable execution loop
//!
//! Executes every clickable of one page state, classifies what each execution
//! did and returns the page's final clickable collection.

use crate::crawler::classifier::{Dispatcher, Verdict};
use crate::crawler::coordinator::Crawler;
use crate::crawler::delta::DeltaCandidate;
use crate::crawler::traits::{EventOutcome, XhrMode};
use crate::model::{Clickable, ClickableType, Page};
use crate::Result;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

impl Crawler {
    /// Runs every clickable of `page`, reached by replaying `necessary_clicks`
    ///
    /// `previous_pages` are the ancestors of a delta page, parent first; it is
    /// empty for normal pages. Clickables still queued when the retry budget
    /// runs out are left out of the result.
    pub(super) async fn execute_clickables(
        &mut self,
        page: &mut Page,
        necessary_clicks: &[Clickable],
        previous_pages: &[Page],
    ) -> Result<Vec<Clickable>> {
        let total = page.content().clickables.len();
        let mut queue: VecDeque<Clickable> = page.content().clickables.iter().cloned().collect();
        queue = self.filter.order_for_execution(queue);

        let max_retries = self.config.crawler.max_click_retries;
        let error_ratio_threshold = self.config.crawler.error_ratio_threshold;
        // Failed replays since the last successful session check
        let mut errors: u32 = 0;
        let mut retries: u32 = 0;
        let mut finished = Vec::with_capacity(total);

        while retries < max_retries {
            let Some(mut clickable) = queue.pop_front() else {
                break;
            };

            if !self.filter.should_execute(&clickable) {
                clickable.clickable_type = ClickableType::IgnoredByCrawler;
                self.storage.update_clickable(page.id(), &clickable)?;
                continue;
            }

            clickable.event = clickable.normalized_event().to_string();

            if clickable.clicked {
                debug!("Skipping {}: already clicked", clickable.dom_address);
                continue;
            }

            if !self
                .executor
                .supported_events()
                .contains(&clickable.event.as_str())
            {
                debug!("Event {} of {} is not supported", clickable.event, clickable.dom_address);
                clickable.clickable_type = ClickableType::UnsupportedEvent;
                self.storage.update_clickable(page.id(), &clickable)?;
                finished.push(clickable);
                continue;
            }

            let mode = if clickable.clickable_type.is_known() {
                XhrMode::Observe
            } else {
                XhrMode::Intercept
            };

            let outcome = self
                .executor
                .execute(page, &clickable, necessary_clicks, mode)
                .await?;

            match outcome {
                EventOutcome::UnsupportedTag => {
                    clickable.clicked = true;
                    clickable.clickable_type = ClickableType::UnsupportedEvent;
                    self.storage.update_clickable(page.id(), &clickable)?;
                    finished.push(clickable);
                }

                EventOutcome::TargetElementNotFound | EventOutcome::ErrorWhileInitialLoading => {
                    debug!("Could not execute {} on page {}", clickable.dom_address, page.id());
                    clickable.clicked = true;
                    clickable.clickable_type = ClickableType::Error;
                    self.storage.update_clickable(page.id(), &clickable)?;
                    finished.push(clickable);
                }

                EventOutcome::PreviousClickNotFound => {
                    errors += 1;
                    let ratio = f64::from(errors) / total as f64;
                    if ratio <= error_ratio_threshold {
                        queue.push_back(clickable);
                        continue;
                    }

                    warn!(
                        "{} of {} clickables on page {} could not be reached, checking session",
                        errors,
                        total,
                        page.id()
                    );
                    let recovered = self
                        .session
                        .recheck(self.analyzer.as_mut(), self.form_handler.as_mut())
                        .await?;
                    if recovered {
                        retries += 1;
                        errors = 0;
                        queue.push_back(clickable);
                    } else {
                        warn!(
                            "Dropping {} on page {}: its state cannot be reached",
                            clickable.dom_address,
                            page.id()
                        );
                    }
                }

                EventOutcome::UrlChanged(destination) => {
                    clickable.clicked = true;
                    clickable.clickable_type = ClickableType::Link;
                    if let Some(url) = self
                        .frontier
                        .add_url(&destination, Some(page.current_depth()))
                    {
                        self.storage.insert_url(&url)?;
                    }
                    clickable.links_to = Some(destination);
                    self.storage.update_clickable(page.id(), &clickable)?;
                    finished.push(clickable);
                }

                EventOutcome::Delta(observation) => {
                    clickable.clicked = true;
                    let mut candidate = DeltaCandidate::new(observation, page, clickable.clone());
                    clickable.clickable_depth = Some(candidate.delta_depth);

                    let base = candidate.url.clone();
                    self.frontier.complete_urls(&mut candidate.content, &base);
                    candidate.subtract(page.content());
                    candidate.subtract_all(previous_pages.iter().map(Page::content));

                    let mut dispatcher = Dispatcher {
                        ids: &mut self.ids,
                        pending: &mut self.pending,
                        storage: self.storage.as_mut(),
                        frontier: self.frontier.as_mut(),
                        similarity: &self.config.similarity,
                        max_delta_depth: self.config.crawler.max_delta_depth,
                    };
                    match dispatcher.dispatch(&mut clickable, candidate, page, mode)? {
                        Verdict::Retry => {
                            clickable.clicked = false;
                            queue.push_back(clickable);
                        }
                        Verdict::Finalize => finished.push(clickable),
                    }
                }
            }
        }

        if !queue.is_empty() {
            info!(
                "Retry budget of {} spent on page {}, {} clickables left unexplored",
                max_retries,
                page.id(),
                queue.len()
            );
        }

        Ok(finished)
    }
}
