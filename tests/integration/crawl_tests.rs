//! Integration tests for the crawler
//!
//! These tests drive `Crawler::run` end-to-end with scripted browser
//! collaborators, the real frontier and an in-memory SQLite store.

use async_trait::async_trait;
use delta_ripple::config::{parse_config, Config};
use delta_ripple::crawler::{
    AnalyzedPage, Analyzer, ClickableFilter, Collaborators, Crawler, DeltaObservation,
    EventExecutor, EventOutcome, FormHandler, SimilarityClusters, XhrMode,
};
use delta_ripple::model::{
    AjaxRequest, Clickable, ClickableType, Form, FormInput, Link, Page, PageContent,
};
use delta_ripple::storage::{RunStatus, SqliteStorage};
use delta_ripple::{DomainHandler, RippleError};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const START: &str = "http://app.test/";
const LOGIN: &str = "http://app.test/login";
const NEXT: &str = "http://app.test/next";
const FURTHER: &str = "http://app.test/further";

// ===== Scripted collaborators =====

/// Serves canned pages; the last response for a URL repeats forever
struct ScriptedAnalyzer {
    responses: HashMap<String, VecDeque<AnalyzedPage>>,
    calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Analyzer for ScriptedAnalyzer {
    async fn analyze(
        &mut self,
        url: &str,
        _depth: u32,
        _timeout: Duration,
    ) -> delta_ripple::Result<AnalyzedPage> {
        self.calls.lock().unwrap().push(url.to_string());
        let queue = self
            .responses
            .get_mut(url)
            .ok_or_else(|| RippleError::PageLoad {
                url: url.to_string(),
                message: "no scripted response".to_string(),
            })?;
        if queue.len() > 1 {
            Ok(queue.pop_front().unwrap())
        } else {
            Ok(queue.front().cloned().unwrap())
        }
    }
}

#[derive(Debug, Clone)]
struct Call {
    page_id: i64,
    target: String,
    necessary: Vec<String>,
    mode: XhrMode,
}

type Script = Box<dyn FnMut(&Page, &Clickable, XhrMode) -> EventOutcome + Send>;

struct ScriptedExecutor {
    script: Script,
    calls: Arc<Mutex<Vec<Call>>>,
}

#[async_trait]
impl EventExecutor for ScriptedExecutor {
    fn supported_events(&self) -> &[&'static str] {
        &["click", "change"]
    }

    async fn execute(
        &mut self,
        page: &Page,
        clickable: &Clickable,
        necessary_clicks: &[Clickable],
        mode: XhrMode,
    ) -> delta_ripple::Result<EventOutcome> {
        self.calls.lock().unwrap().push(Call {
            page_id: page.id(),
            target: clickable.dom_address.clone(),
            necessary: necessary_clicks.iter().map(|c| c.dom_address.clone()).collect(),
            mode,
        });
        Ok((self.script)(page, clickable, mode))
    }
}

struct ScriptedForms {
    landing: AnalyzedPage,
    submissions: Arc<Mutex<usize>>,
}

#[async_trait]
impl FormHandler for ScriptedForms {
    async fn submit(
        &mut self,
        _form: &Form,
        _page_url: &str,
        _credentials: &BTreeMap<String, String>,
    ) -> delta_ripple::Result<AnalyzedPage> {
        *self.submissions.lock().unwrap() += 1;
        Ok(self.landing.clone())
    }
}

/// Shared views on what the collaborators were asked to do
#[derive(Default)]
struct Recorder {
    analyzed: Arc<Mutex<Vec<String>>>,
    executed: Arc<Mutex<Vec<Call>>>,
    submissions: Arc<Mutex<usize>>,
}

impl Recorder {
    fn executed(&self) -> Vec<Call> {
        self.executed.lock().unwrap().clone()
    }

    fn submissions(&self) -> usize {
        *self.submissions.lock().unwrap()
    }

    fn analyzed(&self, url: &str) -> usize {
        self.analyzed.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

// ===== Fixtures =====

fn config(extra: &str) -> Config {
    let toml = format!(
        r#"
[crawler]
start-url = "{}"
max-depth = 0

[output]
database-path = ":memory:"
report-path = "./report.md"
{}
"#,
        START, extra
    );
    parse_config(&toml).unwrap()
}

const WITH_LOGIN: &str = r#"
[login]
url-with-login-form = "http://app.test/login"
username = "admin"
data = { user = "admin", pass = "secret" }
"#;

fn button(n: usize) -> Clickable {
    Clickable::new("onclick", "button", &format!("/html[1]/body[1]/button[{}]", n))
}

fn page_with(clickables: Vec<Clickable>) -> AnalyzedPage {
    AnalyzedPage {
        status_code: 200,
        landing_url: START.to_string(),
        html: "<html><body></body></html>".to_string(),
        content: PageContent {
            clickables,
            ..PageContent::default()
        },
        timing_requests: Vec::new(),
    }
}

fn page_at(url: &str, clickables: Vec<Clickable>) -> AnalyzedPage {
    AnalyzedPage {
        landing_url: url.to_string(),
        ..page_with(clickables)
    }
}

fn login_page() -> AnalyzedPage {
    AnalyzedPage {
        status_code: 200,
        landing_url: LOGIN.to_string(),
        html: "<form></form>".to_string(),
        content: PageContent {
            forms: vec![Form {
                action: LOGIN.to_string(),
                method: "POST".to_string(),
                dom_address: "/html[1]/body[1]/form[1]".to_string(),
                inputs: ["user", "pass"]
                    .iter()
                    .map(|n| FormInput {
                        name: n.to_string(),
                        input_type: "text".to_string(),
                        value: None,
                    })
                    .collect(),
            }],
            ..PageContent::default()
        },
        timing_requests: Vec::new(),
    }
}

fn dashboard() -> AnalyzedPage {
    let mut page = page_with(vec![button(99)]);
    page.content
        .links
        .push(Link::new("http://app.test/profile", "/html[1]/body[1]/a[1]"));
    page
}

/// A DOM observation: everything on `page` plus `extra`
fn observe(page: &Page, extra: PageContent) -> EventOutcome {
    let mut content = page.content().clone();
    content.clickables.extend(extra.clickables);
    content.links.extend(extra.links);
    content.forms.extend(extra.forms);
    content.ajax_requests.extend(extra.ajax_requests);
    EventOutcome::Delta(DeltaObservation {
        url: page.url().to_string(),
        html: "<html></html>".to_string(),
        content,
    })
}

fn crawler(
    config: Config,
    pages: Vec<(&str, Vec<AnalyzedPage>)>,
    script: Script,
    recorder: &Recorder,
) -> Crawler {
    crawler_landing_on(config, pages, script, recorder, dashboard())
}

/// Like `crawler`, with `landing` shown after every form submission
fn crawler_landing_on(
    config: Config,
    pages: Vec<(&str, Vec<AnalyzedPage>)>,
    script: Script,
    recorder: &Recorder,
    landing: AnalyzedPage,
) -> Crawler {
    let analyzer = ScriptedAnalyzer {
        responses: pages
            .into_iter()
            .map(|(url, responses)| (url.to_string(), responses.into_iter().collect()))
            .collect(),
        calls: recorder.analyzed.clone(),
    };
    let collaborators = Collaborators {
        analyzer: Box::new(analyzer),
        executor: Box::new(ScriptedExecutor {
            script,
            calls: recorder.executed.clone(),
        }),
        form_handler: Box::new(ScriptedForms {
            landing,
            submissions: recorder.submissions.clone(),
        }),
        frontier: Box::new(DomainHandler::from_config(&config).unwrap()),
        storage: Box::new(SqliteStorage::new_in_memory().unwrap()),
        clustering: Box::new(SimilarityClusters::new(&config.similarity)),
    };
    Crawler::new(config, collaborators).unwrap()
}

fn run_status(crawler: &Crawler) -> RunStatus {
    crawler.storage().get_latest_run().unwrap().unwrap().status
}

// ===== Scenarios =====

#[tokio::test]
async fn test_unsupported_tags_finalize_without_session_check() {
    let recorder = Recorder::default();
    let mut crawler = crawler(
        config(""),
        vec![(START, vec![page_with(vec![button(1), button(2), button(3)])])],
        Box::new(|_: &Page, _: &Clickable, _: XhrMode| EventOutcome::UnsupportedTag),
        &recorder,
    );

    let summary = crawler.run().await.unwrap();

    assert_eq!(summary.web_pages, 1);
    assert_eq!(summary.delta_pages, 0);
    assert!(crawler.pending_deltas().is_empty());
    assert_eq!(recorder.executed().len(), 3);
    assert_eq!(recorder.submissions(), 0);

    let clickables = crawler.storage().get_clickables(1).unwrap();
    assert_eq!(clickables.len(), 3);
    for clickable in &clickables {
        assert_eq!(clickable.clickable_type, ClickableType::UnsupportedEvent);
        assert!(clickable.clicked);
    }
    assert_eq!(run_status(&crawler), RunStatus::Completed);
}

#[tokio::test]
async fn test_ajax_only_clickable_is_retried_in_observe_mode() {
    let recorder = Recorder::default();
    let request = AjaxRequest {
        method: "GET".to_string(),
        url: "http://app.test/api/items".to_string(),
        parameters: None,
    };
    let observed = request.clone();
    let mut crawler = crawler(
        config(""),
        vec![(START, vec![page_with(vec![button(1)])])],
        Box::new(move |page: &Page, _: &Clickable, _: XhrMode| {
            observe(
                page,
                PageContent {
                    ajax_requests: vec![observed.clone()],
                    ..PageContent::default()
                },
            )
        }),
        &recorder,
    );

    crawler.run().await.unwrap();

    let modes: Vec<XhrMode> = recorder.executed().iter().map(|c| c.mode).collect();
    assert_eq!(modes, vec![XhrMode::Intercept, XhrMode::Observe]);

    let clickables = crawler.storage().get_clickables(1).unwrap();
    assert_eq!(clickables[0].clickable_type, ClickableType::SendingAjax);
    assert!(clickables[0].clicked);

    let parent = crawler.storage().get_page_by_id(1).unwrap().unwrap();
    assert_eq!(parent.content().ajax_requests, vec![request]);
    assert_eq!(crawler.storage().count_pages().unwrap().delta, 0);
}

#[tokio::test]
async fn test_error_ratio_without_login_form_drops_clickables_and_continues() {
    let recorder = Recorder::default();
    let clickables: Vec<Clickable> = (1..=10).map(button).collect();
    let mut crawler = crawler(
        config(WITH_LOGIN),
        vec![
            (START, vec![page_with(clickables)]),
            // Initial login sees the form; later checks find none
            (LOGIN, vec![login_page(), dashboard()]),
        ],
        Box::new(|page: &Page, clickable: &Clickable, _: XhrMode| {
            if [button(1), button(2), button(3)].contains(clickable) {
                EventOutcome::PreviousClickNotFound
            } else {
                observe(page, PageContent::default())
            }
        }),
        &recorder,
    );

    let summary = crawler.run().await.unwrap();
    assert_eq!(summary.web_pages, 1);

    // Only the initial login submitted the form
    assert_eq!(recorder.submissions(), 1);
    // Initial login plus one check for each clickable dropped
    assert_eq!(recorder.analyzed(LOGIN), 4);

    let stored = crawler.storage().get_clickables(1).unwrap();
    let ui_changes = stored
        .iter()
        .filter(|c| c.clickable_type == ClickableType::UiChange)
        .count();
    let untouched = stored
        .iter()
        .filter(|c| c.clickable_type == ClickableType::Unclassified && !c.clicked)
        .count();
    assert_eq!(ui_changes, 7);
    assert_eq!(untouched, 3);
    assert_eq!(run_status(&crawler), RunStatus::Completed);
}

#[tokio::test]
async fn test_retry_budget_bounds_session_recovery() {
    let recorder = Recorder::default();
    let mut crawler = crawler(
        config(WITH_LOGIN),
        vec![(START, vec![page_with(vec![button(1)])]), (LOGIN, vec![login_page()])],
        Box::new(|_: &Page, _: &Clickable, _: XhrMode| EventOutcome::PreviousClickNotFound),
        &recorder,
    );

    crawler.run().await.unwrap();

    // Every failure triggers a successful re-login until the budget of 5 is spent
    assert_eq!(recorder.executed().len(), 5);
    assert_eq!(recorder.submissions(), 6);

    let stored = crawler.storage().get_clickables(1).unwrap();
    assert_eq!(stored[0].clickable_type, ClickableType::Unclassified);
    assert_eq!(run_status(&crawler), RunStatus::Completed);
}

#[tokio::test]
async fn test_queued_delta_is_explored_by_replaying_its_generator() {
    let recorder = Recorder::default();
    let menu = button(1);
    let item = Clickable::new("onclick", "li", "/html[1]/body[1]/ul[1]/li[1]");
    let revealed = item.clone();
    let mut crawler = crawler(
        config(""),
        vec![(START, vec![page_with(vec![menu.clone()])])],
        Box::new(move |page: &Page, clickable: &Clickable, _: XhrMode| {
            if page.is_delta() {
                // Everything visible is inherited from the delta and its parent
                let mut content = page.content().clone();
                content.clickables.insert(0, button(1));
                EventOutcome::Delta(DeltaObservation {
                    url: page.url().to_string(),
                    html: String::new(),
                    content,
                })
            } else if clickable.dom_address == "/html[1]/body[1]/button[1]" {
                observe(
                    page,
                    PageContent {
                        clickables: vec![revealed.clone()],
                        ..PageContent::default()
                    },
                )
            } else {
                EventOutcome::TargetElementNotFound
            }
        }),
        &recorder,
    );

    let summary = crawler.run().await.unwrap();
    assert_eq!(summary.web_pages, 1);
    assert_eq!(summary.delta_pages, 1);

    let calls = recorder.executed();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].page_id, 2);
    assert_eq!(calls[1].target, item.dom_address);
    assert_eq!(calls[1].necessary, vec![menu.dom_address.clone()]);

    match crawler.storage().get_page_by_id(2).unwrap().unwrap() {
        Page::Delta(delta) => {
            assert_eq!(delta.parent_id, 1);
            assert_eq!(delta.delta_depth, 1);
            assert_eq!(delta.generator, menu);
            assert_eq!(delta.content.clickables, vec![item.clone()]);
        }
        Page::Web(_) => panic!("page 2 should be a delta page"),
    }

    let root = crawler.storage().get_clickables(1).unwrap();
    assert_eq!(root[0].clickable_type, ClickableType::CreatesNewNavigatables);
    assert_eq!(root[0].clickable_depth, Some(1));

    let nested = crawler.storage().get_clickables(2).unwrap();
    assert_eq!(nested[0].clickable_type, ClickableType::UiChange);
    assert!(crawler.pending_deltas().is_empty());
    assert_eq!(crawler.next_page_id(), 3);
}

/// Skips anything inside a nav bar and runs the rest last-first
struct SkipNavigation;

impl ClickableFilter for SkipNavigation {
    fn should_execute(&self, clickable: &Clickable) -> bool {
        !clickable.dom_address.contains("/nav[")
    }

    fn order_for_execution(&self, queue: VecDeque<Clickable>) -> VecDeque<Clickable> {
        queue.into_iter().rev().collect()
    }
}

#[tokio::test]
async fn test_clickable_filter_skips_and_reorders() {
    let recorder = Recorder::default();
    let nav = Clickable::new("onclick", "a", "/html[1]/body[1]/nav[1]/a[1]");
    let crawler = crawler(
        config(""),
        vec![(START, vec![page_with(vec![nav, button(1), button(2)])])],
        Box::new(|_: &Page, _: &Clickable, _: XhrMode| EventOutcome::UnsupportedTag),
        &recorder,
    );
    let mut crawler = crawler.with_filter(Box::new(SkipNavigation));

    crawler.run().await.unwrap();

    let targets: Vec<String> = recorder.executed().into_iter().map(|c| c.target).collect();
    assert_eq!(targets, vec![button(2).dom_address, button(1).dom_address]);

    let stored = crawler.storage().get_clickables(1).unwrap();
    let ignored: Vec<&Clickable> = stored
        .iter()
        .filter(|c| c.clickable_type == ClickableType::IgnoredByCrawler)
        .collect();
    assert_eq!(ignored.len(), 1);
    assert!(ignored[0].dom_address.contains("/nav["));
    assert!(!ignored[0].clicked);
}

#[tokio::test]
async fn test_url_change_registers_frontier_url_found_at_page_depth() {
    let recorder = Recorder::default();
    let mut crawler = crawler(
        config(""),
        vec![
            (START, vec![page_with(vec![button(1)])]),
            (NEXT, vec![page_at(NEXT, vec![button(2)])]),
        ],
        Box::new(|page: &Page, _: &Clickable, _: XhrMode| {
            let destination = if page.url() == START { NEXT } else { FURTHER };
            EventOutcome::UrlChanged(destination.to_string())
        }),
        &recorder,
    );

    let summary = crawler.run().await.unwrap();

    // Found on the start page, so still within max-depth 0; the URL found
    // one level further down is not
    assert_eq!(summary.web_pages, 2);
    assert_eq!(summary.skipped_urls, 1);
    assert_eq!(recorder.analyzed(NEXT), 1);
    assert_eq!(recorder.analyzed(FURTHER), 0);

    let clickables = crawler.storage().get_clickables(1).unwrap();
    assert_eq!(clickables[0].clickable_type, ClickableType::Link);
    assert_eq!(clickables[0].links_to.as_deref(), Some(NEXT));

    let next_page = crawler.storage().get_page_by_id(2).unwrap().unwrap();
    assert_eq!(next_page.url(), NEXT);
    assert_eq!(next_page.current_depth(), 1);

    let urls = crawler.storage().list_urls().unwrap();
    let next = urls.iter().find(|u| u.url == NEXT).unwrap();
    assert_eq!(next.depth_of_finding, Some(0));
    assert_eq!(next.response_code, Some(200));
    let further = urls.iter().find(|u| u.url == FURTHER).unwrap();
    assert_eq!(further.depth_of_finding, Some(1));
    assert_eq!(further.response_code, Some(0));
}

#[tokio::test]
async fn test_links_on_start_page_are_crawled_at_max_depth_zero() {
    let recorder = Recorder::default();
    let mut start = page_with(vec![]);
    start
        .content
        .links
        .push(Link::new(NEXT, "/html[1]/body[1]/a[1]"));
    let mut next = page_at(NEXT, vec![]);
    next.content
        .links
        .push(Link::new(FURTHER, "/html[1]/body[1]/a[1]"));
    let mut crawler = crawler(
        config(""),
        vec![(START, vec![start]), (NEXT, vec![next])],
        Box::new(|_: &Page, _: &Clickable, _: XhrMode| EventOutcome::UnsupportedTag),
        &recorder,
    );

    let summary = crawler.run().await.unwrap();

    assert_eq!(summary.web_pages, 2);
    assert_eq!(summary.skipped_urls, 1);
    assert_eq!(recorder.analyzed(NEXT), 1);
    assert_eq!(recorder.analyzed(FURTHER), 0);
}

#[tokio::test]
async fn test_already_clicked_clickables_are_skipped() {
    let recorder = Recorder::default();
    let menu = button(1);
    // A clickable the application renders in its already-used state
    let mut used = Clickable::new("onclick", "li", "/html[1]/body[1]/ul[1]/li[1]");
    used.clicked = true;
    let revealed = used.clone();
    let mut crawler = crawler(
        config(""),
        vec![(START, vec![page_with(vec![menu.clone()])])],
        Box::new(move |page: &Page, _: &Clickable, _: XhrMode| {
            observe(
                page,
                PageContent {
                    clickables: vec![revealed.clone()],
                    ..PageContent::default()
                },
            )
        }),
        &recorder,
    );

    let summary = crawler.run().await.unwrap();

    // The delta is explored but its only clickable is never executed
    assert_eq!(summary.delta_pages, 1);
    let targets: Vec<String> = recorder.executed().into_iter().map(|c| c.target).collect();
    assert_eq!(targets, vec![menu.dom_address]);

    let nested = crawler.storage().get_clickables(2).unwrap();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].clickable_type, ClickableType::Unclassified);
}

#[tokio::test]
async fn test_failed_initial_login_aborts_the_run() {
    let recorder = Recorder::default();
    // Submitting the form lands back on the login form
    let mut crawler = crawler_landing_on(
        config(WITH_LOGIN),
        vec![(START, vec![page_with(vec![button(1)])]), (LOGIN, vec![login_page()])],
        Box::new(|_: &Page, _: &Clickable, _: XhrMode| EventOutcome::UnsupportedTag),
        &recorder,
        login_page(),
    );

    let result = crawler.run().await;

    assert!(matches!(result, Err(RippleError::Login(_))));
    assert_eq!(recorder.submissions(), 1);
    assert_eq!(recorder.analyzed(START), 0);
    assert!(recorder.executed().is_empty());
    assert_eq!(crawler.storage().count_pages().unwrap().web, 0);
    assert_eq!(run_status(&crawler), RunStatus::Failed);
}

#[tokio::test]
async fn test_analyzer_failure_marks_url_visited_and_continues() {
    let recorder = Recorder::default();
    let mut start = page_with(vec![]);
    start
        .content
        .links
        .push(Link::new("http://app.test/broken", "/html[1]/body[1]/a[1]"));
    let mut crawler = crawler(
        config(""),
        vec![(START, vec![start])],
        Box::new(|_: &Page, _: &Clickable, _: XhrMode| EventOutcome::UnsupportedTag),
        &recorder,
    );

    let summary = crawler.run().await.unwrap();

    assert_eq!(summary.web_pages, 1);
    assert_eq!(summary.skipped_urls, 1);
    assert_eq!(recorder.analyzed("http://app.test/broken"), 1);

    let urls = crawler.storage().list_urls().unwrap();
    let broken = urls.iter().find(|u| u.url == "http://app.test/broken").unwrap();
    assert_eq!(broken.response_code, Some(0));
    assert_eq!(broken.page_id, None);
    assert_eq!(run_status(&crawler), RunStatus::Completed);
}
