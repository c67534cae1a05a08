//! Page states explored by the crawler
//!
//! A `WebPage` is a fully loaded, addressable state reached by a plain
//! navigation. A `DeltaPage` is the state produced by executing one clickable
//! on a parent state and only carries what that execution added.

use crate::model::Clickable;
use serde::{Deserialize, Serialize};

/// Identity of a persisted page or delta page
pub type PageId = i64;

/// A navigation link found in the markup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub dom_address: String,
    pub html_id: Option<String>,
    pub html_class: Option<String>,
}

impl Link {
    pub fn new(url: &str, dom_address: &str) -> Self {
        Self {
            url: url.to_string(),
            dom_address: dom_address.to_string(),
            ..Self::default()
        }
    }
}

/// Links are compared by destination only; the same link moved around the
/// DOM by an interaction is not new content.
impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Link {}

/// A named form field
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormInput {
    pub name: String,
    pub input_type: String,
    pub value: Option<String>,
}

/// A form found in the markup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Form {
    pub action: String,
    pub method: String,
    pub dom_address: String,
    pub inputs: Vec<FormInput>,
}

impl Form {
    /// Sorted field names, the part of a form that identifies it
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inputs.iter().map(|i| i.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Serialized form used when searching for credential fields
    pub fn signature(&self) -> String {
        format!(
            "{} {} [{}]",
            self.method,
            self.action,
            self.inputs
                .iter()
                .map(|i| format!("{}:{}", i.input_type, i.name))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl PartialEq for Form {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action
            && self.method.eq_ignore_ascii_case(&other.method)
            && self.field_names() == other.field_names()
    }
}

impl Eq for Form {}

/// A backend call (XHR or fetch) observed while loading a page or executing a clickable
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AjaxRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub parameters: Option<String>,
}

/// The four content collections every page state carries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub clickables: Vec<Clickable>,
    pub links: Vec<Link>,
    pub forms: Vec<Form>,
    pub ajax_requests: Vec<AjaxRequest>,
}

impl PageContent {
    pub fn is_empty(&self) -> bool {
        self.clickables.is_empty()
            && self.links.is_empty()
            && self.forms.is_empty()
            && self.ajax_requests.is_empty()
    }
}

/// A page reached by navigating to a URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebPage {
    pub id: PageId,
    pub url: String,
    pub html: String,
    /// Interaction-free crawl depth
    pub current_depth: u32,
    pub content: PageContent,
    /// Requests fired by timers after the page finished loading
    pub timing_requests: Vec<AjaxRequest>,
}

impl WebPage {
    pub fn new(id: PageId, url: &str, html: &str) -> Self {
        Self {
            id,
            url: url.to_string(),
            html: html.to_string(),
            ..Self::default()
        }
    }
}

/// The state change produced by executing one clickable on a parent state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeltaPage {
    pub id: PageId,
    pub url: String,
    pub html: String,
    pub current_depth: u32,
    /// Number of chained interactions that lead to this state
    pub delta_depth: u32,
    /// Page this delta was observed on; owned by persistence
    pub parent_id: PageId,
    /// The clickable whose execution produced this delta
    pub generator: Clickable,
    /// Backend requests the generator sends when replayed
    pub generator_requests: Vec<AjaxRequest>,
    pub content: PageContent,
}

/// Either kind of explored state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Page {
    Web(WebPage),
    Delta(DeltaPage),
}

impl Page {
    pub fn id(&self) -> PageId {
        match self {
            Self::Web(p) => p.id,
            Self::Delta(p) => p.id,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Web(p) => &p.url,
            Self::Delta(p) => &p.url,
        }
    }

    pub fn html(&self) -> &str {
        match self {
            Self::Web(p) => &p.html,
            Self::Delta(p) => &p.html,
        }
    }

    pub fn current_depth(&self) -> u32 {
        match self {
            Self::Web(p) => p.current_depth,
            Self::Delta(p) => p.current_depth,
        }
    }

    /// Delta depth of the state; plain web pages sit at zero
    pub fn delta_depth(&self) -> u32 {
        match self {
            Self::Web(_) => 0,
            Self::Delta(p) => p.delta_depth,
        }
    }

    pub fn content(&self) -> &PageContent {
        match self {
            Self::Web(p) => &p.content,
            Self::Delta(p) => &p.content,
        }
    }

    pub fn content_mut(&mut self) -> &mut PageContent {
        match self {
            Self::Web(p) => &mut p.content,
            Self::Delta(p) => &mut p.content,
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(self, Self::Delta(_))
    }
}
