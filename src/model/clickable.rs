/// Clickable definitions and their classification tags
///
/// A clickable is a DOM element with an event handler attached. Its
/// `clickable_type` records, after the fact, why the element was or was not
/// explored further.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a clickable after it has been executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClickableType {
    /// Never executed, or execution did not finish this round
    #[default]
    Unclassified,

    /// Rejected by the crawl policy filter
    IgnoredByCrawler,

    /// The event or the element's tag cannot be triggered
    UnsupportedEvent,

    /// The target element could not be found or the page failed to load
    Error,

    /// Executing the event navigated to another URL
    Link,

    /// Executing the event only sent backend requests
    SendingAjax,

    /// Executing the event only had a transient visual effect
    UiChange,

    /// Executing the event produced new links, forms or clickables
    CreatesNewNavigatables,
}

impl ClickableType {
    /// Returns true once the crawler has characterized the clickable
    ///
    /// Known clickables are replayed with their backend requests let through;
    /// unknown ones are executed with every backend request intercepted.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unclassified)
    }

    /// Converts the type to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::IgnoredByCrawler => "ignored_by_crawler",
            Self::UnsupportedEvent => "unsupported_event",
            Self::Error => "error",
            Self::Link => "link",
            Self::SendingAjax => "sending_ajax",
            Self::UiChange => "ui_change",
            Self::CreatesNewNavigatables => "creates_new_navigatables",
        }
    }

    /// Parses a type from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "unclassified" => Some(Self::Unclassified),
            "ignored_by_crawler" => Some(Self::IgnoredByCrawler),
            "unsupported_event" => Some(Self::UnsupportedEvent),
            "error" => Some(Self::Error),
            "link" => Some(Self::Link),
            "sending_ajax" => Some(Self::SendingAjax),
            "ui_change" => Some(Self::UiChange),
            "creates_new_navigatables" => Some(Self::CreatesNewNavigatables),
            _ => None,
        }
    }

    /// Returns all clickable types
    pub fn all_types() -> Vec<Self> {
        vec![
            Self::Unclassified,
            Self::IgnoredByCrawler,
            Self::UnsupportedEvent,
            Self::Error,
            Self::Link,
            Self::SendingAjax,
            Self::UiChange,
            Self::CreatesNewNavigatables,
        ]
    }
}

impl fmt::Display for ClickableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// An actionable DOM element
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Clickable {
    /// Event name as found in the markup, e.g. `onclick` or `click`
    pub event: String,

    /// Tag name of the element
    pub tag: String,

    /// Absolute XPath of the element
    pub dom_address: String,

    pub html_id: Option<String>,

    pub html_class: Option<String>,

    pub clickable_type: ClickableType,

    pub clicked: bool,

    /// Delta depth of the state this clickable produced
    pub clickable_depth: Option<u32>,

    /// Destination when the clickable behaves as a navigation link
    pub links_to: Option<String>,
}

impl Clickable {
    pub fn new(event: &str, tag: &str, dom_address: &str) -> Self {
        Self {
            event: event.to_string(),
            tag: tag.to_string(),
            dom_address: dom_address.to_string(),
            ..Self::default()
        }
    }

    /// Event name without the inline-handler `on` prefix
    pub fn normalized_event(&self) -> &str {
        self.event.strip_prefix("on").unwrap_or(&self.event)
    }

    /// Key that two clickables share exactly when they are equal
    pub fn locator(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.normalized_event(),
            self.tag,
            self.dom_address,
            self.html_id.as_deref().unwrap_or("")
        )
    }
}

/// Clickables are the same element when their locator matches; execution
/// state (`clicked`, `clickable_type`, depth) is not part of the identity.
impl PartialEq for Clickable {
    fn eq(&self, other: &Self) -> bool {
        self.normalized_event() == other.normalized_event()
            && self.tag == other.tag
            && self.dom_address == other.dom_address
            && self.html_id == other.html_id
    }
}

impl Eq for Clickable {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_string_covers_every_type() {
        for clickable_type in ClickableType::all_types() {
            let parsed = ClickableType::from_db_string(clickable_type.to_db_string());
            assert_eq!(parsed, Some(clickable_type));
        }
        assert_eq!(ClickableType::from_db_string("bogus"), None);
    }

    #[test]
    fn test_is_known() {
        assert!(!ClickableType::Unclassified.is_known());
        assert!(ClickableType::SendingAjax.is_known());
        assert!(ClickableType::UiChange.is_known());
    }

    #[test]
    fn test_normalized_event_strips_on_prefix() {
        assert_eq!(Clickable::new("onclick", "div", "/html[1]").normalized_event(), "click");
        assert_eq!(Clickable::new("click", "div", "/html[1]").normalized_event(), "click");
        assert_eq!(Clickable::new("change", "select", "/html[1]").normalized_event(), "change");
    }

    #[test]
    fn test_equality_ignores_execution_state() {
        let a = Clickable::new("onclick", "a", "/html[1]/body[1]/a[1]");
        let mut b = a.clone();
        b.clicked = true;
        b.clickable_type = ClickableType::UiChange;
        b.clickable_depth = Some(2);
        assert_eq!(a, b);

        let c = Clickable::new("onclick", "a", "/html[1]/body[1]/a[2]");
        assert_ne!(a, c);
    }
}
