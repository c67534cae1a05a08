//! Markup extraction for rendered pages
//!
//! This module turns rendered HTML into the content collections the engine
//! works with:
//! - Clickables: elements carrying an inline `on*` event handler
//! - Links: `<a href>` targets worth crawling
//! - Forms: action, method and named fields
//!
//! Every element is located by an absolute XPath so the browser can find it
//! again when the state is replayed.

use crate::model::{Clickable, Form, FormInput, Link, PageContent};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Parses rendered markup into clickables, links and forms
///
/// Ajax observations are never part of the markup, so the returned
/// `ajax_requests` collection is always empty.
///
/// # Example
///
/// ```
/// use delta_ripple::crawler::parse_content;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/next">n</a><div onclick="go()">x</div></body></html>"#;
/// let base = Url::parse("http://localhost:8080/").unwrap();
/// let content = parse_content(html, &base);
/// assert_eq!(content.links[0].url, "http://localhost:8080/next");
/// assert_eq!(content.clickables[0].event, "onclick");
/// ```
pub fn parse_content(html: &str, base_url: &Url) -> PageContent {
    let document = Html::parse_document(html);

    PageContent {
        clickables: extract_clickables(&document),
        links: extract_links(&document, base_url),
        forms: extract_forms(&document, base_url),
        ajax_requests: Vec::new(),
    }
}

fn extract_clickables(document: &Html) -> Vec<Clickable> {
    let mut clickables = Vec::new();

    let Ok(all) = Selector::parse("*") else {
        return clickables;
    };

    for element in document.select(&all) {
        let value = element.value();
        for (name, _) in value.attrs() {
            let name = name.to_ascii_lowercase();
            if name.len() <= 2 || !name.starts_with("on") {
                continue;
            }
            let mut clickable = Clickable::new(&name, value.name(), &xpath_of(element));
            clickable.html_id = value.attr("id").map(str::to_string);
            clickable.html_class = value.attr("class").map(str::to_string);
            clickables.push(clickable);
        }
    }

    clickables
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<Link> {
    let mut links = Vec::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };

        links.push(Link {
            url,
            dom_address: xpath_of(element),
            html_id: element.value().attr("id").map(str::to_string),
            html_class: element.value().attr("class").map(str::to_string),
        });
    }

    links
}

fn extract_forms(document: &Html, base_url: &Url) -> Vec<Form> {
    let mut forms = Vec::new();

    let (Ok(form_selector), Ok(field_selector)) = (
        Selector::parse("form"),
        Selector::parse("input[name], select[name], textarea[name], button[name]"),
    ) else {
        return forms;
    };

    for element in document.select(&form_selector) {
        let action = match element.value().attr("action").map(str::trim) {
            Some(action) if !action.is_empty() => {
                resolve_link(action, base_url).unwrap_or_else(|| action.to_string())
            }
            _ => base_url.to_string(),
        };

        let method = element
            .value()
            .attr("method")
            .map(|m| m.trim().to_uppercase())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "GET".to_string());

        let inputs = element
            .select(&field_selector)
            .filter_map(|field| {
                let value = field.value();
                let name = value.attr("name")?.to_string();
                let input_type = match value.name() {
                    "input" => value.attr("type").unwrap_or("text").to_lowercase(),
                    other => other.to_string(),
                };
                Some(FormInput {
                    name,
                    input_type,
                    value: value.attr("value").map(str::to_string),
                })
            })
            .collect();

        forms.push(Form {
            action,
            method,
            dom_address: xpath_of(element),
            inputs,
        });
    }

    forms
}

/// Computes the absolute XPath of an element, e.g. `/html[1]/body[1]/div[2]`
pub fn xpath_of(element: ElementRef) -> String {
    let mut steps = Vec::new();
    let mut node = Some(*element);

    while let Some(current) = node {
        if let Some(el) = current.value().as_element() {
            let name = el.name();
            let index = 1 + current
                .prev_siblings()
                .filter(|sibling| {
                    sibling
                        .value()
                        .as_element()
                        .map_or(false, |s| s.name() == name)
                })
                .count();
            steps.push(format!("{}[{}]", name, index));
        }
        node = current.parent();
    }

    steps.reverse();
    format!("/{}", steps.join("/"))
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}
