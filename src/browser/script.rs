//! JavaScript injected into the controlled browser

use crate::model::AjaxRequest;
use serde_json::Value;

/// Wraps `XMLHttpRequest` and `fetch` so every backend call is recorded
///
/// Takes one argument: whether calls are swallowed instead of sent. Running
/// it again only flips the flag and clears the recorded calls.
pub const INSTALL_REQUEST_HOOK: &str = r#"
const intercept = arguments[0];
if (!window.__ripple) {
  window.__ripple = { requests: [], intercept: false };
  const open = XMLHttpRequest.prototype.open;
  const send = XMLHttpRequest.prototype.send;
  XMLHttpRequest.prototype.open = function (method, url) {
    this.__rippleRequest = { method: String(method).toUpperCase(), url: String(url), parameters: null };
    return open.apply(this, arguments);
  };
  XMLHttpRequest.prototype.send = function (body) {
    if (this.__rippleRequest) {
      this.__rippleRequest.parameters = body == null ? null : String(body);
      window.__ripple.requests.push(this.__rippleRequest);
    }
    if (window.__ripple.intercept) {
      return;
    }
    return send.apply(this, arguments);
  };
  if (window.fetch) {
    const fetch = window.fetch;
    window.fetch = function (input, init) {
      const url = typeof input === 'string' ? input : (input && input.url) || String(input);
      const method = ((init && init.method) || (input && input.method) || 'GET').toUpperCase();
      const body = init && init.body != null ? String(init.body) : null;
      window.__ripple.requests.push({ method: method, url: url, parameters: body });
      if (window.__ripple.intercept) {
        return new Promise(function () {});
      }
      return fetch.apply(this, arguments);
    };
  }
}
window.__ripple.intercept = intercept;
window.__ripple.requests = [];
"#;

/// Returns the calls recorded since the hook was last installed
pub const COLLECT_REQUESTS: &str = r#"
return window.__ripple ? window.__ripple.requests : [];
"#;

/// Fires one event on the element at an XPath
///
/// Arguments: XPath, event name without the `on` prefix. Returns one of
/// `ok`, `missing`, `unsupported` or `failed`.
pub const DISPATCH_EVENT: &str = r#"
const xpath = arguments[0];
const name = arguments[1];
let el = null;
try {
  el = document.evaluate(xpath, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
} catch (e) {
  return 'missing';
}
if (!el) {
  return 'missing';
}
const tag = el.tagName.toLowerCase();
if (name === 'submit' && tag !== 'form') {
  return 'unsupported';
}
if ((name === 'change' || name === 'input') && ['input', 'select', 'textarea'].indexOf(tag) < 0 && !el.isContentEditable) {
  return 'unsupported';
}
try {
  if (name === 'click' && typeof el.click === 'function') {
    el.click();
  } else if (name.indexOf('key') === 0) {
    el.dispatchEvent(new KeyboardEvent(name, { bubbles: true, cancelable: true }));
  } else if (name.indexOf('mouse') === 0 || name === 'dblclick') {
    el.dispatchEvent(new MouseEvent(name, { bubbles: true, cancelable: true, view: window }));
  } else if (name === 'focus' || name === 'blur') {
    el.dispatchEvent(new FocusEvent(name));
  } else {
    el.dispatchEvent(new Event(name, { bubbles: true, cancelable: true }));
  }
} catch (e) {
  return 'failed';
}
return 'ok';
"#;

/// What `DISPATCH_EVENT` reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    Fired,
    Missing,
    Unsupported,
    Failed,
}

impl DispatchStatus {
    pub fn from_script_value(value: &Value) -> Self {
        match value.as_str() {
            Some("ok") => Self::Fired,
            Some("missing") => Self::Missing,
            Some("unsupported") => Self::Unsupported,
            _ => Self::Failed,
        }
    }
}

/// Converts the value returned by `COLLECT_REQUESTS`, skipping malformed entries
pub fn parse_requests(value: Value) -> Vec<AjaxRequest> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dispatch_status() {
        assert_eq!(DispatchStatus::from_script_value(&json!("ok")), DispatchStatus::Fired);
        assert_eq!(DispatchStatus::from_script_value(&json!("missing")), DispatchStatus::Missing);
        assert_eq!(
            DispatchStatus::from_script_value(&json!("unsupported")),
            DispatchStatus::Unsupported
        );
        assert_eq!(DispatchStatus::from_script_value(&Value::Null), DispatchStatus::Failed);
    }

    #[test]
    fn test_parse_requests() {
        let value = json!([
            { "method": "GET", "url": "/api/items", "parameters": null },
            { "method": "POST", "url": "/api/save", "parameters": "id=1" },
            { "unexpected": true }
        ]);
        let requests = parse_requests(value);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].parameters.as_deref(), Some("id=1"));

        assert!(parse_requests(json!({})).is_empty());
    }
}
