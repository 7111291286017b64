//! JavaScript snippets evaluated in the page to query and drive elements.
//!
//! Every snippet returns a non-null object so CDP always hands back a value.

#![cfg_attr(not(feature = "browser"), allow(dead_code))]

use super::{DocumentScope, ElementRef};

/// Resolves once the document is interactive, or after 10s regardless.
pub const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

fn quote(value: &str) -> String {
    // JSON string literals are valid JavaScript string literals
    serde_json::Value::String(value.to_string()).to_string()
}

/// Expression evaluating to the scope's `Document`, or `null`.
fn root_expression(scope: &DocumentScope) -> String {
    match scope {
        DocumentScope::TopLevel => "document".to_string(),
        DocumentScope::Frame(name) => format!(
            "(() => {{ try {{ const f = window.frames[{}]; return f ? f.document : null; }} catch (e) {{ return null; }} }})()",
            quote(name)
        ),
    }
}

pub fn has_frame(name: &str) -> String {
    format!(
        "(() => {{ try {{ const f = window.frames[{}]; return {{ present: !!(f && f.document) }}; }} catch (e) {{ return {{ present: false }}; }} }})()",
        quote(name)
    )
}

pub fn count(scope: &DocumentScope, selector: &str) -> String {
    format!(
        "(() => {{ const root = {}; if (!root) return {{ attached: false, count: 0 }}; return {{ attached: true, count: root.querySelectorAll({}).length }}; }})()",
        root_expression(scope),
        quote(selector)
    )
}

/// Wrap `body` so it runs with `el` bound to the referenced element.
fn with_element(element: &ElementRef, body: &str) -> String {
    format!(
        "(() => {{ const root = {}; const el = root ? root.querySelectorAll({})[{}] : undefined; if (!el) return {{ found: false }}; {} }})()",
        root_expression(&element.scope),
        quote(&element.selector),
        element.index,
        body
    )
}

pub fn is_visible(element: &ElementRef) -> String {
    with_element(
        element,
        "const view = el.ownerDocument.defaultView || window; \
         const style = view.getComputedStyle(el); \
         const rect = el.getBoundingClientRect(); \
         return { found: true, value: rect.width > 0 && rect.height > 0 \
           && style.visibility !== 'hidden' && style.display !== 'none' };",
    )
}

/// Scroll the element into view and report its centre in top-level
/// viewport coordinates, adding the offset of every enclosing frame.
pub fn click_point(element: &ElementRef) -> String {
    with_element(
        element,
        "el.scrollIntoView({ block: 'center' }); \
         const r = el.getBoundingClientRect(); \
         let x = r.left + r.width / 2; \
         let y = r.top + r.height / 2; \
         let view = el.ownerDocument.defaultView; \
         while (view && view.frameElement) { \
           const host = view.frameElement; \
           const fr = host.getBoundingClientRect(); \
           x += fr.left + host.clientLeft; \
           y += fr.top + host.clientTop; \
           view = view.parent; \
         } \
         return { found: true, value: { x: x, y: y } };",
    )
}

pub fn attribute(element: &ElementRef, name: &str) -> String {
    let body = format!(
        "return {{ found: true, value: el.getAttribute({}) }};",
        quote(name)
    );
    with_element(element, &body)
}
