//! Turns a [`bench_types::Selector`] into a JS snippet that locates the
//! target element, mirroring the DOM-probe-script technique used
//! elsewhere in the corpus for anchor resolution over CDP.

use bench_types::Selector;

pub fn locator_snippet(selector: &Selector) -> String {
    match selector {
        Selector::Css { expr } => {
            let expr = serde_json::to_string(expr).unwrap_or_else(|_| "''".to_string());
            format!("const el = document.querySelector({expr});")
        }
        Selector::XPath { expr } => {
            let expr = serde_json::to_string(expr).unwrap_or_else(|_| "''".to_string());
            format!(
                "const el = document.evaluate({expr}, document, null, \
                 XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;"
            )
        }
        Selector::AttributeValue { attr, value } => {
            let attr = serde_json::to_string(attr).unwrap_or_else(|_| "''".to_string());
            let value = serde_json::to_string(value).unwrap_or_else(|_| "''".to_string());
            format!(
                "const attrName = {attr};\n\
                 const attrValue = {value};\n\
                 const el = Array.from(document.querySelectorAll('[' + attrName + ']'))\n\
                     .find(node => node.getAttribute(attrName) === attrValue);"
            )
        }
    }
}

/// Wrap a locator with an action body; the whole thing is evaluated in
/// page context and returns `{found, ...}` as JSON.
pub fn probe_script(selector: &Selector, body: &str) -> String {
    let locator = locator_snippet(selector);
    format!(
        r#"(() => {{
            {locator}
            if (!el) {{ return {{ found: false }}; }}
            {body}
        }})()"#
    )
}
