//! DOM Collector - candidate inputs across shadow trees and frames
//!
//! Order: light tree of the document, then shadow roots (per host in
//! document order, recursively), then the content documents of same-origin
//! iframes. Cross-origin frames are skipped.

use serde::{Deserialize, Serialize};

use crate::dom::{Dom, NodeId, SelectorList};
use crate::matcher::confidence::{score, Confidence};
use crate::matcher::exclusion::is_excluded;
use crate::matcher::identifier::{identify, Classification, MatchContext};

/// One field found by a scan
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedField {
    pub element: NodeId,
    pub field_key: String,
    pub category: String,
    pub label: String,
    pub original_identifier: String,
    pub classification: Classification,
    pub confidence: Confidence,
}

/// Controls matching `selector` under `root` and inside every shadow root
/// hosted below it. Site selectors may match wrappers; only form controls
/// and contenteditable elements can take a value.
fn collect_tree(dom: &Dom, root: NodeId, selector: &SelectorList, out: &mut Vec<NodeId>) {
    out.extend(
        dom.query_selector_all(root, selector)
            .into_iter()
            .filter(|id| dom.is_form_control(*id) || dom.is_content_editable(*id)),
    );
    for host in dom.descendants(root) {
        if let Some(shadow) = dom.element(host).and_then(|el| el.shadow_root) {
            collect_tree(dom, shadow, selector, out);
        }
    }
}

/// All elements matching `selector` reachable from document `doc`
pub fn collect_inputs(dom: &Dom, doc: NodeId, selector: &SelectorList) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_tree(dom, doc, selector, &mut out);

    for frame in dom.descendants(doc) {
        if dom.tag(frame) != Some("iframe") {
            continue;
        }
        match dom.content_document(frame) {
            Ok(Some(inner)) => out.extend(collect_inputs(dom, inner, selector)),
            Ok(None) => {}
            Err(e) => {
                console_log!("[FillCore] Skipping frame: {}", e);
            }
        }
    }
    out
}

/// Non-excluded inputs that are still blank. Exclusion runs first so an
/// excluded element's value is never read.
pub fn collect_candidates(dom: &Dom, doc: NodeId, selector: &SelectorList) -> Vec<NodeId> {
    collect_inputs(dom, doc, selector)
        .into_iter()
        .filter(|id| !is_excluded(dom, *id))
        .filter(|id| dom.value(*id).map(|v| v.trim().is_empty()).unwrap_or(true))
        .collect()
}

/// Collect and classify. Excluded and unidentifiable elements drop out.
pub fn detect_fields(ctx: &MatchContext<'_>, dom: &Dom, selector: &SelectorList) -> Vec<DetectedField> {
    collect_candidates(dom, dom.main_document(), selector)
        .into_iter()
        .filter_map(|element| {
            let classification = identify(ctx, dom, element)?;
            let input_type = dom.input_type(element);
            let confidence = score(&classification, input_type.as_deref());
            Some(DetectedField {
                element,
                field_key: classification.key().to_string(),
                category: classification.category().to_string(),
                label: classification.label.clone(),
                original_identifier: classification.identifier.clone(),
                classification,
                confidence,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> SelectorList {
        SelectorList::parse("input, select, textarea").unwrap()
    }

    #[test]
    fn test_order_light_then_shadow_then_frames() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let host = dom.append_element(doc, "x-field", &[]);
        let shadow = dom.attach_shadow(host);
        let in_shadow = dom.append_element(shadow, "input", &[("name", "s")]);
        let nested_host = dom.append_element(shadow, "x-inner", &[]);
        let nested = dom.attach_shadow(nested_host);
        let in_nested = dom.append_element(nested, "input", &[("name", "n")]);
        let frame = dom.append_element(doc, "iframe", &[]);
        let frame_doc = dom.attach_frame_document(frame, "https://a.test");
        let in_frame = dom.append_element(frame_doc, "input", &[("name", "f")]);
        let light = dom.append_element(doc, "input", &[("name", "l")]);

        let found = collect_inputs(&dom, doc, &inputs());
        assert_eq!(found, vec![light, in_shadow, in_nested, in_frame]);
    }

    #[test]
    fn test_cross_origin_frame_is_skipped() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let frame = dom.append_element(doc, "iframe", &[]);
        let frame_doc = dom.attach_frame_document(frame, "https://pay.other.test");
        dom.append_element(frame_doc, "input", &[("name", "f")]);
        let light = dom.append_element(doc, "input", &[("name", "l")]);

        assert_eq!(collect_inputs(&dom, doc, &inputs()), vec![light]);
    }

    #[test]
    fn test_candidates_skip_prefilled() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let filled = dom.append_element(doc, "input", &[("name", "city"), ("value", "Oslo")]);
        let blank = dom.append_element(doc, "input", &[("name", "zip"), ("value", "   ")]);

        let found = collect_candidates(&dom, doc, &inputs());
        assert!(!found.contains(&filled));
        assert_eq!(found, vec![blank]);
    }

    #[test]
    fn test_excluded_values_are_never_read() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let password = dom.append_element(doc, "input", &[("type", "password"), ("name", "pw"), ("value", "hunter2")]);
        let ssn = dom.append_element(doc, "input", &[("name", "ssn"), ("value", "123-45-6789")]);
        let city = dom.append_element(doc, "input", &[("name", "city")]);

        let found = collect_candidates(&dom, doc, &inputs());
        assert_eq!(found, vec![city]);
        let read = dom.values_read();
        assert!(!read.contains(&password));
        assert!(!read.contains(&ssn));
        assert!(read.contains(&city));
    }

    #[test]
    fn test_site_selector_wrappers_are_not_collected() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let wrapper = dom.append_element(doc, "div", &[("data-automation-id", "email")]);
        let input = dom.append_element(wrapper, "input", &[("data-automation-id", "email-input")]);
        let editor = dom.append_element(doc, "div", &[("data-automation-id", "summary"), ("contenteditable", "true")]);

        let selector = SelectorList::parse("input, [data-automation-id]").unwrap();
        assert_eq!(collect_inputs(&dom, doc, &selector), vec![input, editor]);
    }
}
