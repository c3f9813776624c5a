//! Label resolution and the composed field identifier
//!
//! The composed identifier is the single lowercase string every pattern,
//! exclusion and site rule is tested against:
//! name, id, placeholder, aria-label, data-automation-id, data-testid,
//! class and the resolved label, space-joined.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::dom::{Dom, NodeId, SelectorList};

/// Preceding siblings inspected for a label-like element
const MAX_SIBLING_HOPS: usize = 3;

/// Where a resolved label came from
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    ForAttribute,
    LabelledBy,
    AncestorLabel,
    PrecedingSibling,
    ParentSibling,
    /// No label element; placeholder, name or id stood in
    Fallback,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ResolvedLabel {
    pub text: String,
    pub source: LabelSource,
}

impl ResolvedLabel {
    /// Text came from a real label element rather than an attribute fallback
    pub fn is_visible_label(&self) -> bool {
        self.source != LabelSource::Fallback && !self.text.is_empty()
    }
}

fn label_selector() -> &'static SelectorList {
    static SELECTOR: OnceLock<SelectorList> = OnceLock::new();
    SELECTOR.get_or_init(|| SelectorList::parse("label").unwrap())
}

fn is_label_like(dom: &Dom, node: NodeId) -> bool {
    dom.tag(node) == Some("label")
        || dom.element(node).map(|el| el.has_class("label")).unwrap_or(false)
}

/// Resolve the human-readable label of a field
pub fn resolve_label(dom: &Dom, input: NodeId) -> ResolvedLabel {
    let root = dom.root_of(input);
    let found = |text: String, source: LabelSource| ResolvedLabel { text, source };

    // <label for="id">
    if let Some(id) = dom.attr_nonempty(input, "id") {
        let explicit = dom
            .descendants(root)
            .into_iter()
            .find(|n| dom.tag(*n) == Some("label") && dom.attr(*n, "for") == Some(id));
        if let Some(label) = explicit {
            return found(dom.text_content(label).trim().to_string(), LabelSource::ForAttribute);
        }
    }

    // aria-labelledby (space separated id list)
    if let Some(ids) = dom.attr_nonempty(input, "aria-labelledby") {
        let texts: Vec<String> = ids
            .split_whitespace()
            .filter_map(|id| dom.get_element_by_id(root, id))
            .map(|el| dom.text_content(el).trim().to_string())
            .collect();
        if !texts.is_empty() {
            return found(texts.join(" "), LabelSource::LabelledBy);
        }
    }

    // Wrapping <label>. A typed value is never a text node of the label, so
    // only the control's own text children can leak in (textarea default
    // content, option texts of a select). Those are stripped here instead of
    // the live value, which keeps exclusion from reading values.
    if let Some(label) = dom.closest(input, label_selector()) {
        let own = dom.text_content(input);
        let mut text = dom.text_content(label);
        if !own.is_empty() {
            text = text.replacen(&own, "", 1);
        }
        let text = text.trim();
        if !text.is_empty() {
            return found(text.to_string(), LabelSource::AncestorLabel);
        }
    }

    let mut prev = dom.previous_element_sibling(input);
    for _ in 0..MAX_SIBLING_HOPS {
        let Some(sibling) = prev else { break };
        if is_label_like(dom, sibling) {
            return found(dom.text_content(sibling).trim().to_string(), LabelSource::PrecedingSibling);
        }
        prev = dom.previous_element_sibling(sibling);
    }

    if let Some(parent) = dom.parent_element(input) {
        if let Some(sibling) = dom.previous_element_sibling(parent) {
            if is_label_like(dom, sibling) {
                return found(dom.text_content(sibling).trim().to_string(), LabelSource::ParentSibling);
            }
        }
    }

    let fallback = ["placeholder", "name", "id"]
        .iter()
        .find_map(|attr| dom.attr_nonempty(input, attr))
        .unwrap_or_default();
    found(fallback.to_string(), LabelSource::Fallback)
}

/// Everything the matcher reads from one element, gathered once
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub aria_label: String,
    pub input_type: Option<String>,
    pub label: ResolvedLabel,
    /// Composed, lowercased identifier
    pub identifier: String,
}

impl FieldDescriptor {
    pub fn describe(dom: &Dom, input: NodeId) -> Self {
        let attr = |name: &str| dom.attr(input, name).unwrap_or_default().to_string();
        let label = resolve_label(dom, input);
        let identifier = [
            attr("name"),
            attr("id"),
            attr("placeholder"),
            attr("aria-label"),
            attr("data-automation-id"),
            attr("data-testid"),
            attr("class"),
            label.text.clone(),
        ]
        .join(" ")
        .to_lowercase();

        Self {
            name: attr("name"),
            id: attr("id"),
            placeholder: attr("placeholder"),
            aria_label: attr("aria-label"),
            input_type: dom.input_type(input),
            label,
            identifier,
        }
    }
}

/// Composed identifier for `input`
pub fn composed_identifier(dom: &Dom, input: NodeId) -> String {
    FieldDescriptor::describe(dom, input).identifier
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_for_attribute() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let label = dom.append_element(doc, "label", &[("for", "given")]);
        dom.append_text(label, "  Given Name ");
        let input = dom.append_element(doc, "input", &[("id", "given")]);

        let resolved = resolve_label(&dom, input);
        assert_eq!(resolved.text, "Given Name");
        assert_eq!(resolved.source, LabelSource::ForAttribute);
    }

    #[test]
    fn test_label_aria_labelledby() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let span = dom.append_element(doc, "span", &[("id", "lbl")]);
        dom.append_text(span, "Work Email");
        let input = dom.append_element(doc, "input", &[("aria-labelledby", "lbl")]);

        assert_eq!(resolve_label(&dom, input).source, LabelSource::LabelledBy);
        assert_eq!(resolve_label(&dom, input).text, "Work Email");
    }

    #[test]
    fn test_label_ancestor_strips_own_text() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let label = dom.append_element(doc, "label", &[]);
        dom.append_text(label, "Cover note ");
        let textarea = dom.append_element(label, "textarea", &[]);
        dom.append_text(textarea, "draft");

        let resolved = resolve_label(&dom, textarea);
        assert_eq!(resolved.text, "Cover note");
        assert_eq!(resolved.source, LabelSource::AncestorLabel);
    }

    #[test]
    fn test_label_preceding_sibling_within_three_hops() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let label = dom.append_element(doc, "div", &[("class", "label")]);
        dom.append_text(label, "City");
        dom.append_element(doc, "span", &[]);
        dom.append_element(doc, "br", &[]);
        let input = dom.append_element(doc, "input", &[]);

        assert_eq!(resolve_label(&dom, input).text, "City");

        // a fourth hop is out of reach
        let mut far = Dom::new("https://a.test");
        let doc = far.main_document();
        let label = far.append_element(doc, "label", &[]);
        far.append_text(label, "City");
        for _ in 0..3 {
            far.append_element(doc, "span", &[]);
        }
        let input = far.append_element(doc, "input", &[("name", "c1")]);
        let resolved = resolve_label(&far, input);
        assert_eq!(resolved.source, LabelSource::Fallback);
        assert_eq!(resolved.text, "c1");
    }

    #[test]
    fn test_label_parent_sibling() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let label = dom.append_element(doc, "label", &[]);
        dom.append_text(label, "Surname");
        let wrapper = dom.append_element(doc, "div", &[]);
        let input = dom.append_element(wrapper, "input", &[]);

        let resolved = resolve_label(&dom, input);
        assert_eq!(resolved.text, "Surname");
        assert_eq!(resolved.source, LabelSource::ParentSibling);
    }

    #[test]
    fn test_label_inside_shadow_root() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let host = dom.append_element(doc, "x-input", &[]);
        let shadow = dom.attach_shadow(host);
        let label = dom.append_element(shadow, "label", &[("for", "z")]);
        dom.append_text(label, "Postcode");
        let input = dom.append_element(shadow, "input", &[("id", "z")]);

        assert_eq!(resolve_label(&dom, input).text, "Postcode");
    }

    #[test]
    fn test_composed_identifier_is_lowercase_and_ordered() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let input = dom.append_element(
            doc,
            "input",
            &[("name", "Email_Address"), ("placeholder", "You@Example.com"), ("data-testid", "EM")],
        );
        assert_eq!(
            composed_identifier(&dom, input),
            "email_address  you@example.com   em  you@example.com"
        );
    }

    #[test]
    fn test_label_ancestor_ignores_option_texts_and_values() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let label = dom.append_element(doc, "label", &[]);
        dom.append_text(label, "Country");
        let select = dom.append_element(label, "select", &[]);
        for name in ["France", "Spain"] {
            let option = dom.append_element(select, "option", &[("value", name)]);
            dom.append_text(option, name);
        }
        let other = dom.append_element(doc, "label", &[]);
        dom.append_text(other, "Email");
        let input = dom.append_element(other, "input", &[("value", "ada@example.com")]);

        assert_eq!(resolve_label(&dom, select).text, "Country");
        assert_eq!(resolve_label(&dom, input).text, "Email");
        assert!(dom.values_read().is_empty());
    }
}
