//! Exclusion Filter - elements the engine must never touch
//!
//! Checked before identification and before learning. An excluded element is
//! never classified, filled or learned from, and its value is never read:
//! the type check runs first and the identifier composition only looks at
//! attributes and label text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::dom::{Dom, NodeId, SelectorList};
use crate::matcher::label::composed_identifier;
use crate::matcher::patterns::compile_ci;

/// Input types that never take profile data
const NON_FILLABLE_TYPES: &[&str] = &[
    "hidden", "submit", "button", "reset", "file", "image", "checkbox", "radio", "password",
];

/// Sensitive or security-relevant identifiers
const BLACKLIST: &[&str] = &[
    r"password", r"passwd", r"pwd",
    r"credit.?card", r"card.?number", r"cvv", r"cvc", r"expir",
    r"ssn", r"social.?security",
    r"captcha", r"recaptcha",
    r"security.?code", r"security.?question", r"security.?answer",
    r"otp", r"verification", r"verify", r"code",
    r"token", r"csrf", r"nonce",
    r"hidden", r"consent", r"gdpr", r"terms", r"agree",
];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum ExclusionReason {
    NonFillableType(String),
    Disabled,
    ReadOnly,
    /// Source of the blacklist pattern that matched
    Blacklisted(String),
    Invisible,
}

fn blacklist() -> &'static [Regex] {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| BLACKLIST.iter().map(|p| compile_ci(p)).collect())
}

fn accessible_selector() -> &'static SelectorList {
    static SELECTOR: OnceLock<SelectorList> = OnceLock::new();
    SELECTOR.get_or_init(|| SelectorList::parse(r#"[aria-hidden="false"]"#).unwrap())
}

/// First blacklist pattern matching a composed identifier
pub fn blacklist_match(identifier: &str) -> Option<&'static str> {
    blacklist()
        .iter()
        .zip(BLACKLIST.iter())
        .find(|(re, _)| re.is_match(identifier))
        .map(|(_, source)| *source)
}

/// Why `input` is excluded, if it is
pub fn exclusion_reason(dom: &Dom, input: NodeId) -> Option<ExclusionReason> {
    if let Some(kind) = dom.input_type(input) {
        if NON_FILLABLE_TYPES.contains(&kind.as_str()) {
            return Some(ExclusionReason::NonFillableType(kind));
        }
    }
    if dom.is_disabled(input) {
        return Some(ExclusionReason::Disabled);
    }
    if dom.is_read_only(input) {
        return Some(ExclusionReason::ReadOnly);
    }
    if let Some(pattern) = blacklist_match(&composed_identifier(dom, input)) {
        return Some(ExclusionReason::Blacklisted(pattern.to_string()));
    }
    if is_invisible(dom, input) {
        return Some(ExclusionReason::Invisible);
    }
    None
}

pub fn is_excluded(dom: &Dom, input: NodeId) -> bool {
    exclusion_reason(dom, input).is_some()
}

/// No layout box and CSS-hidden, unless marked `aria-hidden="false"`
fn is_invisible(dom: &Dom, input: NodeId) -> bool {
    let Some(el) = dom.element(input) else {
        return true;
    };
    if el.layout.has_box || dom.closest(input, accessible_selector()).is_some() {
        return false;
    }
    el.layout.display_none || el.layout.visibility_hidden
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Layout;

    fn single(attrs: &[(&str, &str)]) -> (Dom, NodeId) {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let input = dom.append_element(doc, "input", attrs);
        (dom, input)
    }

    #[test]
    fn test_password_type_excluded_regardless_of_name() {
        let (dom, input) = single(&[("type", "password"), ("name", "first_name")]);
        assert_eq!(
            exclusion_reason(&dom, input),
            Some(ExclusionReason::NonFillableType("password".into()))
        );
    }

    #[test]
    fn test_non_fillable_types() {
        for kind in ["hidden", "submit", "checkbox", "radio", "file"] {
            let (dom, input) = single(&[("type", kind), ("name", "city")]);
            assert!(is_excluded(&dom, input), "{} should be excluded", kind);
        }
    }

    #[test]
    fn test_disabled_and_readonly() {
        let (dom, input) = single(&[("name", "city"), ("disabled", "")]);
        assert_eq!(exclusion_reason(&dom, input), Some(ExclusionReason::Disabled));
        let (dom, input) = single(&[("name", "city"), ("readonly", "")]);
        assert_eq!(exclusion_reason(&dom, input), Some(ExclusionReason::ReadOnly));
    }

    #[test]
    fn test_blacklisted_identifiers() {
        for name in ["ssn", "cardNumber", "cvv", "otp_input", "csrf_token", "accept_terms", "captcha"] {
            let (dom, input) = single(&[("name", name)]);
            assert!(
                matches!(exclusion_reason(&dom, input), Some(ExclusionReason::Blacklisted(_))),
                "{} should be blacklisted",
                name
            );
        }
    }

    #[test]
    fn test_blacklist_sees_label_text() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let label = dom.append_element(doc, "label", &[("for", "f1")]);
        dom.append_text(label, "Social Security Number");
        let input = dom.append_element(doc, "input", &[("id", "f1")]);
        assert_eq!(
            exclusion_reason(&dom, input),
            Some(ExclusionReason::Blacklisted(r"social.?security".into()))
        );
    }

    #[test]
    fn test_invisible_unless_marked_accessible() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let hidden = dom.append_element(doc, "input", &[("name", "city")]);
        dom.element_mut(hidden).unwrap().layout = Layout::hidden();
        assert_eq!(exclusion_reason(&dom, hidden), Some(ExclusionReason::Invisible));

        let wrapper = dom.append_element(doc, "div", &[("aria-hidden", "false")]);
        let accessible = dom.append_element(wrapper, "input", &[("name", "city")]);
        dom.element_mut(accessible).unwrap().layout = Layout::hidden();
        assert!(!is_excluded(&dom, accessible));
    }

    #[test]
    fn test_boxless_but_not_css_hidden_is_kept() {
        let (mut dom, input) = single(&[("name", "city")]);
        dom.element_mut(input).unwrap().layout.has_box = false;
        assert!(!is_excluded(&dom, input));
    }

    #[test]
    fn test_plain_field_not_excluded() {
        let (dom, input) = single(&[("name", "email_address")]);
        assert_eq!(exclusion_reason(&dom, input), None);
    }
}
