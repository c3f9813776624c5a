//! Fill Executor and autofill ledger
//!
//! Values go through the native setter so a framework value tracker sees
//! the change on the following `input` event. Every fill is recorded so a
//! later user edit can be offered back for relearning.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::dom::{Dom, EventKind, NodeId};
use crate::error::FillError;

/// Synthetic events dispatched after a value is set, in dispatch order
pub const FILL_EVENTS: [EventKind; 6] = [
    EventKind::Input,
    EventKind::Change,
    EventKind::Blur,
    EventKind::Keydown,
    EventKind::Keyup,
    EventKind::Keypress,
];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FillOutcome {
    /// Value applied; the element is focused and awaits a delayed blur
    Filled { element: NodeId, value: String },
    /// `<select>` without a matching option; nothing touched
    NoMatchingOption { element: NodeId },
}

impl FillOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, FillOutcome::Filled { .. })
    }
}

/// Option to pick for `value`: exact value match first, then text
/// containment either way. Options with empty text never match by
/// containment.
pub fn match_option(dom: &Dom, select: NodeId, value: &str) -> Option<NodeId> {
    let wanted = value.to_lowercase();
    let options = dom.options(select);

    if let Some(found) = options
        .iter()
        .find(|opt| dom.option_value(**opt).to_lowercase() == wanted)
    {
        return Some(*found);
    }

    options.into_iter().find(|opt| {
        let text = dom.option_text(*opt).to_lowercase();
        !text.is_empty() && (text.contains(&wanted) || wanted.contains(&text))
    })
}

/// Apply `value` to `element` and fire the synthetic event sequence
pub fn fill(dom: &mut Dom, element: NodeId, value: &str) -> Result<FillOutcome, FillError> {
    let tag = dom.tag(element).ok_or(FillError::NodeNotFound(element))?.to_string();

    if tag == "select" {
        let Some(option) = match_option(dom, element, value) else {
            return Ok(FillOutcome::NoMatchingOption { element });
        };
        let option_value = dom.option_value(option);
        dom.set_value_native(element, &option_value)?;
    } else if dom.is_content_editable(element) {
        dom.set_text_content(element, value)?;
    } else if tag == "input" || tag == "textarea" {
        dom.set_value_native(element, value)?;
    } else {
        return Err(FillError::NotFillable(element));
    }

    for kind in FILL_EVENTS {
        dom.dispatch_event(element, kind, true, true);
    }
    dom.focus(element);

    Ok(FillOutcome::Filled {
        element,
        value: dom.value(element).unwrap_or_default(),
    })
}

// =============================================================================
// Batch fill
// =============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FillItem {
    pub element: NodeId,
    pub value: String,
    pub field_key: String,
    pub category: String,
}

/// One applied fill, with the value the element now holds
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilledField {
    pub element: NodeId,
    pub value: String,
    pub field_key: String,
    pub category: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FillReport {
    pub filled: Vec<FilledField>,
    pub unmatched: Vec<NodeId>,
    /// Items that could not be applied, with the reason
    pub skipped: Vec<(NodeId, String)>,
}

impl FillReport {
    pub fn filled_elements(&self) -> Vec<NodeId> {
        self.filled.iter().map(|f| f.element).collect()
    }
}

/// Fill every item, recording successes in `ledger`. A bad item is logged
/// and skipped; the batch continues.
pub fn fill_all(dom: &mut Dom, ledger: &mut AutofillLedger, items: &[FillItem]) -> FillReport {
    let mut report = FillReport::default();
    for item in items {
        match fill(dom, item.element, &item.value) {
            Ok(FillOutcome::Filled { element, value }) => {
                ledger.record(element, &value, &item.field_key, &item.category);
                report.filled.push(FilledField {
                    element,
                    value,
                    field_key: item.field_key.clone(),
                    category: item.category.clone(),
                });
            }
            Ok(FillOutcome::NoMatchingOption { element }) => report.unmatched.push(element),
            Err(e) => {
                console_warn!("[FillCore] Skipping fill of {}: {}", item.field_key, e);
                report.skipped.push((item.element, e.to_string()));
            }
        }
    }
    console_log!("[FillCore] Filled {} fields", report.filled.len());
    report
}

// =============================================================================
// Autofill ledger
// =============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutofillRecord {
    pub original_value: String,
    pub field_key: String,
    pub category: String,
}

/// Offer to update the stored value after the user corrected an autofill
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionPrompt {
    pub element: NodeId,
    pub field_key: String,
    pub category: String,
    pub old_value: String,
    pub new_value: String,
}

#[derive(Debug, Clone, Default)]
pub struct AutofillLedger {
    records: HashMap<NodeId, AutofillRecord>,
}

impl AutofillLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, element: NodeId, value: &str, field_key: &str, category: &str) {
        self.records.insert(
            element,
            AutofillRecord {
                original_value: value.to_string(),
                field_key: field_key.to_string(),
                category: category.to_string(),
            },
        );
    }

    pub fn get(&self, element: NodeId) -> Option<&AutofillRecord> {
        self.records.get(&element)
    }

    /// Compare the element's current value with what was filled. A
    /// non-blank difference yields one prompt per distinct edit.
    pub fn on_user_edit(&mut self, dom: &Dom, element: NodeId) -> Option<CorrectionPrompt> {
        let record = self.records.get_mut(&element)?;
        let current = dom.value(element)?;
        let current = current.trim();
        if current.is_empty() || current == record.original_value {
            return None;
        }
        let prompt = CorrectionPrompt {
            element,
            field_key: record.field_key.clone(),
            category: record.category.clone(),
            old_value: std::mem::replace(&mut record.original_value, current.to_string()),
            new_value: current.to_string(),
        };
        Some(prompt)
    }

    pub fn forget(&mut self, element: NodeId) -> Option<AutofillRecord> {
        self.records.remove(&element)
    }

    /// Drop records of elements no longer in the page
    pub fn prune(&mut self, dom: &Dom) {
        self.records.retain(|element, _| dom.contains(*element));
    }

    /// Rekey records after the page model was rebuilt; unmapped records drop
    pub fn remap(&mut self, map: impl Fn(NodeId) -> Option<NodeId>) {
        self.records = std::mem::take(&mut self.records)
            .into_iter()
            .filter_map(|(element, record)| map(element).map(|new| (new, record)))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;

    fn select_with(dom: &mut Dom, options: &[(&str, &str)]) -> NodeId {
        let doc = dom.main_document();
        let select = dom.append_element(doc, "select", &[("name", "country")]);
        for (value, text) in options {
            let opt = dom.append_element(select, "option", &[("value", value)]);
            dom.append_text(opt, text);
        }
        select
    }

    #[test]
    fn test_fill_input_dispatches_events_in_order() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let input = dom.append_element(doc, "input", &[("name", "city")]);

        let outcome = fill(&mut dom, input, "Lyon").unwrap();
        assert!(outcome.is_filled());
        assert_eq!(dom.value(input).as_deref(), Some("Lyon"));
        assert_eq!(dom.events_for(input), FILL_EVENTS.to_vec());
        assert!(dom.events().iter().all(|e| e.bubbles && e.cancelable));
        assert_eq!(dom.focused(), Some(input));
    }

    #[test]
    fn test_framework_tracker_observes_native_set() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let mut el = Element::new("input");
        el.set_attr("name", "email");
        el.tracked_value = Some(String::new());
        let input = dom.append(doc, el);

        fill(&mut dom, input, "ada@example.com").unwrap();
        assert_eq!(dom.framework_changes(), &[(input, "ada@example.com".to_string())]);
    }

    #[test]
    fn test_fill_round_trip_reads_back() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let area = dom.append_element(doc, "textarea", &[("name", "bio")]);
        fill(&mut dom, area, "Hello").unwrap();
        assert_eq!(dom.value(area).as_deref(), Some("Hello"));
    }

    #[test]
    fn test_select_exact_value_then_text() {
        let mut dom = Dom::new("https://a.test");
        let select = select_with(&mut dom, &[("", "Choose..."), ("CA", "Canada"), ("US", "United States")]);

        fill(&mut dom, select, "us").unwrap();
        assert_eq!(dom.value(select).as_deref(), Some("US"));

        fill(&mut dom, select, "Canada, eh").unwrap();
        assert_eq!(dom.value(select).as_deref(), Some("CA"));
    }

    #[test]
    fn test_select_without_match_is_noop() {
        let mut dom = Dom::new("https://a.test");
        let select = select_with(&mut dom, &[("", ""), ("CA", "Canada"), ("US", "United States")]);

        let outcome = fill(&mut dom, select, "USA").unwrap();
        assert_eq!(outcome, FillOutcome::NoMatchingOption { element: select });
        assert_eq!(dom.value(select).as_deref(), Some(""));
        assert!(dom.events().is_empty());
    }

    #[test]
    fn test_contenteditable_gets_text() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let div = dom.append_element(doc, "div", &[("contenteditable", "true")]);
        dom.append_text(div, "old");
        fill(&mut dom, div, "new text").unwrap();
        assert_eq!(dom.text_content(div), "new text");
    }

    #[test]
    fn test_batch_skips_bad_items() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let div = dom.append_element(doc, "div", &[]);
        let input = dom.append_element(doc, "input", &[("name", "city")]);
        let gone = dom.append_element(doc, "input", &[("name", "zip")]);
        dom.remove(gone);

        let item = |element, key: &str| FillItem {
            element,
            value: "x1".into(),
            field_key: key.into(),
            category: "address".into(),
        };
        let mut ledger = AutofillLedger::new();
        let report = fill_all(&mut dom, &mut ledger, &[item(div, "a"), item(gone, "zip"), item(input, "city")]);

        assert_eq!(report.filled_elements(), vec![input]);
        assert_eq!(report.filled[0].value, "x1");
        assert_eq!(report.filled[0].field_key, "city");
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_ledger_correction_prompt() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let input = dom.append_element(doc, "input", &[("name", "city")]);
        let mut ledger = AutofillLedger::new();
        ledger.record(input, "Lyon", "city", "address");

        assert_eq!(ledger.on_user_edit(&dom, input), None, "blank value is not a correction");

        dom.set_value_native(input, "Paris").unwrap();
        let prompt = ledger.on_user_edit(&dom, input).unwrap();
        assert_eq!(prompt.old_value, "Lyon");
        assert_eq!(prompt.new_value, "Paris");
        assert_eq!(ledger.on_user_edit(&dom, input), None);

        dom.remove(input);
        ledger.prune(&dom);
        assert!(ledger.is_empty());
    }
}
