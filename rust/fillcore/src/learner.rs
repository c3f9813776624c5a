//! Learner - write values the user typed back into the profile
//!
//! Triggered by a form submit, a click on a submit-like control or Enter in
//! an input. A locked profile is checked before anything on the page is
//! read and produces zero writes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::Settings;
use crate::dom::{Dom, NodeId, SelectorList};
use crate::error::FillError;
use crate::matcher::exclusion::is_excluded;
use crate::matcher::identifier::{identify, MatchContext};
use crate::matcher::label::resolve_label;
use crate::matcher::patterns::Category;
use crate::profile::{ProfileData, ProfileStore};

fn form_controls() -> &'static SelectorList {
    static SELECTOR: OnceLock<SelectorList> = OnceLock::new();
    SELECTOR.get_or_init(|| SelectorList::parse("input, select, textarea").unwrap())
}

fn submit_like() -> &'static SelectorList {
    static SELECTOR: OnceLock<SelectorList> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        SelectorList::parse(r#"button[type="submit"], input[type="submit"], button:not([type]), [role="button"]"#)
            .unwrap()
    })
}

fn form_selector() -> &'static SelectorList {
    static SELECTOR: OnceLock<SelectorList> = OnceLock::new();
    SELECTOR.get_or_init(|| SelectorList::parse("form").unwrap())
}

// =============================================================================
// Container discovery
// =============================================================================

/// Nearest ancestor within `max_hops` holding at least two form controls
pub fn find_nearest_form(dom: &Dom, element: NodeId, max_hops: usize) -> Option<NodeId> {
    let mut current = dom.parent_element(element);
    for _ in 0..max_hops {
        let parent = current?;
        if dom.query_selector_all(parent, form_controls()).len() >= 2 {
            return Some(parent);
        }
        current = dom.parent_element(parent);
    }
    None
}

/// Container to learn from after a click on `target`, if it hit a
/// submit-like control
pub fn container_for_click(dom: &Dom, target: NodeId, max_hops: usize) -> Option<NodeId> {
    let button = dom.closest(target, submit_like())?;
    dom.closest(button, form_selector())
        .or_else(|| find_nearest_form(dom, button, max_hops))
}

/// Container to learn from after Enter in `target`
pub fn container_for_enter(dom: &Dom, target: NodeId) -> Option<NodeId> {
    if dom.tag(target) != Some("input") {
        return None;
    }
    dom.closest(target, form_selector())
}

// =============================================================================
// AI batch classification
// =============================================================================

/// Per-field description sent to the AI collaborator
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AiFieldDescriptor {
    pub index: usize,
    pub label: String,
    pub value: String,
    pub name: String,
    pub placeholder: String,
    #[serde(rename = "type")]
    pub input_type: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiClassification {
    pub field_name: String,
    pub category: String,
}

/// External batch classifier. Results are keyed by descriptor index and
/// take precedence over local classification for those indices.
pub trait FieldClassifier {
    fn classify_batch(&self, batch: &[AiFieldDescriptor]) -> Result<HashMap<usize, AiClassification>, FillError>;
}

/// Classifier answering from results the host already obtained
#[derive(Debug, Clone, Default)]
pub struct PrecomputedClassifier {
    results: HashMap<usize, AiClassification>,
}

impl PrecomputedClassifier {
    pub fn new(results: HashMap<usize, AiClassification>) -> Self {
        Self { results }
    }

    /// Parse the collaborator's `{ "0": { fieldName, category } }` answer
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self, FillError> {
        let raw: HashMap<String, AiClassification> = serde_json::from_value(value.clone())
            .map_err(|e| FillError::Classifier(format!("unexpected response shape: {}", e)))?;
        let results = raw
            .into_iter()
            .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
            .collect();
        Ok(Self { results })
    }
}

impl FieldClassifier for PrecomputedClassifier {
    fn classify_batch(&self, batch: &[AiFieldDescriptor]) -> Result<HashMap<usize, AiClassification>, FillError> {
        Ok(batch
            .iter()
            .filter_map(|d| self.results.get(&d.index).map(|c| (d.index, c.clone())))
            .collect())
    }
}

// =============================================================================
// Learning
// =============================================================================

pub struct LearnContext<'a> {
    pub matcher: MatchContext<'a>,
    pub settings: &'a Settings,
    pub profile_name: &'a str,
    pub locked: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearnedValue {
    pub category: String,
    pub field_key: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LearnOutcome {
    Locked,
    Disabled,
    NothingNew,
    Saved { learned: Vec<LearnedValue> },
    StorageFailed { learned: Vec<LearnedValue>, error: String },
}

/// Learnable controls of `container` with their trimmed values
fn learnable_inputs(dom: &Dom, container: NodeId) -> Vec<(NodeId, String)> {
    dom.query_selector_all(container, form_controls())
        .into_iter()
        .filter(|id| !is_excluded(dom, *id))
        .filter_map(|id| {
            let value = dom.value(id)?.trim().to_string();
            (!value.is_empty()).then_some((id, value))
        })
        .collect()
}

pub fn describe_for_ai(dom: &Dom, inputs: &[(NodeId, String)]) -> Vec<AiFieldDescriptor> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, (id, value))| AiFieldDescriptor {
            index,
            label: resolve_label(dom, *id).text,
            value: value.clone(),
            name: dom.attr(*id, "name").unwrap_or_default().to_string(),
            placeholder: dom.attr(*id, "placeholder").unwrap_or_default().to_string(),
            input_type: dom.input_type(*id).unwrap_or_default(),
        })
        .collect()
}

/// Batch to send to the AI collaborator for `container`
pub fn describe_container(dom: &Dom, container: NodeId) -> Vec<AiFieldDescriptor> {
    describe_for_ai(dom, &learnable_inputs(dom, container))
}

/// Values in `container` that differ from what the profile holds
pub fn collect_updates(
    ctx: &MatchContext<'_>,
    dom: &Dom,
    container: NodeId,
    classifier: Option<&dyn FieldClassifier>,
) -> Vec<LearnedValue> {
    let inputs = learnable_inputs(dom, container);
    if inputs.is_empty() {
        return Vec::new();
    }

    let ai = match classifier {
        Some(classifier) => classifier
            .classify_batch(&describe_for_ai(dom, &inputs))
            .unwrap_or_else(|e| {
                console_warn!("[Learner] AI classification failed, using local rules: {}", e);
                HashMap::new()
            }),
        None => HashMap::new(),
    };

    let mut updates: Vec<LearnedValue> = Vec::new();
    for (index, (id, value)) in inputs.into_iter().enumerate() {
        let remote = ai.get(&index).filter(|c| !c.field_name.trim().is_empty());
        let (category, field_key) = match remote {
            Some(c) => (
                Category::parse(&c.category).unwrap_or(Category::Other).as_str().to_string(),
                c.field_name.trim().to_string(),
            ),
            None => match identify(ctx, dom, id) {
                Some(found) => (found.category().to_string(), found.key().to_string()),
                None => continue,
            },
        };
        if ctx.profile.get(&category, &field_key) == Some(value.as_str()) {
            continue;
        }
        // later controls overwrite earlier ones for the same key
        updates.retain(|u| !(u.category == category && u.field_key == field_key));
        updates.push(LearnedValue {
            category,
            field_key,
            value,
        });
    }
    updates
}

/// Learn from `container` and persist through `store`. Storage failures
/// are logged and reported, never raised.
pub fn learn_from_form(
    ctx: &LearnContext<'_>,
    dom: &Dom,
    container: NodeId,
    classifier: Option<&dyn FieldClassifier>,
    store: &mut dyn ProfileStore,
) -> (LearnOutcome, Option<ProfileData>) {
    if ctx.locked {
        console_log!("[Learner] Profile '{}' is locked, not learning", ctx.profile_name);
        return (LearnOutcome::Locked, None);
    }
    if !ctx.settings.learn_active() {
        return (LearnOutcome::Disabled, None);
    }

    let learned = collect_updates(&ctx.matcher, dom, container, classifier);
    if learned.is_empty() {
        return (LearnOutcome::NothingNew, None);
    }

    let mut updated = ctx.matcher.profile.clone();
    for item in &learned {
        updated.upsert(&item.category, &item.field_key, &item.value);
    }

    match store.set(ctx.profile_name, updated.clone()) {
        Ok(()) => {
            console_log!("[Learner] Learned {} fields", learned.len());
            (LearnOutcome::Saved { learned }, Some(updated))
        }
        Err(e) => {
            console_error!("[Learner] Error saving: {}", e);
            (
                LearnOutcome::StorageFailed {
                    learned,
                    error: e.to_string(),
                },
                None,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::site::SiteLearnedPatterns;
    use crate::profile::MemoryProfileStore;

    struct FailingStore;

    impl ProfileStore for FailingStore {
        fn get(&self, _profile: &str) -> Result<Option<ProfileData>, FillError> {
            Ok(None)
        }
        fn set(&mut self, _profile: &str, _data: ProfileData) -> Result<(), FillError> {
            Err(FillError::Storage("quota exceeded".into()))
        }
    }

    struct BrokenClassifier;

    impl FieldClassifier for BrokenClassifier {
        fn classify_batch(&self, _: &[AiFieldDescriptor]) -> Result<HashMap<usize, AiClassification>, FillError> {
            Err(FillError::Classifier("offline".into()))
        }
    }

    /// form: first_name=Ada, email=ada@new.test, password, ssn, empty city
    fn submitted_form() -> (Dom, NodeId) {
        let mut dom = Dom::new("https://jobs.test");
        let doc = dom.main_document();
        let form = dom.append_element(doc, "form", &[]);
        dom.append_element(form, "input", &[("name", "first_name"), ("value", "Ada")]);
        dom.append_element(form, "input", &[("type", "email"), ("name", "mail"), ("value", " ada@new.test ")]);
        dom.append_element(form, "input", &[("type", "password"), ("name", "pw"), ("value", "hunter2")]);
        dom.append_element(form, "input", &[("name", "ssn"), ("value", "123-45-6789")]);
        dom.append_element(form, "input", &[("name", "city"), ("value", "")]);
        dom.append_element(form, "button", &[]);
        (dom, form)
    }

    fn run(
        dom: &Dom,
        form: NodeId,
        profile: &ProfileData,
        locked: bool,
        classifier: Option<&dyn FieldClassifier>,
        store: &mut dyn ProfileStore,
    ) -> (LearnOutcome, Option<ProfileData>) {
        let learned = SiteLearnedPatterns::new();
        let settings = Settings::default();
        let ctx = LearnContext {
            matcher: MatchContext {
                hostname: "jobs.test",
                site: None,
                learned: &learned,
                profile,
            },
            settings: &settings,
            profile_name: "default",
            locked,
        };
        learn_from_form(&ctx, dom, form, classifier, store)
    }

    #[test]
    fn test_learns_changed_values_only() {
        let (dom, form) = submitted_form();
        let mut profile = ProfileData::seeded();
        profile.upsert("personal", "firstName", "Ada");
        let mut store = MemoryProfileStore::new();

        let (outcome, updated) = run(&dom, form, &profile, false, None, &mut store);
        assert_eq!(
            outcome,
            LearnOutcome::Saved {
                learned: vec![LearnedValue {
                    category: "contact".into(),
                    field_key: "email".into(),
                    value: "ada@new.test".into(),
                }]
            }
        );
        let updated = updated.unwrap();
        assert_eq!(updated.get("contact", "email"), Some("ada@new.test"));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_locked_profile_writes_nothing() {
        let (dom, form) = submitted_form();
        let mut store = MemoryProfileStore::new();
        let (outcome, updated) = run(&dom, form, &ProfileData::seeded(), true, None, &mut store);
        assert_eq!(outcome, LearnOutcome::Locked);
        assert!(updated.is_none());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_never_learns_secrets() {
        let (dom, form) = submitted_form();
        let mut store = MemoryProfileStore::new();
        let (_, updated) = run(&dom, form, &ProfileData::seeded(), false, None, &mut store);
        let updated = updated.unwrap();
        assert!(updated.entries().all(|(_, _, v)| v != "hunter2" && v != "123-45-6789"));
    }

    #[test]
    fn test_ai_results_take_precedence() {
        let (dom, form) = submitted_form();
        let mut results = HashMap::new();
        results.insert(
            0,
            AiClassification {
                field_name: "givenName".into(),
                category: "Personal".into(),
            },
        );
        let classifier = PrecomputedClassifier::new(results);
        let mut store = MemoryProfileStore::new();

        let (_, updated) = run(&dom, form, &ProfileData::seeded(), false, Some(&classifier), &mut store);
        let updated = updated.unwrap();
        assert_eq!(updated.get("personal", "givenName"), Some("Ada"));
        assert_eq!(updated.get("personal", "firstName"), None);
        assert_eq!(updated.get("contact", "email"), Some("ada@new.test"));
    }

    #[test]
    fn test_ai_failure_falls_back_to_local_rules() {
        let (dom, form) = submitted_form();
        let mut store = MemoryProfileStore::new();
        let (_, updated) = run(&dom, form, &ProfileData::seeded(), false, Some(&BrokenClassifier), &mut store);
        assert_eq!(updated.unwrap().get("personal", "firstName"), Some("Ada"));
    }

    #[test]
    fn test_storage_failure_is_reported() {
        let (dom, form) = submitted_form();
        let (outcome, updated) = run(&dom, form, &ProfileData::seeded(), false, None, &mut FailingStore);
        assert!(matches!(outcome, LearnOutcome::StorageFailed { .. }));
        assert!(updated.is_none());
    }

    #[test]
    fn test_precomputed_from_json() {
        let value = serde_json::json!({ "1": { "fieldName": "shoe_size", "category": "other" } });
        let classifier = PrecomputedClassifier::from_json_value(&value).unwrap();
        let batch = vec![AiFieldDescriptor {
            index: 1,
            label: "Shoe".into(),
            value: "42".into(),
            name: String::new(),
            placeholder: String::new(),
            input_type: "text".into(),
        }];
        let out = classifier.classify_batch(&batch).unwrap();
        assert_eq!(out[&1].field_name, "shoe_size");
    }

    #[test]
    fn test_container_discovery() {
        let mut dom = Dom::new("https://jobs.test");
        let doc = dom.main_document();
        let wrapper = dom.append_element(doc, "div", &[]);
        dom.append_element(wrapper, "input", &[("name", "a")]);
        let row = dom.append_element(wrapper, "div", &[]);
        let b = dom.append_element(row, "input", &[("name", "b")]);
        let button = dom.append_element(row, "button", &[]);
        let label = dom.append_element(button, "span", &[]);

        assert_eq!(container_for_click(&dom, label, 10), Some(wrapper));
        assert_eq!(container_for_click(&dom, b, 10), None);
        assert_eq!(container_for_enter(&dom, b), None);

        let (dom, form) = submitted_form();
        let first = dom.children(form)[0];
        assert_eq!(container_for_enter(&dom, first), Some(form));
    }
}
