//! WASM bindings for the page controller
//!
//! The content-script shim owns the real page. It sends a snapshot of the
//! page, reports events with the element keys from that snapshot, and calls
//! `advance(now)` from its own timers. Node ids in returned events map back
//! to keys through `keyOf`.

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

use crate::config::EngineConfig;
use crate::controller::{origin_of, PageController, ProfileUpdate};
use crate::dom::{Dom, DomAction, NodeId, PageSnapshot};
use crate::learner::{describe_container, FieldClassifier, PrecomputedClassifier};
use crate::profile::{MemoryProfileStore, ProfileData, DEFAULT_PROFILE};

/// Plain objects rather than `Map`s, so the host can hand results to JSON
fn to_js<T: Serialize>(value: &T) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::NULL)
}

/// A page action addressed by snapshot key
#[derive(Serialize)]
struct KeyedAction<'a> {
    key: Option<u32>,
    #[serde(flatten)]
    action: &'a DomAction,
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
pub struct FormFiller {
    inner: PageController,
}

impl FormFiller {
    fn node(&self, key: u32) -> Result<NodeId, JsValue> {
        self.inner
            .dom()
            .find_by_host_key(key)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown element key: {}", key)))
    }
}

#[wasm_bindgen]
impl FormFiller {
    /// `config` may be undefined for production timings
    #[wasm_bindgen(constructor)]
    pub fn new(url: &str, config: JsValue) -> Result<FormFiller, JsValue> {
        let config: EngineConfig = if config.is_undefined() || config.is_null() {
            EngineConfig::production()
        } else {
            serde_wasm_bindgen::from_value(config).map_err(js_err)?
        };
        let store = MemoryProfileStore::with_profile(DEFAULT_PROFILE, ProfileData::seeded());
        Ok(FormFiller {
            inner: PageController::new(url, Dom::new(&origin_of(url)), config, Box::new(store)),
        })
    }

    /// Replace the page model with a fresh snapshot
    #[wasm_bindgen(js_name = loadSnapshot)]
    pub fn load_snapshot(&mut self, json: &str) -> Result<(), JsValue> {
        let dom = PageSnapshot::from_json(json)?.into_dom()?;
        self.inner.replace_dom(dom);
        Ok(())
    }

    /// Storage dump or background broadcast (`ProfileUpdate` shape)
    #[wasm_bindgen]
    pub fn hydrate(&mut self, update: JsValue) -> Result<(), JsValue> {
        let update: ProfileUpdate = serde_wasm_bindgen::from_value(update).map_err(js_err)?;
        self.inner.on_profile_updated(update);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn start(&mut self, now_ms: f64) {
        self.inner.start(now_ms as u64);
    }

    /// Fire due timers; returns the events produced
    #[wasm_bindgen]
    pub fn advance(&mut self, now_ms: f64) -> JsValue {
        to_js(&self.inner.advance(now_ms as u64))
    }

    /// Keys of nodes added to the page. Unknown keys are ignored.
    #[wasm_bindgen(js_name = notifyMutation)]
    pub fn notify_mutation(&mut self, keys: Vec<u32>) -> bool {
        let added: Vec<NodeId> = keys
            .into_iter()
            .filter_map(|key| self.inner.dom().find_by_host_key(key))
            .collect();
        self.inner.on_dom_mutation(&added)
    }

    #[wasm_bindgen(js_name = urlChanged)]
    pub fn url_changed(&mut self, url: &str) {
        self.inner.on_url_change(url);
    }

    #[wasm_bindgen(js_name = visibilityChanged)]
    pub fn visibility_changed(&mut self, visible: bool) {
        self.inner.on_visibility_change(visible);
    }

    #[wasm_bindgen(js_name = triggerFill)]
    pub fn trigger_fill(&mut self) -> JsValue {
        to_js(&self.inner.trigger_fill())
    }

    /// Fill report, or null when nothing was pending
    #[wasm_bindgen(js_name = acceptConfirmation)]
    pub fn accept_confirmation(&mut self) -> JsValue {
        match self.inner.accept_confirmation() {
            Some(report) => to_js(&report),
            None => JsValue::NULL,
        }
    }

    #[wasm_bindgen(js_name = declineConfirmation)]
    pub fn decline_confirmation(&mut self) {
        self.inner.decline_confirmation();
    }

    #[wasm_bindgen(js_name = onSubmit)]
    pub fn on_submit(&mut self, form_key: u32) -> Result<JsValue, JsValue> {
        let form = self.node(form_key)?;
        Ok(to_js(&self.inner.on_submit(form)))
    }

    /// Whether learning was scheduled
    #[wasm_bindgen(js_name = onClick)]
    pub fn on_click(&mut self, target_key: u32) -> Result<bool, JsValue> {
        let target = self.node(target_key)?;
        Ok(self.inner.on_click(target).is_some())
    }

    #[wasm_bindgen(js_name = onEnter)]
    pub fn on_enter(&mut self, target_key: u32) -> Result<bool, JsValue> {
        let target = self.node(target_key)?;
        Ok(self.inner.on_enter_key(target).is_some())
    }

    /// Batch to classify before `learnWithResults`
    #[wasm_bindgen(js_name = learnDescriptors)]
    pub fn learn_descriptors(&self, container_key: u32) -> Result<JsValue, JsValue> {
        let container = self.node(container_key)?;
        Ok(to_js(&describe_container(self.inner.dom(), container)))
    }

    /// Learn from a container with the collaborator's answer
    /// (`{ "0": { fieldName, category } }`, or null for local rules only)
    #[wasm_bindgen(js_name = learnWithResults)]
    pub fn learn_with_results(&mut self, container_key: u32, results: JsValue) -> Result<JsValue, JsValue> {
        let container = self.node(container_key)?;
        let classifier = if results.is_undefined() || results.is_null() {
            None
        } else {
            let value: serde_json::Value = serde_wasm_bindgen::from_value(results).map_err(js_err)?;
            Some(PrecomputedClassifier::from_json_value(&value)?)
        };
        let outcome = self
            .inner
            .learn_now(container, classifier.as_ref().map(|c| c as &dyn FieldClassifier));
        Ok(to_js(&outcome))
    }

    /// Manual mapping entry to persist, or null
    #[wasm_bindgen(js_name = mapField)]
    pub fn map_field(&mut self, element_key: u32, field_key: &str) -> Result<JsValue, JsValue> {
        let element = self.node(element_key)?;
        Ok(match self.inner.map_field(element, field_key) {
            Some(mapping) => to_js(&mapping),
            None => JsValue::NULL,
        })
    }

    /// The user typed into an element; returns a correction prompt or null
    #[wasm_bindgen(js_name = userEdited)]
    pub fn user_edited(&mut self, element_key: u32, value: &str) -> Result<JsValue, JsValue> {
        let element = self.node(element_key)?;
        self.inner.dom_mut().set_value_property(element, value)?;
        Ok(match self.inner.on_user_edit(element) {
            Some(prompt) => to_js(&prompt),
            None => JsValue::NULL,
        })
    }

    #[wasm_bindgen(js_name = nodeRemoved)]
    pub fn node_removed(&mut self, key: u32) {
        if let Some(node) = self.inner.dom().find_by_host_key(key) {
            self.inner.on_node_removed(node);
        }
    }

    /// Page writes since the last call (`set_value`, `set_text`, `dispatch`,
    /// `focus`, `blur`), in order, each with the snapshot `key` it targets.
    /// The shim replays them on the real elements.
    #[wasm_bindgen(js_name = drainActions)]
    pub fn drain_actions(&mut self) -> JsValue {
        let actions = self.inner.drain_actions();
        let dom = self.inner.dom();
        let keyed: Vec<KeyedAction> = actions
            .iter()
            .map(|action| KeyedAction {
                key: dom.host_key(action.target()),
                action,
            })
            .collect();
        to_js(&keyed)
    }

    /// Snapshot key of a node id found in events
    #[wasm_bindgen(js_name = keyOf)]
    pub fn key_of(&self, node: usize) -> Option<u32> {
        self.inner.dom().host_key(NodeId::from_index(node))
    }

    #[wasm_bindgen(js_name = stateName)]
    pub fn state_name(&self) -> String {
        self.inner.state().state_name().to_string()
    }

    /// Current profile as `{ category: { key: value } }`
    #[wasm_bindgen]
    pub fn profile(&self) -> JsValue {
        to_js(&self.inner.context().profile)
    }

    /// Run an async classifier callback (`batch => Promise<results>`),
    /// resolving to null on any failure so learning falls back to local rules
    #[wasm_bindgen(js_name = classifyWith)]
    pub fn classify_with(callback: js_sys::Function, batch: JsValue) -> js_sys::Promise {
        future_to_promise(async move {
            let returned = match callback.call1(&JsValue::NULL, &batch) {
                Ok(value) => value,
                Err(e) => {
                    console_warn!("[FillCore] Classifier callback threw: {:?}", e);
                    return Ok(JsValue::NULL);
                }
            };
            match JsFuture::from(js_sys::Promise::resolve(&returned)).await {
                Ok(results) => Ok(results),
                Err(e) => {
                    console_warn!("[FillCore] Classifier rejected: {:?}", e);
                    Ok(JsValue::NULL)
                }
            }
        })
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    const PAGE: &str = r#"{
        "url": "https://jobs.test/apply",
        "origin": "https://jobs.test",
        "children": [
            { "key": 1, "tag": "form", "children": [
                { "key": 2, "tag": "input", "attrs": { "name": "email_address" }, "value": "" }
            ] }
        ]
    }"#;

    #[wasm_bindgen_test]
    fn test_snapshot_scan_and_accept() {
        let mut filler = FormFiller::new("https://jobs.test/apply", JsValue::UNDEFINED).unwrap();
        filler.load_snapshot(PAGE).unwrap();
        let update = js_sys::JSON::parse(r#"{ "formData": { "contact": { "email": "ada@example.com" } } }"#).unwrap();
        filler.hydrate(update).unwrap();
        filler.start(0.0);
        filler.advance(300.0);
        assert_eq!(filler.state_name(), "awaiting_confirmation");
        assert!(!filler.accept_confirmation().is_null());
        assert_eq!(filler.state_name(), "idle");
    }

    #[wasm_bindgen_test]
    fn test_direct_fill_value_reaches_the_host() {
        let mut filler = FormFiller::new("https://jobs.test/apply", JsValue::UNDEFINED).unwrap();
        filler.load_snapshot(PAGE).unwrap();
        let update = js_sys::JSON::parse(
            r#"{ "formData": { "contact": { "email": "ada@example.com" } }, "settings": { "showConfirmation": false } }"#,
        )
        .unwrap();
        filler.hydrate(update).unwrap();
        filler.start(0.0);
        filler.advance(300.0);

        let actions: Vec<serde_json::Value> = serde_wasm_bindgen::from_value(filler.drain_actions()).unwrap();
        assert_eq!(actions[0]["action"], "set_value");
        assert_eq!(actions[0]["key"], 2);
        assert_eq!(actions[0]["value"], "ada@example.com");
        assert!(actions.iter().any(|a| a["action"] == "dispatch" && a["event"] == "input"));
        assert_eq!(actions.last().unwrap()["action"], "focus");

        let again: Vec<serde_json::Value> = serde_wasm_bindgen::from_value(filler.drain_actions()).unwrap();
        assert!(again.is_empty());
    }

    #[wasm_bindgen_test]
    fn test_unknown_key_is_an_error() {
        let mut filler = FormFiller::new("https://jobs.test/apply", JsValue::UNDEFINED).unwrap();
        filler.load_snapshot(PAGE).unwrap();
        assert!(filler.on_submit(99).is_err());
        assert_eq!(filler.key_of(filler.node(2).unwrap().index()), Some(2));
    }
}
