//! Dom: arena-backed page model
//!
//! Holds the main document, every attached shadow root and every iframe
//! content document in one arena. Queries follow browser semantics:
//! `descendants`/`query_selector_all` stay in the light tree of the root they
//! start from, shadow roots and frame documents are only reachable through
//! their host element.
//!
//! Mutations made by the fill executor (native value set, text content,
//! dispatched events, focus) are recorded so the JS host can replay them on
//! the real page.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::dom::selector::SelectorList;
use crate::error::FillError;

// =============================================================================
// Types
// =============================================================================

/// Stable handle for a node inside a [`Dom`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }

    pub fn from_index(index: usize) -> Self {
        NodeId(index)
    }
}

/// Rendering facts the engine needs for the visibility check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Layout {
    /// Element has a layout box (`offsetParent !== null`)
    pub has_box: bool,
    pub display_none: bool,
    pub visibility_hidden: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            has_box: true,
            display_none: false,
            visibility_hidden: false,
        }
    }
}

impl Layout {
    pub fn hidden() -> Self {
        Self {
            has_box: false,
            display_none: true,
            visibility_hidden: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    /// Lowercase tag name
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    /// Live `.value` for form controls
    pub value: String,
    /// Value tracker installed by a reactive framework. `Some` means the
    /// framework intercepts the instance `value` setter.
    pub tracked_value: Option<String>,
    pub layout: Layout,
    pub shadow_root: Option<NodeId>,
    pub content_document: Option<NodeId>,
    /// Opaque key assigned by the JS host for mapping back to live elements
    pub host_key: Option<u32>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            value: String::new(),
            tracked_value: None,
            layout: Layout::default(),
            shadow_root: None,
            content_document: None,
            host_key: None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.attrs.push((name, value.to_string())),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|token| token == class))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Root of the main page or of an iframe content document
    Document { origin: String },
    ShadowRoot { host: NodeId },
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Detached nodes stay in the arena but are unreachable
    detached: bool,
}

/// Synthetic events the fill executor may dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Input,
    Change,
    Blur,
    Keydown,
    Keyup,
    Keypress,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Input => "input",
            EventKind::Change => "change",
            EventKind::Blur => "blur",
            EventKind::Keydown => "keydown",
            EventKind::Keyup => "keyup",
            EventKind::Keypress => "keypress",
        }
    }
}

/// Page mutation for the host to replay on the real element, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DomAction {
    /// Assign through the prototype (native) value setter
    SetValue { target: NodeId, value: String },
    SetText { target: NodeId, text: String },
    Dispatch {
        target: NodeId,
        event: EventKind,
        bubbles: bool,
        cancelable: bool,
    },
    Focus { target: NodeId },
    Blur { target: NodeId },
}

impl DomAction {
    pub fn target(&self) -> NodeId {
        match self {
            DomAction::SetValue { target, .. }
            | DomAction::SetText { target, .. }
            | DomAction::Dispatch { target, .. }
            | DomAction::Focus { target }
            | DomAction::Blur { target } => *target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchedEvent {
    pub target: NodeId,
    pub kind: EventKind,
    pub bubbles: bool,
    pub cancelable: bool,
}

// =============================================================================
// Dom
// =============================================================================

#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    main: NodeId,
    events: Vec<DispatchedEvent>,
    /// Values a framework value tracker picked up from dispatched events
    framework_changes: Vec<(NodeId, String)>,
    actions: Vec<DomAction>,
    /// Elements whose current value was read
    values_read: RefCell<BTreeSet<NodeId>>,
    focused: Option<NodeId>,
}

impl Dom {
    /// Create an empty page whose main document has `origin`
    pub fn new(origin: &str) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document {
                    origin: origin.to_string(),
                },
                parent: None,
                children: Vec::new(),
                detached: false,
            }],
            main: NodeId(0),
            events: Vec::new(),
            framework_changes: Vec::new(),
            actions: Vec::new(),
            values_read: RefCell::new(BTreeSet::new()),
            focused: None,
        }
    }

    pub fn main_document(&self) -> NodeId {
        self.main
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).filter(|n| !n.detached)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id)? {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        let node = self.nodes.get_mut(id.0).filter(|n| !n.detached)?;
        match &mut node.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Attached element carrying the host's key
    pub fn find_by_host_key(&self, key: u32) -> Option<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .find(|id| self.element(*id).and_then(|el| el.host_key) == Some(key))
    }

    pub fn host_key(&self, id: NodeId) -> Option<u32> {
        self.element(id)?.host_key
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    /// Non-empty attribute value, mirroring `el.name || ''` style reads
    pub fn attr_nonempty(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attr(id, name).filter(|v| !v.is_empty())
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
            detached: false,
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        id
    }

    /// Append an element under `parent` (document, shadow root or element)
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut el = Element::new(tag);
        for (k, v) in attrs {
            el.set_attr(k, v);
        }
        if el.tag == "input" || el.tag == "textarea" {
            el.value = el.attr("value").unwrap_or_default().to_string();
        }
        self.append(parent, el)
    }

    /// Append a prepared element
    pub fn append(&mut self, parent: NodeId, element: Element) -> NodeId {
        self.push(NodeKind::Element(element), Some(parent))
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()), Some(parent))
    }

    /// Attach (or return the existing) shadow root of `host`
    pub fn attach_shadow(&mut self, host: NodeId) -> NodeId {
        if let Some(existing) = self.element(host).and_then(|el| el.shadow_root) {
            return existing;
        }
        let root = self.push(NodeKind::ShadowRoot { host }, None);
        if let Some(el) = self.element_mut(host) {
            el.shadow_root = Some(root);
        }
        root
    }

    /// Give an `<iframe>` a content document served from `origin`
    pub fn attach_frame_document(&mut self, iframe: NodeId, origin: &str) -> NodeId {
        let doc = self.push(
            NodeKind::Document {
                origin: origin.to_string(),
            },
            None,
        );
        if let Some(el) = self.element_mut(iframe) {
            el.content_document = Some(doc);
        }
        doc
    }

    /// Detach a node (and implicitly its subtree) from the tree
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes.get(id.0).and_then(|n| n.parent) {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(next.0) {
                node.detached = true;
                stack.extend(node.children.iter().copied());
            }
        }
        if self.focused == Some(id) {
            self.focused = None;
        }
    }

    // -------------------------------------------------------------------------
    // Traversal
    // -------------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.element(*p).is_some())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == id)?;
        siblings[..pos]
            .iter()
            .rev()
            .copied()
            .find(|s| self.element(*s).is_some())
    }

    /// Elements under `root` in document order (light tree only)
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.element(id).is_some() {
                out.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Root of the tree `id` lives in: a document or a shadow root
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Owning document, walking out through shadow hosts
    pub fn document_of(&self, id: NodeId) -> NodeId {
        let mut root = self.root_of(id);
        while let Some(NodeKind::ShadowRoot { host }) = self.kind(root) {
            root = self.root_of(*host);
        }
        root
    }

    pub fn origin_of(&self, doc: NodeId) -> Option<&str> {
        match self.kind(doc)? {
            NodeKind::Document { origin } => Some(origin.as_str()),
            _ => None,
        }
    }

    /// Content document of an iframe, enforcing the same-origin policy
    /// against the document that owns the iframe
    pub fn content_document(&self, iframe: NodeId) -> Result<Option<NodeId>, FillError> {
        let Some(doc) = self.element(iframe).and_then(|el| el.content_document) else {
            return Ok(None);
        };
        let page_origin = self.origin_of(self.document_of(iframe)).unwrap_or_default();
        let frame_origin = self.origin_of(doc).unwrap_or_default();
        if frame_origin != page_origin {
            return Err(FillError::CrossOrigin {
                frame_origin: frame_origin.to_string(),
                page_origin: page_origin.to_string(),
            });
        }
        Ok(Some(doc))
    }

    /// `textContent`: concatenated text of the light subtree
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(NodeKind::Text(text)) = self.kind(id) {
            out.push_str(text);
            return;
        }
        for child in self.children(id) {
            self.collect_text(*child, out);
        }
    }

    /// `Element.closest`: self or nearest ancestor element matching
    pub fn closest(&self, id: NodeId, selector: &SelectorList) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.element(node).is_none() {
                return None;
            }
            if selector.matches(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    pub fn query_selector_all(&self, root: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| selector.matches(self, *id))
            .collect()
    }

    pub fn query_selector(&self, root: NodeId, selector: &SelectorList) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|id| selector.matches(self, *id))
    }

    pub fn get_element_by_id(&self, root: NodeId, element_id: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|id| self.attr(*id, "id") == Some(element_id))
    }

    // -------------------------------------------------------------------------
    // Form-control semantics
    // -------------------------------------------------------------------------

    /// `el.type` lowercased; `None` for elements without a type property
    pub fn input_type(&self, id: NodeId) -> Option<String> {
        let el = self.element(id)?;
        match el.tag.as_str() {
            "input" => Some(
                el.attr("type")
                    .filter(|t| !t.is_empty())
                    .unwrap_or("text")
                    .to_ascii_lowercase(),
            ),
            "select" if el.has_attr("multiple") => Some("select-multiple".to_string()),
            "select" => Some("select-one".to_string()),
            "textarea" => Some("textarea".to_string()),
            "button" => Some(
                el.attr("type")
                    .filter(|t| !t.is_empty())
                    .unwrap_or("submit")
                    .to_ascii_lowercase(),
            ),
            _ => None,
        }
    }

    pub fn is_form_control(&self, id: NodeId) -> bool {
        matches!(self.tag(id), Some("input" | "select" | "textarea"))
    }

    pub fn is_content_editable(&self, id: NodeId) -> bool {
        matches!(self.attr(id, "contenteditable"), Some("true") | Some(""))
    }

    /// Current value: `.value` for form controls, text for contenteditable
    pub fn value(&self, id: NodeId) -> Option<String> {
        let el = self.element(id)?;
        let value = if self.is_form_control(id) {
            el.value.clone()
        } else if self.is_content_editable(id) {
            self.text_content(id)
        } else {
            return None;
        };
        self.values_read.borrow_mut().insert(id);
        Some(value)
    }

    /// Elements whose value has been read since the last `clear_event_log`
    pub fn values_read(&self) -> Vec<NodeId> {
        self.values_read.borrow().iter().copied().collect()
    }

    pub fn is_disabled(&self, id: NodeId) -> bool {
        self.element(id).map(|el| el.has_attr("disabled")).unwrap_or(false)
    }

    pub fn is_read_only(&self, id: NodeId) -> bool {
        self.element(id).map(|el| el.has_attr("readonly")).unwrap_or(false)
    }

    /// `<option>` elements of a select, in order
    pub fn options(&self, select: NodeId) -> Vec<NodeId> {
        self.descendants(select)
            .into_iter()
            .filter(|id| self.tag(*id) == Some("option"))
            .collect()
    }

    /// `option.value`, defaulting to its collapsed text
    pub fn option_value(&self, option: NodeId) -> String {
        match self.attr(option, "value") {
            Some(v) => v.to_string(),
            None => self.option_text(option),
        }
    }

    pub fn option_text(&self, option: NodeId) -> String {
        self.text_content(option)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    // -------------------------------------------------------------------------
    // Mutation (fill path)
    // -------------------------------------------------------------------------

    /// Prototype (native) setter: changes the value without touching any
    /// framework tracker, so the next `input` event reports a change
    pub fn set_value_native(&mut self, id: NodeId, value: &str) -> Result<(), FillError> {
        let el = self.element_mut(id).ok_or(FillError::NodeNotFound(id))?;
        el.value = value.to_string();
        self.actions.push(DomAction::SetValue {
            target: id,
            value: value.to_string(),
        });
        Ok(())
    }

    /// Instance setter: a framework-controlled element records the value in
    /// its tracker as well, so subsequent events look like no-ops
    pub fn set_value_property(&mut self, id: NodeId, value: &str) -> Result<(), FillError> {
        let el = self.element_mut(id).ok_or(FillError::NodeNotFound(id))?;
        el.value = value.to_string();
        if el.tracked_value.is_some() {
            el.tracked_value = Some(value.to_string());
        }
        Ok(())
    }

    /// Replace all children with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), FillError> {
        if self.element(id).is_none() {
            return Err(FillError::NodeNotFound(id));
        }
        let children: Vec<NodeId> = self.children(id).to_vec();
        for child in children {
            self.remove(child);
        }
        self.append_text(id, text);
        self.actions.push(DomAction::SetText {
            target: id,
            text: text.to_string(),
        });
        Ok(())
    }

    pub fn dispatch_event(&mut self, target: NodeId, kind: EventKind, bubbles: bool, cancelable: bool) {
        self.events.push(DispatchedEvent {
            target,
            kind,
            bubbles,
            cancelable,
        });
        self.actions.push(DomAction::Dispatch {
            target,
            event: kind,
            bubbles,
            cancelable,
        });
        if !matches!(kind, EventKind::Input | EventKind::Change) {
            return;
        }
        let Some(el) = self.element_mut(target) else {
            return;
        };
        let observed = match &el.tracked_value {
            Some(tracked) if *tracked != el.value => Some(el.value.clone()),
            _ => None,
        };
        if let Some(value) = observed {
            el.tracked_value = Some(value.clone());
            self.framework_changes.push((target, value));
        }
    }

    pub fn focus(&mut self, id: NodeId) {
        if self.contains(id) {
            self.focused = Some(id);
            self.actions.push(DomAction::Focus { target: id });
        }
    }

    pub fn blur(&mut self, id: NodeId) {
        if self.focused == Some(id) {
            self.focused = None;
        }
        if self.contains(id) {
            self.actions.push(DomAction::Blur { target: id });
        }
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn events(&self) -> &[DispatchedEvent] {
        &self.events
    }

    pub fn events_for(&self, target: NodeId) -> Vec<EventKind> {
        self.events
            .iter()
            .filter(|e| e.target == target)
            .map(|e| e.kind)
            .collect()
    }

    pub fn framework_changes(&self) -> &[(NodeId, String)] {
        &self.framework_changes
    }

    /// Pending host actions, oldest first
    pub fn actions(&self) -> &[DomAction] {
        &self.actions
    }

    /// Hand the recorded actions to the host and reset every log
    pub fn take_actions(&mut self) -> Vec<DomAction> {
        let actions = std::mem::take(&mut self.actions);
        self.clear_event_log();
        actions
    }

    pub fn clear_event_log(&mut self) {
        self.events.clear();
        self.framework_changes.clear();
        self.values_read.borrow_mut().clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
