//! Page snapshots sent by the JS host
//!
//! The content-script shim serializes the live page into this shape once per
//! scan. Element nodes carry a `key` so results can be mapped back to real
//! elements; text nodes carry only `text`.
//!
//! ```json
//! { "url": "https://jobs.example/apply", "origin": "https://jobs.example",
//!   "children": [ { "key": 1, "tag": "input", "attrs": { "name": "email" },
//!                   "value": "", "layout": { "hasBox": true, ... } } ] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dom::document::{Dom, Element, Layout, NodeId};
use crate::error::FillError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    pub origin: String,
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    #[serde(default)]
    pub key: Option<u32>,
    /// Absent for text nodes
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub value: Option<String>,
    /// Element has a framework value tracker (React-style controlled input)
    #[serde(default)]
    pub tracked: bool,
    #[serde(default)]
    pub layout: Option<Layout>,
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
    #[serde(default)]
    pub shadow: Option<Vec<NodeSnapshot>>,
    #[serde(default)]
    pub frame: Option<FrameSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub origin: String,
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
}

impl PageSnapshot {
    pub fn from_json(json: &str) -> Result<Self, FillError> {
        serde_json::from_str(json).map_err(|e| FillError::InvalidSnapshot(e.to_string()))
    }

    /// Build the arena model
    pub fn into_dom(self) -> Result<Dom, FillError> {
        let mut dom = Dom::new(&self.origin);
        let root = dom.main_document();
        for child in self.children {
            build_node(&mut dom, root, child)?;
        }
        Ok(dom)
    }
}

fn build_node(dom: &mut Dom, parent: NodeId, snap: NodeSnapshot) -> Result<(), FillError> {
    let Some(tag) = snap.tag else {
        match snap.text {
            Some(text) => {
                dom.append_text(parent, &text);
                return Ok(());
            }
            None => {
                return Err(FillError::InvalidSnapshot(
                    "node has neither tag nor text".to_string(),
                ))
            }
        }
    };

    let mut element = Element::new(&tag);
    for (name, value) in &snap.attrs {
        element.set_attr(name, value);
    }
    element.value = snap
        .value
        .or_else(|| element.attr("value").map(str::to_string))
        .unwrap_or_default();
    if snap.tracked {
        element.tracked_value = Some(element.value.clone());
    }
    element.layout = snap.layout.unwrap_or_default();
    element.host_key = snap.key;

    let id = dom.append(parent, element);
    for child in snap.children {
        build_node(dom, id, child)?;
    }
    if let Some(shadow_children) = snap.shadow {
        let shadow = dom.attach_shadow(id);
        for child in shadow_children {
            build_node(dom, shadow, child)?;
        }
    }
    if let Some(frame) = snap.frame {
        let doc = dom.attach_frame_document(id, &frame.origin);
        for child in frame.children {
            build_node(dom, doc, child)?;
        }
    }
    Ok(())
}
