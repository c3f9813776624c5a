//! Error types shared across the engine
//!
//! None of these are fatal to the host page. Callers either skip the
//! offending source (cross-origin frame, bad fill item) or degrade to
//! "no result".

use crate::dom::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum FillError {
    /// Frame content belongs to another origin and cannot be read
    CrossOrigin { frame_origin: String, page_origin: String },
    NodeNotFound(NodeId),
    /// Node exists but is not an input, select, textarea or contenteditable
    NotFillable(NodeId),
    Storage(String),
    Classifier(String),
    InvalidSnapshot(String),
    InvalidPattern(String),
}

impl std::fmt::Display for FillError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FillError::CrossOrigin { frame_origin, page_origin } => write!(
                f,
                "Blocked cross-origin frame access: {} from {}",
                frame_origin, page_origin
            ),
            FillError::NodeNotFound(id) => write!(f, "Node not found: {}", id.index()),
            FillError::NotFillable(id) => write!(f, "Node {} is not fillable", id.index()),
            FillError::Storage(msg) => write!(f, "Storage error: {}", msg),
            FillError::Classifier(msg) => write!(f, "Classifier error: {}", msg),
            FillError::InvalidSnapshot(msg) => write!(f, "Invalid snapshot: {}", msg),
            FillError::InvalidPattern(msg) => write!(f, "Invalid pattern: {}", msg),
        }
    }
}

impl std::error::Error for FillError {}

impl From<FillError> for wasm_bindgen::JsValue {
    fn from(e: FillError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
