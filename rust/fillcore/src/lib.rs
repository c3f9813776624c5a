//! FillCore: Form Field Identification + Autofill Engine
//!
//! A Rust/WASM implementation of the form-filling content script.
//!
//! # Architecture
//!
//! ## Page model
//! - `dom/document.rs` - Dom: arena page model (light tree, shadow roots, frames)
//! - `dom/selector.rs` - SelectorList: the CSS subset used for collection
//! - `dom/snapshot.rs` - PageSnapshot: JSON page shape sent by the host
//!
//! ## Matching Components
//! - `patterns.rs` - Pattern Bank: ordered field patterns, categories, sensitive keys
//! - `exclusion.rs` - Exclusion Filter: non-fillable types + identifier blacklist
//! - `label.rs` - label resolution and composed identifiers
//! - `site.rs` - per-site selectors, handlers and learned manual mappings
//! - `identifier.rs` - Field Identifier: manual > site handler > type > pattern > fuzzy > learned
//! - `collector.rs` - DOM Collector: light DOM, shadow roots, same-origin frames
//! - `resolver.rs` - Value Resolver: exact, cross-category and fuzzy profile lookup
//! - `confidence.rs` - Confidence Scorer
//!
//! ## Page Components
//! - `fill.rs` - Fill Executor + autofill ledger (correction prompts)
//! - `learner.rs` - Learner: values from submitted forms, optional AI batch
//! - `controller.rs` - PageController: scan/confirm/fill state machine with logical timers
//! - `wasm.rs` - FormFiller: WASM surface for the content-script shim
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { FormFiller } from 'fillcore';
//!
//! await init();
//!
//! const filler = new FormFiller(location.href);
//! filler.hydrate({ formData, settings, disabledSites, siteLearnedPatterns });
//! filler.loadSnapshot(JSON.stringify(snapshotPage(document)));
//! filler.start(performance.now());
//!
//! // Drive timers from the host
//! setInterval(() => {
//!   for (const event of filler.advance(performance.now())) {
//!     if (event.type === 'confirmation_requested') showPopup(event.request);
//!   }
//! }, 50);
//! ```

#[macro_use]
mod log;

pub mod config;
pub mod controller;
pub mod dom;
pub mod error;
pub mod fill;
pub mod learner;
pub mod matcher;
pub mod profile;
pub mod wasm;

// Public exports
pub use config::{EngineConfig, Settings};
pub use controller::{ControllerEvent, PageController, PageState, ProfileUpdate};
pub use error::FillError;
pub use matcher::*;
pub use profile::{MemoryProfileStore, ProfileData, ProfileStore};
pub use wasm::FormFiller;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("fillcore v{}", env!("CARGO_PKG_VERSION"))
}
