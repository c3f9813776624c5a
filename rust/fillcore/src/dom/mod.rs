pub mod document;
pub mod selector;
pub mod snapshot;

pub use document::*;
pub use selector::*;
pub use snapshot::*;
