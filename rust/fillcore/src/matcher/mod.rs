//! Field matching pipeline
//!
//! Collector -> Identifier -> Confidence -> Resolver. Exclusion runs ahead
//! of identification and of learning.

pub mod patterns;
pub mod exclusion;
pub mod label;
pub mod site;
pub mod identifier;
pub mod collector;
pub mod resolver;
pub mod confidence;

pub use collector::{collect_candidates, collect_inputs, detect_fields, DetectedField};
pub use confidence::{score, Confidence};
pub use exclusion::{exclusion_reason, is_excluded, ExclusionReason};
pub use identifier::{identify, Classification, MatchContext, MatchKind};
pub use patterns::{category_of, classify_by_pattern, is_sensitive_key, Category};
pub use resolver::{normalize_field_name, resolve};
pub use site::{ManualMapping, SiteConfig, SiteConfigSpec, SiteLearnedPatterns, SiteRegistry};
