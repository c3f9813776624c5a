//! Field Identifier - decide the data type of one form control
//!
//! Precedence, first hit wins:
//! manual override > site handler > native input type > pattern bank >
//! fuzzy match against stored keys > new learned field.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::dom::{Dom, NodeId};
use crate::matcher::exclusion::is_excluded;
use crate::matcher::label::FieldDescriptor;
use crate::matcher::patterns::{category_of, classify_by_pattern, compile_ci};
use crate::matcher::resolver::{fuzzy_match, normalize_field_name};
use crate::matcher::site::{SiteConfig, SiteLearnedPatterns};
use crate::profile::ProfileData;

const MIN_LEARNED_NAME_LEN: usize = 2;
const MAX_LEARNED_NAME_LEN: usize = 50;

/// How a field was identified
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    Manual { key: String, category: String },
    SiteHandler { key: String, category: String, handler: String },
    TypeInferred { key: String, category: String },
    Pattern { key: String, category: String },
    /// `key` is the stored key that matched
    Fuzzy { key: String, category: String },
    LearnedNew { key: String, category: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Composed identifier the decision was made on
    pub identifier: String,
    /// Human-readable label for previews
    pub label: String,
    #[serde(rename = "match")]
    pub kind: MatchKind,
}

impl Classification {
    pub fn key(&self) -> &str {
        match &self.kind {
            MatchKind::Manual { key, .. }
            | MatchKind::SiteHandler { key, .. }
            | MatchKind::TypeInferred { key, .. }
            | MatchKind::Pattern { key, .. }
            | MatchKind::Fuzzy { key, .. }
            | MatchKind::LearnedNew { key, .. } => key,
        }
    }

    pub fn category(&self) -> &str {
        match &self.kind {
            MatchKind::Manual { category, .. }
            | MatchKind::SiteHandler { category, .. }
            | MatchKind::TypeInferred { category, .. }
            | MatchKind::Pattern { category, .. }
            | MatchKind::Fuzzy { category, .. }
            | MatchKind::LearnedNew { category, .. } => category,
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.kind, MatchKind::Manual { .. })
    }

    pub fn is_new(&self) -> bool {
        matches!(self.kind, MatchKind::LearnedNew { .. })
    }
}

/// Everything identification reads besides the element itself
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    pub hostname: &'a str,
    pub site: Option<&'a SiteConfig>,
    pub learned: &'a SiteLearnedPatterns,
    pub profile: &'a ProfileData,
}

fn known(key: &str) -> (String, String) {
    (key.to_string(), category_of(key).as_str().to_string())
}

/// Classify `input`. Excluded elements are never classified.
pub fn identify(ctx: &MatchContext<'_>, dom: &Dom, input: NodeId) -> Option<Classification> {
    if is_excluded(dom, input) {
        return None;
    }
    let field = FieldDescriptor::describe(dom, input);
    let kind = match_kind(ctx, dom, input, &field)?;
    Some(Classification {
        identifier: field.identifier,
        label: field.label.text,
        kind,
    })
}

fn match_kind(ctx: &MatchContext<'_>, dom: &Dom, input: NodeId, field: &FieldDescriptor) -> Option<MatchKind> {
    if let Some(key) = ctx.learned.lookup_element(ctx.hostname, dom, input) {
        let (key, category) = known(key);
        return Some(MatchKind::Manual { key, category });
    }

    if let Some((handler, key)) = ctx.site.and_then(|site| site.match_handler(&field.identifier)) {
        let handler = handler.to_string();
        let (key, category) = known(key);
        return Some(MatchKind::SiteHandler { key, category, handler });
    }

    if let Some(key) = infer_from_type(field.input_type.as_deref(), &field.identifier) {
        let (key, category) = known(key);
        return Some(MatchKind::TypeInferred { key, category });
    }

    if let Some(key) = classify_by_pattern(&field.identifier) {
        let (key, category) = known(key);
        return Some(MatchKind::Pattern { key, category });
    }

    let normalized = normalize_field_name(&field.identifier);
    for (category, fields) in ctx.profile.categories() {
        if let Some((key, _)) = fields
            .iter()
            .find(|(key, _)| fuzzy_match(&normalized, &normalize_field_name(key)))
        {
            return Some(MatchKind::Fuzzy {
                key: key.clone(),
                category: category.to_string(),
            });
        }
    }

    learned_field_name(field).map(|key| MatchKind::LearnedNew {
        key,
        category: "other".to_string(),
    })
}

fn url_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            (compile_ci(r"linkedin"), "linkedin"),
            (compile_ci(r"github"), "github"),
            (compile_ci(r"twitter|x\.com"), "twitter"),
        ]
    })
}

fn birth_rule() -> &'static Regex {
    static RULE: OnceLock<Regex> = OnceLock::new();
    RULE.get_or_init(|| compile_ci(r"birth"))
}

/// Data type guaranteed (or strongly implied) by the native input type
pub fn infer_from_type(input_type: Option<&str>, identifier: &str) -> Option<&'static str> {
    match input_type? {
        "email" => Some("email"),
        "tel" => Some("phone"),
        "url" => Some(
            url_rules()
                .iter()
                .find(|(re, _)| re.is_match(identifier))
                .map(|(_, key)| *key)
                .unwrap_or("website"),
        ),
        "date" | "text" if birth_rule().is_match(identifier) => Some("dob"),
        _ => None,
    }
}

fn generic_name() -> &'static Regex {
    static RULE: OnceLock<Regex> = OnceLock::new();
    RULE.get_or_init(|| compile_ci(r"^(?:(?:field|input|text|data|form|item|el|box|txt)[\s_-]*\d*|\d+)$"))
}

/// Strip punctuation, lowercase, spaces to underscores
pub fn clean_field_name(source: &str) -> String {
    let kept: String = source
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn acceptable(cleaned: &str) -> bool {
    (MIN_LEARNED_NAME_LEN..MAX_LEARNED_NAME_LEN).contains(&cleaned.len())
}

/// Name for a field no rule recognises. Human-facing text is preferred over
/// machine attributes, and generic machine names are rejected.
pub fn learned_field_name(field: &FieldDescriptor) -> Option<String> {
    let label = field.label.is_visible_label().then_some(field.label.text.as_str());
    let human = [label, Some(field.placeholder.as_str()), Some(field.aria_label.as_str())];
    for source in human.into_iter().flatten().filter(|s| !s.trim().is_empty()) {
        let cleaned = clean_field_name(source);
        if acceptable(&cleaned) {
            return Some(cleaned);
        }
    }

    for source in [field.name.as_str(), field.id.as_str()] {
        if source.trim().is_empty() || generic_name().is_match(source.trim()) {
            continue;
        }
        let cleaned = clean_field_name(source);
        if acceptable(&cleaned) && !generic_name().is_match(&cleaned) {
            return Some(cleaned);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::label::resolve_label;

    fn descriptor(attrs: &[(&str, &str)]) -> FieldDescriptor {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let input = dom.append_element(doc, "input", attrs);
        FieldDescriptor::describe(&dom, input)
    }

    #[test]
    fn test_infer_from_type() {
        assert_eq!(infer_from_type(Some("email"), "whatever"), Some("email"));
        assert_eq!(infer_from_type(Some("tel"), ""), Some("phone"));
        assert_eq!(infer_from_type(Some("url"), "my github page"), Some("github"));
        assert_eq!(infer_from_type(Some("url"), "profile on x.com"), Some("twitter"));
        assert_eq!(infer_from_type(Some("url"), "homepage"), Some("website"));
        assert_eq!(infer_from_type(Some("date"), "date of birth"), Some("dob"));
        assert_eq!(infer_from_type(Some("date"), "start"), None);
        assert_eq!(infer_from_type(None, "birth"), None);
    }

    #[test]
    fn test_clean_field_name() {
        assert_eq!(clean_field_name("  Favourite  Colour? "), "favourite_colour");
        assert_eq!(clean_field_name("T-shirt size"), "tshirt_size");
    }

    #[test]
    fn test_learned_name_prefers_placeholder_over_generic_name() {
        let field = descriptor(&[("name", "field_3"), ("placeholder", "Shoe size")]);
        assert_eq!(learned_field_name(&field).as_deref(), Some("shoe_size"));
    }

    #[test]
    fn test_learned_name_rejects_generic_machine_names() {
        for name in ["field3", "input_7", "12345", "txt"] {
            let field = descriptor(&[("name", name)]);
            assert_eq!(learned_field_name(&field), None, "{} should be rejected", name);
        }
        let field = descriptor(&[("name", "shoe_size")]);
        assert_eq!(learned_field_name(&field).as_deref(), Some("shoe_size"));
    }

    #[test]
    fn test_learned_name_length_bounds() {
        let field = descriptor(&[("placeholder", "x")]);
        assert_eq!(learned_field_name(&field), None);
        let long = "a".repeat(50);
        let field = descriptor(&[("placeholder", long.as_str())]);
        assert_eq!(learned_field_name(&field), None);
    }

    #[test]
    fn test_fallback_label_is_not_a_visible_label() {
        let mut dom = Dom::new("https://a.test");
        let doc = dom.main_document();
        let input = dom.append_element(doc, "input", &[("name", "box_2")]);
        assert!(!resolve_label(&dom, input).is_visible_label());
        let field = FieldDescriptor::describe(&dom, input);
        assert_eq!(learned_field_name(&field), None);
    }
}
