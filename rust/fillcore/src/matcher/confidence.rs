//! Confidence Scorer - display-only certainty of a classification.
//! Never gates a fill.

use serde::{Deserialize, Serialize};

use crate::matcher::identifier::{infer_from_type, Classification};
use crate::matcher::patterns::pattern_bank;
use crate::matcher::resolver::{fuzzy_match, normalize_field_name};

/// Input types whose semantics fix the data type
const STRUCTURAL_TYPES: &[&str] = &["email", "tel", "url"];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Score a classification against the identifier it was made on
pub fn score(field: &Classification, input_type: Option<&str>) -> Confidence {
    let key = field.key();
    let identifier = field.identifier.as_str();

    if pattern_bank().key_matches(key, identifier) {
        return Confidence::High;
    }
    if let Some(kind) = input_type.filter(|t| STRUCTURAL_TYPES.contains(t)) {
        if infer_from_type(Some(kind), identifier) == Some(key) {
            return Confidence::High;
        }
    }
    if fuzzy_match(&normalize_field_name(identifier), &normalize_field_name(key)) {
        return Confidence::Medium;
    }
    Confidence::Low
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::identifier::MatchKind;

    fn classification(identifier: &str, kind: MatchKind) -> Classification {
        Classification {
            identifier: identifier.to_string(),
            label: String::new(),
            kind,
        }
    }

    fn pattern(key: &str) -> MatchKind {
        MatchKind::Pattern {
            key: key.to_string(),
            category: "contact".to_string(),
        }
    }

    #[test]
    fn test_pattern_hit_is_high() {
        let field = classification("email_address", pattern("email"));
        assert_eq!(score(&field, Some("text")), Confidence::High);
    }

    #[test]
    fn test_structural_type_is_high() {
        let field = classification(
            "q_17",
            MatchKind::TypeInferred {
                key: "email".into(),
                category: "contact".into(),
            },
        );
        assert_eq!(score(&field, Some("email")), Confidence::High);
        assert_eq!(score(&field, Some("text")), Confidence::Low);
    }

    #[test]
    fn test_normalized_containment_is_medium() {
        let field = classification(
            "favorite_color",
            MatchKind::Fuzzy {
                key: "favoriteColor".into(),
                category: "other".into(),
            },
        );
        assert_eq!(score(&field, Some("text")), Confidence::Medium);
    }

    #[test]
    fn test_new_field_is_low() {
        let field = classification(
            "q9  what should we call you?",
            MatchKind::LearnedNew {
                key: "preferred_title".into(),
                category: "other".into(),
            },
        );
        assert_eq!(score(&field, None), Confidence::Low);
        assert!(Confidence::High > Confidence::Medium);
    }
}
