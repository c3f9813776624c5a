//! Value Resolver - pick the stored value that satisfies a classified field

use crate::profile::ProfileData;

/// Lowercase and keep only ASCII alphanumerics
pub fn normalize_field_name(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Bidirectional containment of two normalized names. Empty names never
/// match anything.
pub fn fuzzy_match(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}

/// Resolution order:
/// 1. exact key in the given category
/// 2. exact key in any category, category order
/// 3. normalized bidirectional containment, first stored key found
pub fn resolve<'a>(key: &str, category: &str, profile: &'a ProfileData) -> Option<&'a str> {
    if let Some(value) = profile.get(category, key) {
        return Some(value);
    }

    if let Some((_, _, value)) = profile.entries().find(|(_, k, _)| *k == key) {
        return Some(value);
    }

    let wanted = normalize_field_name(key);
    profile
        .entries()
        .find(|(_, k, _)| fuzzy_match(&normalize_field_name(k), &wanted))
        .map(|(_, _, value)| value)
}
