//! Profile data and storage
//!
//! A profile is `category -> { fieldKey: value }`. Category order and key
//! order are insertion order; the resolver and the fuzzy identifier step
//! break ties by it, so the container is an ordered list rather than a map.

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::FillError;
use crate::matcher::patterns::Category;

pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileData {
    categories: Vec<(String, Vec<(String, String)>)>,
}

impl ProfileData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty profile with the six canonical categories present
    pub fn seeded() -> Self {
        let categories = Category::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), Vec::new()))
            .collect();
        Self { categories }
    }

    /// Build from a JSON object. Non-object categories are skipped, numbers
    /// and booleans are stringified, other values and empty strings dropped.
    pub fn from_json_value(value: &Value) -> Self {
        let mut data = Self::new();
        let Some(object) = value.as_object() else {
            return data;
        };
        for (category, fields) in object {
            let Some(fields) = fields.as_object() else {
                continue;
            };
            let entries = fields
                .iter()
                .filter_map(|(key, v)| {
                    let text = match v {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        _ => return None,
                    };
                    (!text.is_empty()).then(|| (key.clone(), text))
                })
                .collect();
            data.categories.push((category.clone(), entries));
        }
        data
    }

    pub fn from_json(json: &str) -> Result<Self, FillError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| FillError::Storage(format!("invalid profile JSON: {}", e)))?;
        Ok(Self::from_json_value(&value))
    }

    pub fn to_json_value(&self) -> Value {
        let mut object = serde_json::Map::new();
        for (category, fields) in &self.categories {
            let inner: serde_json::Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            object.insert(category.clone(), Value::Object(inner));
        }
        Value::Object(object)
    }

    pub fn get(&self, category: &str, key: &str) -> Option<&str> {
        self.fields(category)?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn fields(&self, category: &str) -> Option<&[(String, String)]> {
        self.categories
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, fields)| fields.as_slice())
    }

    /// `(category, fields)` in insertion order
    pub fn categories(&self) -> impl Iterator<Item = (&str, &[(String, String)])> {
        self.categories
            .iter()
            .map(|(c, fields)| (c.as_str(), fields.as_slice()))
    }

    /// `(category, key, value)` for every non-empty entry, in order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.categories.iter().flat_map(|(c, fields)| {
            fields
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .map(move |(k, v)| (c.as_str(), k.as_str(), v.as_str()))
        })
    }

    /// Insert or overwrite. Returns `false` when the stored value was
    /// already identical (or the value is empty).
    pub fn upsert(&mut self, category: &str, key: &str, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }
        let index = match self.categories.iter().position(|(c, _)| c == category) {
            Some(i) => i,
            None => {
                self.categories.push((category.to_string(), Vec::new()));
                self.categories.len() - 1
            }
        };
        let fields = &mut self.categories[index].1;
        match fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) if existing == value => false,
            Some((_, existing)) => {
                *existing = value.to_string();
                true
            }
            None => {
                fields.push((key.to_string(), value.to_string()));
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for ProfileData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for (category, fields) in &self.categories {
            map.serialize_entry(category, &FieldsRef(fields))?;
        }
        map.end()
    }
}

struct FieldsRef<'a>(&'a [(String, String)]);

impl Serialize for FieldsRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ProfileData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json_value(&value))
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Persistence seam for named profiles
pub trait ProfileStore {
    fn get(&self, profile: &str) -> Result<Option<ProfileData>, FillError>;
    fn set(&mut self, profile: &str, data: ProfileData) -> Result<(), FillError>;
}

/// In-memory store; the host mirrors writes into extension storage
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    profiles: HashMap<String, ProfileData>,
    writes: usize,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(profile: &str, data: ProfileData) -> Self {
        let mut store = Self::new();
        store.profiles.insert(profile.to_string(), data);
        store
    }

    /// Number of successful `set` calls
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl ProfileStore for MemoryProfileStore {
    fn get(&self, profile: &str) -> Result<Option<ProfileData>, FillError> {
        Ok(self.profiles.get(profile).cloned())
    }

    fn set(&mut self, profile: &str, data: ProfileData) -> Result<(), FillError> {
        self.profiles.insert(profile.to_string(), data);
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_has_canonical_categories() {
        let data = ProfileData::seeded();
        let names: Vec<&str> = data.categories().map(|(c, _)| c).collect();
        assert_eq!(names, ["personal", "contact", "address", "education", "professional", "other"]);
        assert!(data.is_empty());
    }

    #[test]
    fn test_json_order_and_coercion() {
        let json = r#"{
            "contact": { "phone": "555", "email": "a@b.c" },
            "personal": { "age": 31, "veteran": false, "tags": ["x"], "nick": "" },
            "broken": "not an object"
        }"#;
        let data = ProfileData::from_json(json).unwrap();
        let order: Vec<(&str, &str)> = data.entries().map(|(c, k, _)| (c, k)).collect();
        assert_eq!(
            order,
            [("contact", "phone"), ("contact", "email"), ("personal", "age"), ("personal", "veteran")]
        );
        assert_eq!(data.get("personal", "age"), Some("31"));
        assert_eq!(data.get("personal", "nick"), None);
        assert!(data.fields("broken").is_none());
    }

    #[test]
    fn test_upsert_reports_changes() {
        let mut data = ProfileData::seeded();
        assert!(data.upsert("address", "city", "Lyon"));
        assert!(!data.upsert("address", "city", "Lyon"));
        assert!(data.upsert("address", "city", "Paris"));
        assert!(!data.upsert("address", "zip", ""));
        assert!(data.upsert("custom", "shoe_size", "42"));
        assert_eq!(data.get("custom", "shoe_size"), Some("42"));
    }

    #[test]
    fn test_serialize_preserves_order() {
        let mut data = ProfileData::new();
        data.upsert("contact", "phone", "1");
        data.upsert("contact", "email", "e");
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"contact":{"phone":"1","email":"e"}}"#);
        let back: ProfileData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryProfileStore::new();
        assert_eq!(store.get(DEFAULT_PROFILE).unwrap(), None);
        store.set(DEFAULT_PROFILE, ProfileData::seeded()).unwrap();
        assert!(store.get(DEFAULT_PROFILE).unwrap().is_some());
        assert_eq!(store.write_count(), 1);
    }
}
