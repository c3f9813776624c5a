//! Site-specific rules
//!
//! - `SiteRegistry`: built-in and custom configs keyed by hostname substring
//!   (selectors, scan wait, special handlers). Handler substrings are matched
//!   with an Aho-Corasick automaton; declaration order breaks ties.
//! - `SiteLearnedPatterns`: manual field mappings per hostname, the
//!   highest-priority override in identification.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dom::{Dom, NodeId, SelectorList};
use crate::error::FillError;

pub const DEFAULT_INPUT_SELECTORS: &[&str] = &["input", "select", "textarea"];
pub const DEFAULT_FORM_SELECTORS: &[&str] = &["form"];

// =============================================================================
// Site configs
// =============================================================================

/// Serializable description of a site config
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfigSpec {
    /// Hostname substring, e.g. `linkedin.com`
    pub host: String,
    #[serde(default)]
    pub form_selectors: Vec<String>,
    #[serde(default)]
    pub input_selectors: Vec<String>,
    #[serde(default)]
    pub wait_time_ms: u64,
    /// Ordered (identifier substring, data type key) pairs
    #[serde(default)]
    pub special_handlers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    spec: SiteConfigSpec,
    input_selector: SelectorList,
    form_selector: SelectorList,
    handlers: Option<AhoCorasick>,
}

impl SiteConfig {
    pub fn new(spec: SiteConfigSpec) -> Result<Self, FillError> {
        let input_selector = if spec.input_selectors.is_empty() {
            SelectorList::from_parts(DEFAULT_INPUT_SELECTORS)?
        } else {
            SelectorList::from_parts(&spec.input_selectors)?
        };
        let form_selector = if spec.form_selectors.is_empty() {
            SelectorList::from_parts(DEFAULT_FORM_SELECTORS)?
        } else {
            SelectorList::from_parts(&spec.form_selectors)?
        };
        let handlers = if spec.special_handlers.is_empty() {
            None
        } else {
            let needles: Vec<String> = spec
                .special_handlers
                .iter()
                .map(|(needle, _)| needle.to_lowercase())
                .collect();
            let automaton = AhoCorasickBuilder::new()
                .match_kind(MatchKind::Standard)
                .build(&needles)
                .map_err(|e| FillError::InvalidPattern(format!("site handlers for {}: {}", spec.host, e)))?;
            Some(automaton)
        };
        Ok(Self {
            spec,
            input_selector,
            form_selector,
            handlers,
        })
    }

    pub fn host(&self) -> &str {
        &self.spec.host
    }

    pub fn wait_time_ms(&self) -> u64 {
        self.spec.wait_time_ms
    }

    pub fn input_selector(&self) -> &SelectorList {
        &self.input_selector
    }

    pub fn form_selector(&self) -> &SelectorList {
        &self.form_selector
    }

    pub fn spec(&self) -> &SiteConfigSpec {
        &self.spec
    }

    /// Data type of the first declared handler contained in `identifier`
    pub fn match_handler(&self, identifier: &str) -> Option<(&str, &str)> {
        let automaton = self.handlers.as_ref()?;
        let first = automaton
            .find_overlapping_iter(identifier)
            .map(|m| m.pattern().as_usize())
            .min()?;
        let (needle, key) = &self.spec.special_handlers[first];
        Some((needle.as_str(), key.as_str()))
    }
}

fn spec(
    host: &str,
    forms: &[&str],
    inputs: &[&str],
    wait_time_ms: u64,
    handlers: &[(&str, &str)],
) -> SiteConfigSpec {
    SiteConfigSpec {
        host: host.to_string(),
        form_selectors: forms.iter().map(|s| s.to_string()).collect(),
        input_selectors: inputs.iter().map(|s| s.to_string()).collect(),
        wait_time_ms,
        special_handlers: handlers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

/// Built-in configs for job boards with unusual markup
pub fn builtin_site_specs() -> Vec<SiteConfigSpec> {
    vec![
        spec(
            "linkedin.com",
            &["form", ".jobs-easy-apply-modal", ".artdeco-modal"],
            &["input", "select", "textarea", r#"[contenteditable="true"]"#],
            1000,
            &[
                ("first-name", "firstName"),
                ("last-name", "lastName"),
                ("email-address", "email"),
                ("phone-number", "phone"),
                ("headline", "jobTitle"),
                ("current-company", "company"),
            ],
        ),
        spec(
            "indeed.com",
            &["form", ".ia-container", r#"[data-testid="application-form"]"#],
            &["input", "select", "textarea"],
            800,
            &[
                ("input-firstName", "firstName"),
                ("input-lastName", "lastName"),
                ("input-email", "email"),
                ("input-phoneNumber", "phone"),
            ],
        ),
        spec("glassdoor.com", &["form", ".application-form"], &["input", "select", "textarea"], 1000, &[]),
        spec(
            "workday.com",
            &["form", r#"[data-automation-id="applicationForm"]"#],
            &["input", "select", "textarea", "[data-automation-id]"],
            1500,
            &[],
        ),
        spec("greenhouse.io", &["#application", "form"], &["input", "select", "textarea"], 500, &[]),
        spec("lever.co", &[".application-form", "form"], &["input", "select", "textarea"], 500, &[]),
    ]
}

/// Ordered site configs; the first whose host is a substring of the page
/// hostname applies
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    sites: Vec<SiteConfig>,
}

impl SiteRegistry {
    pub fn builtin() -> Self {
        // Built-in specs are static and known to compile
        let sites = builtin_site_specs()
            .into_iter()
            .filter_map(|s| SiteConfig::new(s).ok())
            .collect();
        Self { sites }
    }

    pub fn empty() -> Self {
        Self { sites: Vec::new() }
    }

    pub fn from_specs(specs: Vec<SiteConfigSpec>) -> Result<Self, FillError> {
        let sites = specs
            .into_iter()
            .map(SiteConfig::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { sites })
    }

    pub fn push(&mut self, spec: SiteConfigSpec) -> Result<(), FillError> {
        self.sites.push(SiteConfig::new(spec)?);
        Ok(())
    }

    pub fn for_hostname(&self, hostname: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|site| hostname.contains(site.host()))
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// =============================================================================
// Learned (manual) mappings
// =============================================================================

/// hostname -> { normalized element key -> data type key }
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteLearnedPatterns {
    hosts: BTreeMap<String, BTreeMap<String, String>>,
}

/// A single manual mapping, returned for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualMapping {
    pub hostname: String,
    pub element_key: String,
    pub field_key: String,
}

impl SiteLearnedPatterns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate lookup keys of an element: id, name, placeholder (lowercased)
    pub fn element_keys(dom: &Dom, input: NodeId) -> Vec<String> {
        ["id", "name", "placeholder"]
            .iter()
            .filter_map(|attr| dom.attr_nonempty(input, attr))
            .map(|v| v.to_lowercase())
            .collect()
    }

    /// Key a new manual mapping is stored under
    pub fn normalized_key(dom: &Dom, input: NodeId) -> Option<String> {
        Self::element_keys(dom, input).into_iter().next()
    }

    pub fn lookup(&self, hostname: &str, element_key: &str) -> Option<&str> {
        self.hosts
            .get(hostname)?
            .get(&element_key.to_lowercase())
            .map(String::as_str)
    }

    /// First mapping hit for the element's id, name, then placeholder
    pub fn lookup_element(&self, hostname: &str, dom: &Dom, input: NodeId) -> Option<&str> {
        Self::element_keys(dom, input)
            .iter()
            .find_map(|key| self.lookup(hostname, key))
    }

    pub fn insert(&mut self, mapping: ManualMapping) {
        self.hosts
            .entry(mapping.hostname)
            .or_default()
            .insert(mapping.element_key.to_lowercase(), mapping.field_key);
    }

    pub fn for_host(&self, hostname: &str) -> Option<&BTreeMap<String, String>> {
        self.hosts.get(hostname)
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
