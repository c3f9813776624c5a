//! Minimal CSS selector matching
//!
//! Supports comma-separated compound selectors built from a tag name,
//! `#id`, `.class`, `[attr]`, `[attr="value"]` and `:not([attr...])`.
//! Combinators are not supported; every selector the engine uses is a
//! single compound.

use crate::dom::document::{Dom, NodeId};
use crate::error::FillError;

#[derive(Debug, Clone, PartialEq)]
struct AttrSelector {
    name: String,
    value: Option<String>,
}

impl AttrSelector {
    fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        match (dom.attr(node, &self.name), &self.value) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
    negated: Vec<AttrSelector>,
}

impl Compound {
    fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        let Some(el) = dom.element(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if tag != "*" && *tag != el.tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| el.has_class(c))
            && self.attrs.iter().all(|a| a.matches(dom, node))
            && !self.negated.iter().any(|a| a.matches(dom, node))
    }
}

/// Parsed selector list (`a, b, c`)
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    source: String,
    compounds: Vec<Compound>,
}

impl SelectorList {
    pub fn parse(source: &str) -> Result<Self, FillError> {
        let compounds = split_top_level(source)
            .into_iter()
            .map(|part| parse_compound(part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        if compounds.is_empty() {
            return Err(FillError::InvalidPattern(format!("empty selector: {:?}", source)));
        }
        Ok(Self {
            source: source.to_string(),
            compounds,
        })
    }

    /// Join several selector strings into one list
    pub fn from_parts<S: AsRef<str>>(parts: &[S]) -> Result<Self, FillError> {
        let joined = parts.iter().map(|p| p.as_ref()).collect::<Vec<_>>().join(", ");
        Self::parse(&joined)
    }

    pub fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        self.compounds.iter().any(|c| c.matches(dom, node))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Split on commas that are not inside brackets, parens or quotes
fn split_top_level(source: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in source.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(&source[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&source[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '*'
}

fn parse_compound(part: &str) -> Result<Compound, FillError> {
    let err = || FillError::InvalidPattern(format!("unsupported selector: {:?}", part));
    let chars: Vec<char> = part.chars().collect();
    let mut compound = Compound::default();
    let mut i = 0;

    let read_ident = |i: &mut usize| -> String {
        let start = *i;
        while *i < chars.len() && is_ident_char(chars[*i]) {
            *i += 1;
        }
        chars[start..*i].iter().collect()
    };

    while i < chars.len() {
        match chars[i] {
            '#' => {
                i += 1;
                compound.id = Some(read_ident(&mut i));
            }
            '.' => {
                i += 1;
                compound.classes.push(read_ident(&mut i));
            }
            '[' => {
                let (attr, next) = parse_attr(&chars, i).ok_or_else(err)?;
                compound.attrs.push(attr);
                i = next;
            }
            ':' => {
                let rest: String = chars[i..].iter().collect();
                if !rest.starts_with(":not(") {
                    return Err(err());
                }
                i += ":not(".len();
                let (attr, next) = parse_attr(&chars, i).ok_or_else(err)?;
                if chars.get(next) != Some(&')') {
                    return Err(err());
                }
                compound.negated.push(attr);
                i = next + 1;
            }
            c if is_ident_char(c) && compound.tag.is_none() && i == 0 => {
                compound.tag = Some(read_ident(&mut i).to_ascii_lowercase());
            }
            _ => return Err(err()),
        }
    }
    Ok(compound)
}

/// Parse `[name]` or `[name="value"]` starting at `chars[start] == '['`
fn parse_attr(chars: &[char], start: usize) -> Option<(AttrSelector, usize)> {
    if chars.get(start) != Some(&'[') {
        return None;
    }
    let close = chars[start..].iter().position(|c| *c == ']')? + start;
    let inner: String = chars[start + 1..close].iter().collect();
    let attr = match inner.split_once('=') {
        Some((name, value)) => AttrSelector {
            name: name.trim().to_ascii_lowercase(),
            value: Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string()),
        },
        None => AttrSelector {
            name: inner.trim().to_ascii_lowercase(),
            value: None,
        },
    };
    if attr.name.is_empty() {
        return None;
    }
    Some((attr, close + 1))
}
