//! Pattern Bank - data-type classification via ordered regex lists
//!
//! Each data type key (`firstName`, `jobTitle`, ...) owns an ordered list of
//! case-insensitive patterns tested against the composed field identifier.
//! Data types are checked in declaration order and the first hit wins, so
//! specific keys sit above looser ones they overlap with
//! (`alternateEmail` before `email`, `graduationDate` before `graduationYear`).
//!
//! Patterns compile once into a process-wide table.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// ==================== CATEGORIES ====================

/// Canonical profile groupings
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Personal,
    Contact,
    Address,
    Education,
    Professional,
    Other,
}

impl Category {
    /// Declaration order, also the seeding order of a fresh profile
    pub const ALL: [Category; 6] = [
        Category::Personal,
        Category::Contact,
        Category::Address,
        Category::Education,
        Category::Professional,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Personal => "personal",
            Category::Contact => "contact",
            Category::Address => "address",
            Category::Education => "education",
            Category::Professional => "professional",
            Category::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== DICTIONARIES ====================

// (data type key, category, patterns)
const FIELD_PATTERNS: &[(&str, Category, &[&str])] = &[
    // Personal
    ("firstName", Category::Personal, &[r"first.?name", r"fname", r"given.?name", r"forename", r"prenom"]),
    ("lastName", Category::Personal, &[r"last.?name", r"lname", r"surname", r"family.?name", r"sname"]),
    ("fullName", Category::Personal, &[r"full.?name", r"^name$", r"your.?name", r"display.?name", r"complete.?name"]),
    ("middleName", Category::Personal, &[r"middle.?name", r"mname"]),
    ("dob", Category::Personal, &[r"birth", r"dob", r"date.?of.?birth", r"birthday", r"born"]),
    ("gender", Category::Personal, &[r"gender", r"sex"]),
    ("nationality", Category::Personal, &[r"nationality", r"citizenship"]),
    // Contact
    ("alternateEmail", Category::Contact, &[r"alternate.?email", r"secondary.?email", r"other.?email", r"backup.?email"]),
    ("alternatePhone", Category::Contact, &[r"alternate.?phone", r"secondary.?phone", r"work.?phone", r"home.?phone"]),
    ("email", Category::Contact, &[r"e.?mail", r"email.?address", r"correo", r"courriel"]),
    ("phone", Category::Contact, &[r"phone", r"mobile", r"tel", r"contact.?number", r"cell", r"telefono", r"numero"]),
    // Address
    ("street", Category::Address, &[r"street", r"address.?1", r"address.?line", r"^address$", r"direccion", r"adresse"]),
    ("apartment", Category::Address, &[r"apartment", r"apt", r"unit", r"suite", r"address.?2", r"flat", r"floor"]),
    ("city", Category::Address, &[r"city", r"town", r"locality", r"ciudad", r"ville", r"ort"]),
    ("state", Category::Address, &[r"state", r"province", r"region", r"estado", r"provincia"]),
    ("zip", Category::Address, &[r"zip", r"postal", r"post.?code", r"pin.?code", r"code.?postal", r"plz"]),
    ("country", Category::Address, &[r"country", r"nation", r"pais", r"pays", r"land"]),
    // Professional
    ("currentEmployer", Category::Professional, &[r"current.?employer", r"present.?company"]),
    ("previousEmployer", Category::Professional, &[r"previous.?employer", r"former.?company", r"past.?employer"]),
    ("company", Category::Professional, &[r"company", r"organization", r"employer", r"current.?company", r"org", r"firma", r"entreprise"]),
    ("jobTitle", Category::Professional, &[r"job.?title", r"position", r"role", r"designation", r"^title$", r"puesto", r"poste"]),
    ("department", Category::Professional, &[r"department", r"dept", r"team", r"division"]),
    ("linkedin", Category::Professional, &[r"linkedin", r"linked.?in"]),
    ("website", Category::Professional, &[r"website", r"portfolio", r"personal.?site", r"homepage", r"blog"]),
    ("github", Category::Professional, &[r"github"]),
    ("twitter", Category::Professional, &[r"twitter", r"x\.com"]),
    // Education
    ("university", Category::Education, &[r"university", r"college", r"school", r"institution", r"alma.?mater", r"universidad", r"universite"]),
    ("degree", Category::Education, &[r"degree", r"qualification", r"diploma", r"certificate", r"titulo", r"diplome"]),
    ("major", Category::Education, &[r"major", r"field.?of.?study", r"specialization", r"concentration", r"subject", r"discipline"]),
    ("minor", Category::Education, &[r"minor"]),
    ("gpa", Category::Education, &[r"gpa", r"cgpa", r"grade", r"score", r"average", r"marks", r"percentage"]),
    ("graduationDate", Category::Education, &[r"graduation.?date", r"completion.?date"]),
    ("graduationYear", Category::Education, &[r"graduation", r"grad.?year", r"year.?of.?completion", r"completion.?year", r"passing.?year"]),
    ("startYear", Category::Education, &[r"start.?year", r"from.?year", r"admission", r"joining", r"enrolled"]),
    ("endYear", Category::Education, &[r"end.?year", r"to.?year"]),
    ("educationLevel", Category::Education, &[r"education.?level", r"highest.?qualification", r"level"]),
    // Work experience
    ("experience", Category::Professional, &[r"experience", r"years?.?of", r"work.?history"]),
    ("startDate", Category::Professional, &[r"start.?date", r"from.?date", r"date.?from", r"join.?date"]),
    ("endDate", Category::Professional, &[r"end.?date", r"to.?date", r"date.?to", r"leaving.?date"]),
    ("salary", Category::Professional, &[r"salary", r"compensation", r"pay", r"ctc", r"expected.?salary", r"current.?salary"]),
    ("noticePeriod", Category::Professional, &[r"notice.?period", r"notice"]),
    // Skills and others
    ("skills", Category::Other, &[r"skill", r"expertise", r"competenc", r"technolog"]),
    ("languages", Category::Other, &[r"language", r"idioma", r"langue", r"sprache"]),
    ("bio", Category::Other, &[r"bio", r"about", r"summary", r"description", r"profile", r"objective"]),
    ("hobbies", Category::Other, &[r"hobb", r"interest", r"pastime"]),
    ("references", Category::Other, &[r"reference", r"referral"]),
    // Identity documents
    ("passport", Category::Personal, &[r"passport"]),
    ("drivingLicense", Category::Personal, &[r"driving.?license", r"driver.?license", r"dl.?number"]),
    ("nationalId", Category::Personal, &[r"national.?id", r"id.?number", r"aadhaar", r"pan", r"voter"]),
    // Social
    ("facebook", Category::Other, &[r"facebook", r"fb"]),
    ("instagram", Category::Other, &[r"instagram", r"insta"]),
    // Uploads, recognized so they are not relearned under a made-up name
    ("resume", Category::Other, &[r"resume", r"cv", r"curriculum"]),
    ("coverLetter", Category::Other, &[r"cover.?letter"]),
    ("photo", Category::Other, &[r"photo", r"picture", r"avatar", r"image"]),
];

/// Data types whose presence forces the confirmation step
const SENSITIVE_KEYS: &[&str] = &["passport", "drivingLicense", "nationalId", "dob", "salary"];

// ==================== MAIN IMPLEMENTATION ====================

struct PatternEntry {
    key: &'static str,
    category: Category,
    patterns: Vec<Regex>,
}

/// Ordered registry of data types and their patterns
pub struct PatternBank {
    entries: Vec<PatternEntry>,
}

static BANK: OnceLock<PatternBank> = OnceLock::new();

/// Shared, lazily compiled pattern bank
pub fn pattern_bank() -> &'static PatternBank {
    BANK.get_or_init(PatternBank::new)
}

/// Compile a literal pattern case-insensitively
pub(crate) fn compile_ci(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){}", pattern)).unwrap()
}

impl PatternBank {
    fn new() -> Self {
        let entries = FIELD_PATTERNS
            .iter()
            .map(|(key, category, patterns)| PatternEntry {
                key,
                category: *category,
                patterns: patterns.iter().map(|p| compile_ci(p)).collect(),
            })
            .collect();
        Self { entries }
    }

    /// First data type (declaration order) with a pattern matching `identifier`
    pub fn classify(&self, identifier: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|entry| entry.patterns.iter().any(|re| re.is_match(identifier)))
            .map(|entry| entry.key)
    }

    /// Category for a data type; unknown and freshly learned keys are `Other`
    pub fn category_of(&self, key: &str) -> Category {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.category)
            .unwrap_or(Category::Other)
    }

    /// True when one of `key`'s own patterns matches `identifier`
    pub fn key_matches(&self, key: &str, identifier: &str) -> bool {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.patterns.iter().any(|re| re.is_match(identifier)))
            .unwrap_or(false)
    }

    /// Compiled patterns of `key`, empty for unknown keys
    pub fn patterns_for(&self, key: &str) -> &[Regex] {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.patterns.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_known(&self, key: &str) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn classify_by_pattern(identifier: &str) -> Option<&'static str> {
    pattern_bank().classify(identifier)
}

pub fn category_of(key: &str) -> Category {
    pattern_bank().category_of(key)
}

pub fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.contains(&key)
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_address_is_email() {
        assert_eq!(classify_by_pattern("email_address"), Some("email"));
    }

    #[test]
    fn test_specific_keys_win_over_loose_ones() {
        assert_eq!(classify_by_pattern("secondary email"), Some("alternateEmail"));
        assert_eq!(classify_by_pattern("work phone"), Some("alternatePhone"));
        assert_eq!(classify_by_pattern("graduation date"), Some("graduationDate"));
        assert_eq!(classify_by_pattern("graduation"), Some("graduationYear"));
        assert_eq!(classify_by_pattern("current employer"), Some("currentEmployer"));
    }

    #[test]
    fn test_declaration_order_decides_overlaps() {
        // "org" (company) is declared before "pan" (nationalId)
        assert_eq!(classify_by_pattern("company"), Some("company"));
        assert_eq!(classify_by_pattern("first name"), Some("firstName"));
        assert_eq!(classify_by_pattern("given-name"), Some("firstName"));
    }

    #[test]
    fn test_anchored_patterns_need_whole_identifier() {
        assert_eq!(classify_by_pattern("title"), Some("jobTitle"));
        assert_eq!(classify_by_pattern("name"), Some("fullName"));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(classify_by_pattern("favourite colour"), None);
    }

    #[test]
    fn test_category_defaults_to_other() {
        assert_eq!(category_of("email"), Category::Contact);
        assert_eq!(category_of("zip"), Category::Address);
        assert_eq!(category_of("resume"), Category::Other);
        assert_eq!(category_of("favourite_colour"), Category::Other);
    }

    #[test]
    fn test_every_key_has_a_category() {
        let bank = pattern_bank();
        assert!(bank.len() > 40);
        for key in bank.keys() {
            assert!(bank.is_known(key));
            let _ = bank.category_of(key);
        }
    }

    #[test]
    fn test_patterns_for() {
        let bank = pattern_bank();
        assert!(bank.patterns_for("email").iter().any(|re| re.is_match("E-Mail")));
        assert!(bank.patterns_for("favouriteColour").is_empty());
    }

    #[test]
    fn test_key_matches() {
        let bank = pattern_bank();
        assert!(bank.key_matches("phone", "mobile number"));
        assert!(!bank.key_matches("email", "mobile number"));
        assert!(!bank.key_matches("unknownKey", "anything"));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("Education"), Some(Category::Education));
        assert_eq!(Category::parse("misc"), None);
    }
}
