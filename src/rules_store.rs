//! Rule Store (§4.2): loads the three optional curator-authored JSON rule
//! files into immutable, normalized-name-keyed rule sets. Every loader in
//! this module is total — a missing, unreadable, or malformed file simply
//! yields an empty rule set rather than an error, per §7's "malformed
//! rule file" error kind.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use regex::RegexBuilder;
use serde::Deserialize;
use serde_json::Value;

use crate::normalize::{name_key, raw_normalized_key};

/// An unordered pair of name keys, stored with the lexicographically
/// smaller key first so equality/containment checks don't care which
/// side was "left" in the source file.
pub type NamePair = (String, String);

pub fn pair(a: impl Into<String>, b: impl Into<String>) -> NamePair {
    let (a, b) = (a.into(), b.into());
    if a <= b { (a, b) } else { (b, a) }
}

/// Hard-coded block seeded into every run regardless of the block rules
/// file's contents (§4.2, §9 open question).
const HARD_CODED_BLOCK: (&str, &str) = ("Reliance Consumer Products", "Reliance Industries");

#[derive(Debug, Default, Clone)]
pub struct NonCompanyRules {
    pub exact_name_keys: BTreeSet<String>,
    pub allow_name_keys: BTreeSet<String>,
    pub name_patterns: Vec<regex::Regex>,
}

impl NonCompanyRules {
    /// Whether `name` matches the rule-based (not sentence-heuristic)
    /// non-company check: `allow_names` overrides both other lists.
    pub fn matches(&self, name: &str) -> bool {
        let key = raw_normalized_key(name);
        if self.allow_name_keys.contains(&key) {
            return false;
        }
        if self.exact_name_keys.contains(&key) {
            return true;
        }
        self.name_patterns.iter().any(|re| re.is_match(name))
    }
}

fn read_json_object(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

/// Pull `value[key]` as a JSON array, or an empty one if it's absent or
/// not an array — a top-level shape mismatch degrades the whole file,
/// but never panics.
fn array_field<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

/// One item's worth of a `string | null`, tolerating the original's
/// `str(item or "")` coercion of `null`/missing into an empty string.
fn item_as_str(item: Option<&Value>) -> Option<&str> {
    match item {
        None => Some(""),
        Some(Value::Null) => Some(""),
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

/// Parse `raw_pairs` (already extracted from its JSON key) per item,
/// `continue`-ing past anything that isn't a 2-element array of strings,
/// matching the original's `_load_rule_pairs` tolerance for malformed
/// individual entries rather than failing the whole file on one typo.
fn load_pairs(raw_pairs: &[Value]) -> BTreeSet<NamePair> {
    raw_pairs
        .iter()
        .filter_map(|item| {
            let entry = item.as_array()?;
            if entry.len() != 2 {
                return None;
            }
            let left = item_as_str(entry.first())?;
            let right = item_as_str(entry.get(1))?;
            let left_key = name_key(left);
            let right_key = name_key(right);
            if left_key.is_empty() || right_key.is_empty() || left_key == right_key {
                None
            } else {
                Some(pair(left_key, right_key))
            }
        })
        .collect()
}

/// Load `{aliases: [[a, b], ...]}` into unordered, name-key normalized
/// pairs. Absent or malformed file yields an empty set; a malformed
/// individual entry is skipped without affecting the rest.
pub fn load_alias_pairs(path: Option<&Path>) -> BTreeSet<NamePair> {
    let Some(value) = read_json_object(path) else {
        return BTreeSet::new();
    };
    load_pairs(array_field(&value, "aliases"))
}

/// Load `{blocks: [[a, b], ...]}`, always seeding the hard-coded block
/// pair on top of whatever the file contains.
pub fn load_block_pairs(path: Option<&Path>) -> BTreeSet<NamePair> {
    let mut pairs = match read_json_object(path) {
        Some(value) => load_pairs(array_field(&value, "blocks")),
        None => BTreeSet::new(),
    };
    pairs.insert(pair(name_key(HARD_CODED_BLOCK.0), name_key(HARD_CODED_BLOCK.1)));
    pairs
}

#[derive(Deserialize, Default)]
struct NonCompanyPayload {
    #[serde(default)]
    exact_names: Vec<String>,
    #[serde(default)]
    allow_names: Vec<String>,
    #[serde(default)]
    name_patterns: Vec<String>,
}

/// Load `{exact_names, name_patterns, allow_names}`. A pattern that fails
/// to compile is dropped rather than failing the whole file.
pub fn load_non_company_rules(path: Option<&Path>) -> NonCompanyRules {
    let Some(value) = read_json_object(path) else {
        return NonCompanyRules::default();
    };
    let Ok(payload) = serde_json::from_value::<NonCompanyPayload>(value) else {
        return NonCompanyRules::default();
    };

    let exact_name_keys = payload
        .exact_names
        .iter()
        .map(|s| raw_normalized_key(s))
        .filter(|k| !k.is_empty())
        .collect();
    let allow_name_keys = payload
        .allow_names
        .iter()
        .map(|s| raw_normalized_key(s))
        .filter(|k| !k.is_empty())
        .collect();
    let name_patterns = payload
        .name_patterns
        .iter()
        .filter(|p| !p.trim().is_empty())
        .filter_map(|p| RegexBuilder::new(p).case_insensitive(true).build().ok())
        .collect();

    NonCompanyRules {
        exact_name_keys,
        allow_name_keys,
        name_patterns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn missing_alias_file_is_empty() {
        assert!(load_alias_pairs(None).is_empty());
    }

    #[test]
    fn malformed_alias_file_is_empty() {
        let file = write_temp("not json");
        assert!(load_alias_pairs(Some(file.path())).is_empty());
    }

    #[test]
    fn alias_pair_collapsing_to_same_key_is_dropped() {
        let file = write_temp(r#"{"aliases": [["Acme Industries Ltd", "Acme Industries"]]}"#);
        let pairs = load_alias_pairs(Some(file.path()));
        assert!(pairs.is_empty(), "both sides normalize to the same key, so the pair is dropped");
    }

    #[test]
    fn alias_pair_with_distinct_keys_is_kept() {
        let file = write_temp(r#"{"aliases": [["SBI", "State Bank of India"]]}"#);
        let pairs = load_alias_pairs(Some(file.path()));
        assert_eq!(pairs.len(), 1);
        assert!(pairs.contains(&pair(name_key("SBI"), name_key("State Bank of India"))));
    }

    #[test]
    fn malformed_individual_entries_are_skipped_not_fatal_to_the_file() {
        let file = write_temp(
            r#"{"aliases": [
                ["SBI"],
                ["SBI", "State Bank of India", "extra"],
                ["SBI", 5],
                "not a pair",
                ["Acme Retail", "Acme Motors"]
            ]}"#,
        );
        let pairs = load_alias_pairs(Some(file.path()));
        assert_eq!(pairs.len(), 1, "only the one well-formed pair survives");
        assert!(pairs.contains(&pair(name_key("Acme Retail"), name_key("Acme Motors"))));
    }

    #[test]
    fn block_pairs_always_include_hard_coded_reliance_pair() {
        let pairs = load_block_pairs(None);
        assert_eq!(pairs.len(), 1);
        assert!(pairs.contains(&pair(name_key(HARD_CODED_BLOCK.0), name_key(HARD_CODED_BLOCK.1))));
    }

    #[test]
    fn non_company_rules_allow_overrides_exact() {
        let file = write_temp(r#"{"exact_names": ["Acme Watch"], "allow_names": ["Acme Watch"]}"#);
        let rules = load_non_company_rules(Some(file.path()));
        assert!(!rules.matches("Acme Watch"));
    }

    #[test]
    fn non_company_rules_exact_match_fires() {
        let file = write_temp(r#"{"exact_names": ["Market Roundup"]}"#);
        let rules = load_non_company_rules(Some(file.path()));
        assert!(rules.matches("Market Roundup"));
        assert!(!rules.matches("Unrelated Co"));
    }

    #[test]
    fn non_company_rules_pattern_is_case_insensitive() {
        let file = write_temp(r#"{"name_patterns": ["^daily\\s+wrap"]}"#);
        let rules = load_non_company_rules(Some(file.path()));
        assert!(rules.matches("DAILY WRAP: markets close higher"));
    }

    #[test]
    fn invalid_pattern_is_dropped_not_fatal() {
        let file = write_temp(r#"{"name_patterns": ["(unterminated"]}"#);
        let rules = load_non_company_rules(Some(file.path()));
        assert!(rules.name_patterns.is_empty());
    }
}
