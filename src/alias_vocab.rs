//! Alias Vocabulary Builder (§4.7): turns each canonical company into a
//! set of normalized surface phrases the Story Mention Matcher can scan
//! for, honoring curated overrides and discarding ambiguous aliases.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use fancy_regex::Regex as FancyRegex;
use regex::Regex;
use serde::Deserialize;

use crate::normalize::normalized_tokens;
use crate::types::{CanonicalCompany, MergedGroup};

static NON_ALNUM_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static pattern"));

/// Lowercase, expand `&` to ` and `, fold the typographic apostrophe to
/// ASCII, collapse non-alphanumeric runs to a single space, trim. Used
/// both to build alias phrases and to normalize story text before
/// matching, so the two sides of the comparison are in the same form.
pub fn normalize_alias_phrase(text: &str) -> String {
    let lowered = text.to_lowercase().replace('&', " and ").replace('\u{2019}', "'");
    NON_ALNUM_RUN.replace_all(&lowered, " ").trim().to_string()
}

/// Parsed `dailybrief_alias_rules` file. Each field degrades
/// independently to empty on a malformed shape — a broken
/// `alias_overrides` entry does not blank out a well-formed
/// `company_aliases` map.
#[derive(Debug, Default, Clone)]
pub struct AliasRules {
    pub company_aliases: BTreeMap<String, BTreeSet<String>>,
    pub alias_overrides: BTreeMap<String, String>,
    pub blocked_aliases: BTreeSet<String>,
    pub company_blocked_aliases: BTreeMap<String, BTreeSet<String>>,
    pub strict_companies: BTreeSet<String>,
}

#[derive(Deserialize, Default)]
struct AliasRulesPayload {
    #[serde(default)]
    company_aliases: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    alias_overrides: BTreeMap<String, String>,
    #[serde(default)]
    blocked_aliases: Vec<String>,
    #[serde(default)]
    company_blocked_aliases: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    strict_companies: Vec<String>,
}

fn normalize_phrase_set(phrases: &[String]) -> BTreeSet<String> {
    phrases.iter().map(|p| normalize_alias_phrase(p)).filter(|p| !p.is_empty()).collect()
}

/// Load the alias-rules file. Missing or wholly-unparseable files yield
/// `AliasRules::default()`; a parseable-but-partially-wrong shape is
/// handled by serde's field-level defaults.
pub fn load_alias_rules(path: Option<&Path>) -> AliasRules {
    let Some(path) = path else { return AliasRules::default() };
    let Ok(raw) = fs::read_to_string(path) else { return AliasRules::default() };
    let Ok(payload) = serde_json::from_str::<AliasRulesPayload>(&raw) else {
        return AliasRules::default();
    };

    let company_aliases =
        payload.company_aliases.iter().map(|(id, phrases)| (id.clone(), normalize_phrase_set(phrases))).collect();
    let alias_overrides = payload
        .alias_overrides
        .into_iter()
        .map(|(phrase, company_id)| (normalize_alias_phrase(&phrase), company_id))
        .filter(|(phrase, company_id)| !phrase.is_empty() && !company_id.is_empty())
        .collect();
    let blocked_aliases = normalize_phrase_set(&payload.blocked_aliases);
    let company_blocked_aliases = payload
        .company_blocked_aliases
        .iter()
        .map(|(id, phrases)| (id.clone(), normalize_phrase_set(phrases)))
        .collect();
    let strict_companies = payload.strict_companies.into_iter().collect();

    AliasRules { company_aliases, alias_overrides, blocked_aliases, company_blocked_aliases, strict_companies }
}

/// A compiled alias scan pattern plus the first token used for cheap
/// pre-rejection, sorted longest-alias-first within a company.
///
/// The pattern uses `fancy_regex` rather than the plain `regex` crate
/// (§9 design note) because the word boundary here must be zero-width:
/// a boundary character consumed by one alias match would otherwise be
/// unavailable to an adjacent alias sharing that same separator.
#[derive(Debug, Clone)]
pub struct AliasSpec {
    pub alias: String,
    pub first_token: String,
    pub pattern: FancyRegex,
}

fn compile_alias_pattern(alias: &str) -> Option<FancyRegex> {
    let escaped = regex::escape(alias).replace(' ', r"\s+");
    FancyRegex::new(&format!(r"(?<![a-z0-9]){escaped}(?![a-z0-9])")).ok()
}

fn is_numeric_only(phrase: &str) -> bool {
    !phrase.is_empty() && phrase.chars().all(|c| c.is_ascii_digit())
}

/// Build one [`AliasSpec`] list per canonical company (only companies
/// with at least one surviving alias appear), with disambiguation
/// applied across the whole canonical set.
pub fn build_alias_specs(
    companies: &[CanonicalCompany],
    merged_groups: &[MergedGroup],
    rules: &AliasRules,
) -> BTreeMap<String, Vec<AliasSpec>> {
    let member_names: HashMap<&str, Vec<&str>> = merged_groups
        .iter()
        .map(|g| {
            let mut names: Vec<&str> = g.members.iter().map(|m| m.name.as_str()).collect();
            names.push(g.canonical_name.as_str());
            (g.canonical_id.as_str(), names)
        })
        .collect();

    let mut raw_phrases: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for company in companies {
        let mut phrases: BTreeSet<String> = BTreeSet::new();
        if rules.strict_companies.contains(&company.id) {
            if let Some(curated) = rules.company_aliases.get(&company.id) {
                phrases.extend(curated.iter().cloned());
            }
        } else {
            phrases.insert(normalize_alias_phrase(&company.name));
            phrases.insert(normalize_alias_phrase(&normalized_tokens(&company.name).join(" ")));
            if let Some(names) = member_names.get(company.id.as_str()) {
                phrases.extend(names.iter().map(|n| normalize_alias_phrase(n)));
            }
            if let Some(curated) = rules.company_aliases.get(&company.id) {
                phrases.extend(curated.iter().cloned());
            }
            for (phrase, target) in &rules.alias_overrides {
                if target == &company.id {
                    phrases.insert(phrase.clone());
                }
            }
            if let Some(symbol) = company.market_key.as_deref().and_then(|key| key.split(':').next_back()) {
                let symbol = normalize_alias_phrase(symbol);
                if (2..=12).contains(&symbol.len()) && !is_numeric_only(&symbol) {
                    phrases.insert(symbol);
                }
            }
        }

        let company_blocked = rules.company_blocked_aliases.get(&company.id);
        phrases.retain(|phrase| {
            phrase.len() >= 2
                && !is_numeric_only(phrase)
                && !rules.blocked_aliases.contains(phrase)
                && !company_blocked.is_some_and(|blocked| blocked.contains(phrase))
        });

        if !phrases.is_empty() {
            raw_phrases.insert(company.id.clone(), phrases);
        }
    }

    let mut inverted: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (company_id, phrases) in &raw_phrases {
        for phrase in phrases {
            inverted.entry(phrase.as_str()).or_default().insert(company_id.as_str());
        }
    }

    let mut out: BTreeMap<String, Vec<AliasSpec>> = BTreeMap::new();
    for (company_id, phrases) in &raw_phrases {
        let mut specs: Vec<AliasSpec> = Vec::new();
        for phrase in phrases {
            let claimants = &inverted[phrase.as_str()];
            let owner = rules.alias_overrides.get(phrase.as_str());
            let retained = match owner {
                Some(owner_id) => owner_id == company_id,
                None => claimants.len() == 1,
            };
            if !retained {
                continue;
            }
            let Some(pattern) = compile_alias_pattern(phrase) else { continue };
            let first_token = phrase.split_whitespace().next().unwrap_or("").to_string();
            specs.push(AliasSpec { alias: phrase.clone(), first_token, pattern });
        }
        specs.sort_by(|a, b| b.alias.len().cmp(&a.alias.len()).then_with(|| a.alias.cmp(&b.alias)));
        if !specs.is_empty() {
            out.insert(company_id.clone(), specs);
        }
    }

    out
}
