//! Compatibility Oracle (§4.4): the single pure predicate the Resolution
//! Engine consults to decide whether two raw names denote the same
//! company, plus the non-company predicate used to quarantine stray
//! sentences mistaken for company names.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::normalize::{self, ACRONYM_SUFFIX_STRIP_TOKENS, name_key, normalized_tokens, strip_trailing, tokens};
use crate::rules_store::{NamePair, NonCompanyRules, pair};
use crate::similarity;

/// Tokens that may trail a single-token name without breaking
/// compatibility (§4.4 step 6): `"Tata"` vs `"Tata Group"`.
static SOFT_TOKENS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ["india", "indian", "group", "global", "international", "holding", "holdings"].into_iter().collect());

/// Tokens ignored when building an initialism from a long name's tokens
/// (§4.4 step 8): `"Bank of India"` → initials `"bi"`, not `"boi"`.
static INITIALISM_IGNORED_TOKENS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| ["and", "of", "the"].into_iter().collect());

static SENTENCE_START_TOKENS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "we",
        "we've",
        "our",
        "this",
        "that",
        "these",
        "those",
        "broader",
        "sectoral",
        "check",
        "have",
        "introducing",
        "given",
        "are",
    ]
    .into_iter()
    .collect()
});

static COMPANY_HINT_TOKENS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "bank",
        "bancorp",
        "bancshares",
        "beverages",
        "bio",
        "biosciences",
        "capital",
        "chemicals",
        "company",
        "communications",
        "corp",
        "corporation",
        "energy",
        "engineering",
        "financial",
        "foods",
        "group",
        "holding",
        "holdings",
        "inc",
        "industries",
        "insurance",
        "international",
        "labs",
        "limited",
        "ltd",
        "motors",
        "pharma",
        "pharmaceuticals",
        "plc",
        "private",
        "pvt",
        "retail",
        "sa",
        "systems",
        "technologies",
        "technology",
    ]
    .into_iter()
    .collect()
});

/// `compatible(left, right, ...)`: symmetric, deterministic, pure.
pub fn compatible(left: &str, right: &str, alias_pairs: &HashSet<NamePair>, block_pairs: &HashSet<NamePair>) -> bool {
    let left_key = name_key(left);
    let right_key = name_key(right);
    if left_key.is_empty() || right_key.is_empty() {
        return false;
    }

    let rule_pair = pair(left_key, right_key);
    if block_pairs.contains(&rule_pair) {
        return false;
    }
    if alias_pairs.contains(&rule_pair) {
        return true;
    }

    let left_normalized = normalized_tokens(left);
    let right_normalized = normalized_tokens(right);
    if left_normalized.is_empty() || right_normalized.is_empty() {
        return false;
    }
    if left_normalized == right_normalized {
        return true;
    }
    if left_normalized.concat() == right_normalized.concat() {
        return true;
    }

    let similarity = similarity::ratio(&left_normalized.join(" "), &right_normalized.join(" "));
    if similarity >= 0.93 {
        return true;
    }

    let (shorter, longer) = if left_normalized.len() <= right_normalized.len() {
        (&left_normalized, &right_normalized)
    } else {
        (&right_normalized, &left_normalized)
    };
    if shorter.len() >= 3 && longer[..shorter.len()] == shorter[..] {
        return true;
    }
    if shorter.len() == 1 && is_soft_extension(shorter, longer) {
        return true;
    }

    let shorter_set: HashSet<&str> = shorter.iter().map(String::as_str).collect();
    let longer_set: HashSet<&str> = longer.iter().map(String::as_str).collect();
    if shorter.len() >= 2 && shorter_set.is_subset(&longer_set) {
        return true;
    }

    let left_for_acronym = strip_trailing(tokens(left), &ACRONYM_SUFFIX_STRIP_TOKENS);
    let right_for_acronym = strip_trailing(tokens(right), &ACRONYM_SUFFIX_STRIP_TOKENS);
    matches_trailing_initialism(&left_for_acronym, &right_for_acronym)
        || matches_trailing_initialism(&right_for_acronym, &left_for_acronym)
        || matches_full_initialism(&left_for_acronym, &right_for_acronym)
        || matches_full_initialism(&right_for_acronym, &left_for_acronym)
}

fn is_soft_extension(short_tokens: &[String], long_tokens: &[String]) -> bool {
    if short_tokens.is_empty() || short_tokens.len() > long_tokens.len() {
        return false;
    }
    if long_tokens[..short_tokens.len()] != short_tokens[..] {
        return false;
    }
    let tail = &long_tokens[short_tokens.len()..];
    !tail.is_empty() && tail.iter().all(|t| SOFT_TOKENS.contains(t.as_str()))
}

fn matches_trailing_initialism(short_tokens: &[String], long_tokens: &[String]) -> bool {
    let shared_prefix = short_tokens.iter().zip(long_tokens.iter()).take_while(|(l, r)| l == r).count();
    let short_tail = &short_tokens[shared_prefix..];
    let long_tail = &long_tokens[shared_prefix..];
    if short_tail.len() != 1 || long_tail.len() < 2 {
        return false;
    }
    let short_value = &short_tail[0];
    let initials: String = long_tail.iter().filter_map(|t| t.chars().next()).collect();
    short_value.chars().count() >= 2 && *short_value == initials
}

fn matches_full_initialism(short_tokens: &[String], long_tokens: &[String]) -> bool {
    if short_tokens.len() != 1 || long_tokens.len() < 2 {
        return false;
    }
    let short_value = &short_tokens[0];
    let initials: String = long_tokens
        .iter()
        .filter(|t| !INITIALISM_IGNORED_TOKENS.contains(t.as_str()))
        .filter_map(|t| t.chars().next())
        .collect();
    short_value.chars().count() >= 2 && *short_value == initials
}

fn has_company_hint(words: &[String]) -> bool {
    words.iter().any(|w| COMPANY_HINT_TOKENS.contains(w.as_str()))
}

/// The sentence heuristic half of the non-company predicate (§4.4): fires
/// independently of the Rule Store's exact/pattern lists.
pub fn looks_like_topic_or_sentence(name: &str) -> bool {
    let words: Vec<String> = normalize::word_like_tokens(name);
    let Some(first_word) = words.first() else {
        return false;
    };

    if SENTENCE_START_TOKENS.contains(first_word.as_str()) && words.len() > 4 {
        return true;
    }

    let lowered = words.join(" ");
    if lowered.contains("comments on") || lowered.contains("comment on") {
        return true;
    }

    if words.iter().any(|w| w == "on") && words.len() >= 4 && !has_company_hint(&words) {
        return true;
    }

    if words.iter().any(|w| w == "minister" || w == "secretary") && words.iter().any(|w| w == "on") {
        return true;
    }

    false
}

/// Whether `name` should be quarantined as a non-company label: either
/// the Rule Store's exact/pattern check fires, or the sentence heuristic
/// does.
pub fn is_non_company_label(name: &str, rules: &NonCompanyRules) -> bool {
    rules.matches(name) || looks_like_topic_or_sentence(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn no_pairs() -> HashSet<NamePair> {
        HashSet::new()
    }

    #[test]
    fn legal_suffix_variants_are_compatible() {
        assert!(compatible("Acme Industries Limited", "Acme Industries", &no_pairs(), &no_pairs()));
    }

    #[test]
    fn block_pair_beats_everything() {
        let mut blocks = no_pairs();
        blocks.insert(pair(name_key("Reliance Industries"), name_key("Reliance Consumer Products")));
        assert!(!compatible("Reliance Industries", "Reliance Consumer Products", &no_pairs(), &blocks));
    }

    #[test]
    fn alias_pair_forces_compatibility_even_when_dissimilar() {
        let mut aliases = no_pairs();
        aliases.insert(pair(name_key("SBI"), name_key("State Bank of India")));
        assert!(compatible("SBI", "State Bank of India", &aliases, &no_pairs()));
    }

    #[test]
    fn near_miss_spelling_is_compatible_via_similarity() {
        assert!(compatible("Hindustan Unilever", "Hindustan Unilver", &no_pairs(), &no_pairs()));
    }

    #[test]
    fn prefix_of_three_or_more_tokens_is_compatible() {
        assert!(compatible("Tata Consultancy Services", "Tata Consultancy Services India", &no_pairs(), &no_pairs()));
    }

    #[test]
    fn single_token_soft_extension_is_compatible() {
        assert!(compatible("Tata", "Tata Group", &no_pairs(), &no_pairs()));
    }

    #[test]
    fn single_token_non_soft_extension_is_not_compatible() {
        assert!(!compatible("Tata", "Tata Motors", &no_pairs(), &no_pairs()));
    }

    #[test]
    fn token_subset_is_compatible() {
        assert!(compatible("Acme Global Industries", "Acme Industries", &no_pairs(), &no_pairs()));
    }

    #[test]
    fn full_initialism_is_compatible() {
        assert!(compatible("SBI", "State Bank of India", &no_pairs(), &no_pairs()));
    }

    #[test]
    fn trailing_initialism_is_compatible() {
        assert!(compatible("Tata Consultancy Services", "Tata CS", &no_pairs(), &no_pairs()));
    }

    #[test]
    fn unrelated_names_are_not_compatible() {
        assert!(!compatible("Acme Industries", "Zenith Motors", &no_pairs(), &no_pairs()));
    }

    #[test]
    fn empty_name_is_not_compatible_with_anything() {
        assert!(!compatible("", "Acme Industries", &no_pairs(), &no_pairs()));
    }

    #[test]
    fn sentence_heuristic_flags_first_person_commentary() {
        assert!(looks_like_topic_or_sentence(
            "We expect strong growth in the coming quarters for our retail segment"
        ));
    }

    #[test]
    fn sentence_heuristic_flags_comments_on() {
        assert!(looks_like_topic_or_sentence("Analyst comments on banking sector outlook this week"));
    }

    #[test]
    fn sentence_heuristic_spares_company_hint_phrases() {
        assert!(!looks_like_topic_or_sentence("Acme Bank of Commerce on Retail Growth"));
    }

    #[test]
    fn sentence_heuristic_flags_minister_on() {
        assert!(looks_like_topic_or_sentence("Finance Minister on economic outlook"));
    }

    #[test]
    fn ordinary_company_name_is_not_flagged() {
        assert!(!looks_like_topic_or_sentence("Reliance Industries Limited"));
    }
}
