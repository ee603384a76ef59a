//! Name Normalizer (§4.1): pure, total functions turning a raw company
//! name into token lists, normalized keys, and acronym-expanded forms.
//! Consulted by every other component in the crate.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Trailing tokens stripped from a name once acronym expansion has run.
pub static LEGAL_SUFFIX_TOKENS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "limited",
        "ltd",
        "inc",
        "corp",
        "corporation",
        "company",
        "co",
        "private",
        "pvt",
        "plc",
    ]
    .into_iter()
    .collect()
});

/// Same as [`LEGAL_SUFFIX_TOKENS`] but without `company`/`co`, used only by
/// the Compatibility Oracle's initialism check (§4.4 step 8) so that a
/// bare "Company" doesn't get stripped before initials are compared.
pub static ACRONYM_SUFFIX_STRIP_TOKENS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| LEGAL_SUFFIX_TOKENS.iter().copied().filter(|t| *t != "company" && *t != "co").collect());

static TOKEN_EQUIVALENTS: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "tech" => "technology",
    "technologies" => "technology",
    "inds" => "industries",
    "hathaway" => "hathway",
    "prod" => "products",
};

static ACRONYM_EXPANSIONS: phf::Map<&'static str, &'static [&'static str]> = phf::phf_map! {
    "amc" => &["asset", "management", "company"],
};

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("static pattern"));

/// Looser tokenizer used only by the sentence heuristic (§4.4's
/// non-company predicate): keeps `&`, `'`, `.`, `-` inside words so that
/// "We've" and "coming." tokenize the way the heuristic's closed word
/// sets expect.
static LOOSE_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9&'.-]+").expect("static pattern"));

pub fn word_like_tokens(name: &str) -> Vec<String> {
    LOOSE_WORD_RE.find_iter(name).map(|m| m.as_str().to_lowercase()).collect()
}

/// Lowercase, split on non-alphanumeric runs, then apply the token
/// equivalence table.
pub fn tokens(name: &str) -> Vec<String> {
    let lowered = name.to_lowercase();
    WORD_RE
        .find_iter(&lowered)
        .map(|m| {
            let word = m.as_str();
            TOKEN_EQUIVALENTS.get(word).map(|s| s.to_string()).unwrap_or_else(|| word.to_string())
        })
        .collect()
}

/// Expand a closed acronym table at the final token position only, then
/// strip a trailing run of legal-suffix tokens.
pub fn normalized_tokens(name: &str) -> Vec<String> {
    let raw = tokens(name);
    let expanded = expand_final_acronym(raw);
    strip_trailing(expanded, &LEGAL_SUFFIX_TOKENS)
}

fn expand_final_acronym(tokens: Vec<String>) -> Vec<String> {
    let Some(last) = tokens.last() else {
        return tokens;
    };
    match ACRONYM_EXPANSIONS.get(last.as_str()) {
        Some(expansion) => {
            let mut out = tokens[..tokens.len() - 1].to_vec();
            out.extend(expansion.iter().map(|s| s.to_string()));
            out
        }
        None => tokens,
    }
}

/// Strip tokens from the back of `tokens` while they belong to `suffixes`.
pub fn strip_trailing(mut tokens: Vec<String>, suffixes: &HashSet<&'static str>) -> Vec<String> {
    while let Some(last) = tokens.last() {
        if suffixes.contains(last.as_str()) {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens
}

/// Space-joined [`normalized_tokens`]; the bucketing key and rule-lookup
/// key used throughout the engine.
pub fn name_key(name: &str) -> String {
    normalized_tokens(name).join(" ")
}

/// Whether the last raw token (before acronym expansion/suffix stripping)
/// is a legal-suffix token.
pub fn has_legal_suffix(name: &str) -> bool {
    tokens(name).last().is_some_and(|t| LEGAL_SUFFIX_TOKENS.contains(t.as_str()))
}

/// Lowercase, collapse runs of non-alphanumeric characters to a single
/// space, trim. Unlike [`tokens`], this does *not* apply the token
/// equivalence table — it's the key the Rule Store's exact-name and
/// allow-name lists are matched against (§4.2), which are meant to match
/// a name's literal surface form rather than its normalized one.
pub fn raw_normalized_key(name: &str) -> String {
    WORD_RE.find_iter(&name.to_lowercase()).map(|m| m.as_str()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_lowercases_and_splits() {
        assert_eq!(tokens("Acme, Inc."), vec!["acme", "inc"]);
    }

    #[test]
    fn tokens_applies_equivalence_table() {
        assert_eq!(tokens("Acme Tech Industries"), vec!["acme", "technology", "industries"]);
        assert_eq!(tokens("Acme Inds"), vec!["acme", "industries"]);
    }

    #[test]
    fn normalized_tokens_strips_legal_suffix() {
        assert_eq!(normalized_tokens("Acme Industries Limited"), vec!["acme", "industries"]);
        assert_eq!(normalized_tokens("Acme Industries"), vec!["acme", "industries"]);
    }

    #[test]
    fn normalized_tokens_expands_trailing_acronym() {
        assert_eq!(normalized_tokens("Birla AMC"), vec!["birla", "asset", "management", "company"]);
    }

    #[test]
    fn normalized_tokens_does_not_expand_non_final_acronym() {
        assert_eq!(normalized_tokens("AMC Industries"), vec!["amc", "industries"]);
    }

    #[test]
    fn name_key_is_space_joined() {
        assert_eq!(name_key("Acme Industries Ltd"), "acme industries");
    }

    #[test]
    fn empty_name_is_total() {
        assert!(tokens("").is_empty());
        assert!(normalized_tokens("").is_empty());
        assert_eq!(name_key(""), "");
        assert!(!has_legal_suffix(""));
    }

    #[test]
    fn has_legal_suffix_checks_raw_last_token() {
        assert!(has_legal_suffix("Acme Industries Limited"));
        assert!(!has_legal_suffix("Acme Industries"));
    }

    #[test]
    fn raw_normalized_key_does_not_apply_equivalence_table() {
        assert_eq!(raw_normalized_key("Acme Tech, Inc."), "acme tech inc");
    }
}
