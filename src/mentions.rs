//! Story Mention Matcher (§4.8): scans each brief story's normalized
//! text once per canonical company using that company's longest-first
//! alias patterns, and emits one deduplicated `(company, story)` row.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::alias_vocab::{AliasSpec, normalize_alias_phrase};
use crate::types::{BriefPost, CanonicalCompany, StoryMention};

static NON_SLUG_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static pattern"));

/// Lowercase, collapse non-alphanumeric runs to a single `-`, trim
/// leading/trailing `-`; `"unknown"` if nothing alphanumeric survives.
fn slugify(value: &str) -> String {
    let lowered = value.to_lowercase();
    let slug = NON_SLUG_RUN.replace_all(lowered.trim(), "-").trim_matches('-').to_string();
    if slug.is_empty() { "unknown".to_string() } else { slug }
}

/// The title shown for a story: its own title if non-empty, else the
/// post's title, else a fixed placeholder.
fn resolve_story_title(story_title: &str, post_title: &str) -> String {
    let trimmed = story_title.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    let post_trimmed = post_title.trim();
    if !post_trimmed.is_empty() {
        return post_trimmed.to_string();
    }
    "Daily Brief story".to_string()
}

/// Match every [`BriefPost`]'s stories against `alias_specs`, in the
/// deterministic order §4.8 specifies: posts/stories in input order,
/// companies in canonical-list order, aliases longest-first.
pub fn match_story_mentions(
    posts: &[BriefPost],
    companies: &[CanonicalCompany],
    alias_specs: &BTreeMap<String, Vec<AliasSpec>>,
) -> Vec<StoryMention> {
    let mut mentions = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for post in posts {
        if post.url.trim().is_empty() {
            continue;
        }
        for story in &post.stories {
            let normalized_text = normalize_alias_phrase(&story.text);
            if normalized_text.is_empty() {
                continue;
            }
            let story_title = resolve_story_title(&story.title, &post.title);
            let story_id = story
                .story_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| slugify(&format!("{}-{}-{}", post.url, story.position, story_title)));
            let tokens: HashSet<&str> = normalized_text.split_whitespace().collect();

            for company in companies {
                let Some(specs) = alias_specs.get(&company.id) else { continue };
                if !specs.iter().any(|spec| tokens.contains(spec.first_token.as_str())) {
                    continue;
                }

                let mut occupied: Vec<(usize, usize)> = Vec::new();
                let mut count = 0u32;
                for spec in specs {
                    for m in spec.pattern.find_iter(&normalized_text).flatten() {
                        let (start, end) = (m.start(), m.end());
                        if occupied.iter().any(|&(o_start, o_end)| start < o_end && o_start < end) {
                            continue;
                        }
                        occupied.push((start, end));
                        count += 1;
                    }
                }

                if count > 0 {
                    let key = (company.id.clone(), story_id.clone());
                    if seen.insert(key) {
                        mentions.push(StoryMention {
                            company_id: company.id.clone(),
                            story_id: story_id.clone(),
                            story_title: story_title.clone(),
                            story_url: story.url.clone().unwrap_or_default(),
                            post_title: post.title.clone(),
                            story_date: post.date.clone(),
                            story_position: story.position,
                            story_source: story.source.clone(),
                            mention_count: count,
                        });
                    }
                }
            }
        }
    }

    mentions
}

/// Group `mentions` by company, each group ordered by `mention_count`
/// descending, then `story_date` descending, then `story_title`
/// ascending (case-insensitive) — the presentation order §4.8
/// specifies for downstream consumption.
pub fn group_by_company(mentions: &[StoryMention]) -> BTreeMap<String, Vec<StoryMention>> {
    let mut grouped: BTreeMap<String, Vec<StoryMention>> = BTreeMap::new();
    for mention in mentions {
        grouped.entry(mention.company_id.clone()).or_default().push(mention.clone());
    }
    for group in grouped.values_mut() {
        group.sort_by(|a, b| {
            b.mention_count
                .cmp(&a.mention_count)
                .then_with(|| b.story_date.cmp(&a.story_date))
                .then_with(|| a.story_title.to_lowercase().cmp(&b.story_title.to_lowercase()))
        });
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias_vocab::{AliasRules, build_alias_specs};
    use crate::types::{IdentityConfidence, IdentitySource, Story};

    fn company(id: &str, name: &str) -> CanonicalCompany {
        CanonicalCompany {
            id: id.to_string(),
            name: name.to_string(),
            url: None,
            market_key: None,
            identity_source: IdentitySource::Single,
            identity_confidence: IdentityConfidence::Medium,
        }
    }

    fn post(url: &str, title: &str, date: &str, stories: Vec<Story>) -> BriefPost {
        BriefPost { url: url.to_string(), title: title.to_string(), date: date.to_string(), stories }
    }

    fn story(text: &str) -> Story {
        Story {
            story_id: Some("s1".to_string()),
            title: "Morning Brief".to_string(),
            position: 1,
            source: "brief".to_string(),
            text: text.to_string(),
            url: None,
        }
    }

    fn story_without_id_or_title(text: &str) -> Story {
        Story { story_id: None, title: String::new(), position: 2, source: "brief".to_string(), text: text.to_string(), url: None }
    }

    #[test]
    fn slugify_collapses_punctuation_and_lowercases() {
        assert_eq!(slugify("https://x/Brief 2026-01-01!"), "https-x-brief-2026-01-01");
    }

    #[test]
    fn slugify_of_nothing_alphanumeric_is_unknown() {
        assert_eq!(slugify("---"), "unknown");
    }

    #[test]
    fn resolve_story_title_prefers_its_own_title() {
        assert_eq!(resolve_story_title(" Banking roundup ", "Morning Brief"), "Banking roundup");
    }

    #[test]
    fn resolve_story_title_falls_back_to_post_title_then_placeholder() {
        assert_eq!(resolve_story_title("", "Morning Brief"), "Morning Brief");
        assert_eq!(resolve_story_title("", ""), "Daily Brief story");
    }

    #[test]
    fn missing_story_id_and_title_fall_back_to_a_slug_built_from_the_resolved_title() {
        let companies = [company("a", "Acme Industries")];
        let specs = build_alias_specs(&companies, &[], &AliasRules::default());
        let posts =
            [post("https://x/1", "Morning Brief", "2026-01-01", vec![story_without_id_or_title("Acme Industries posts record quarter")])];
        let mentions = match_story_mentions(&posts, &companies, &specs);
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].story_title, "Morning Brief");
        assert_eq!(mentions[0].story_id, slugify("https://x/1-2-Morning Brief"));
    }

    #[test]
    fn repeated_mention_in_one_story_counts_each_occurrence_once() {
        let companies = [company("a", "HDFC Bank")];
        let specs = build_alias_specs(&companies, &[], &AliasRules::default());
        let posts = [post("https://x/1", "Brief", "2026-01-01", vec![story("HDFC Bank and HDFC Bank reported strong results")])];
        let mentions = match_story_mentions(&posts, &companies, &specs);
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].mention_count, 2);
    }

    #[test]
    fn dedupes_to_one_row_per_company_and_story() {
        let companies = [company("a", "Acme Industries")];
        let specs = build_alias_specs(&companies, &[], &AliasRules::default());
        let posts = [post("https://x/1", "Brief", "2026-01-01", vec![story("Acme Industries posts record quarter for Acme Industries shareholders")])];
        let mentions = match_story_mentions(&posts, &companies, &specs);
        assert_eq!(mentions.len(), 1);
    }

    #[test]
    fn no_alias_match_emits_nothing() {
        let companies = [company("a", "Acme Industries")];
        let specs = build_alias_specs(&companies, &[], &AliasRules::default());
        let posts = [post("https://x/1", "Brief", "2026-01-01", vec![story("Zenith Motors rallies on strong delivery numbers")])];
        let mentions = match_story_mentions(&posts, &companies, &specs);
        assert!(mentions.is_empty());
    }

    #[test]
    fn substring_without_word_boundary_does_not_match() {
        let companies = [company("a", "Tata")];
        let specs = build_alias_specs(&companies, &[], &AliasRules::default());
        let posts = [post("https://x/1", "Brief", "2026-01-01", vec![story("Tatarstan energy output rose")])];
        let mentions = match_story_mentions(&posts, &companies, &specs);
        assert!(mentions.is_empty());
    }

    #[test]
    fn empty_post_url_skips_the_whole_post() {
        let companies = [company("a", "Acme Industries")];
        let specs = build_alias_specs(&companies, &[], &AliasRules::default());
        let posts = [post("", "Brief", "2026-01-01", vec![story("Acme Industries posts record quarter")])];
        let mentions = match_story_mentions(&posts, &companies, &specs);
        assert!(mentions.is_empty());
    }

    #[test]
    fn group_by_company_orders_by_count_then_date_then_title() {
        let mentions = vec![
            StoryMention {
                company_id: "a".to_string(),
                story_id: "s1".to_string(),
                story_title: "Zebra Story".to_string(),
                story_url: String::new(),
                post_title: String::new(),
                story_date: "2026-01-01".to_string(),
                story_position: 1,
                story_source: "brief".to_string(),
                mention_count: 1,
            },
            StoryMention {
                company_id: "a".to_string(),
                story_id: "s2".to_string(),
                story_title: "Alpha Story".to_string(),
                story_url: String::new(),
                post_title: String::new(),
                story_date: "2026-01-02".to_string(),
                story_position: 1,
                story_source: "brief".to_string(),
                mention_count: 3,
            },
        ];
        let grouped = group_by_company(&mentions);
        assert_eq!(grouped["a"][0].story_id, "s2");
        assert_eq!(grouped["a"][1].story_id, "s1");
    }
}
