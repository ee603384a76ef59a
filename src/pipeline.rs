//! Ambient entry point (§10/§11): loads the six input files, drives the
//! core in the order §2's data-flow diagram specifies, and serializes the
//! four output artifacts. Everything above the boundary crossed by
//! [`run`] is pure; everything here is the thin I/O shell around it.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::alias_vocab::{self, AliasRules};
use crate::config::PipelineConfig;
use crate::error::{RadarError, Result};
use crate::market::market_key_from_url;
use crate::mentions;
use crate::report::{self, EntityResolutionReport};
use crate::resolution;
use crate::rewrite;
use crate::rules_store;
use crate::types::{BriefPost, CanonicalCompany, CompanyRow, RawCompany, StoryMention};

/// The full materialized output of one pipeline run, ready for the
/// caller to serialize however it likes (this module also writes it to
/// the configured output files directly, see [`run`]).
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub canonical_companies: Vec<CanonicalCompany>,
    pub quotes: Vec<CompanyRow>,
    pub mentions: Vec<CompanyRow>,
    pub resolution_report: EntityResolutionReport,
    pub story_mentions: Vec<StoryMention>,
}

fn read_required<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|source| RadarError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&raw).map_err(|err| RadarError::InvalidInput { path: path.to_path_buf(), message: err.to_string() })
}

fn read_optional<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let Some(path) = path else { return Ok(T::default()) };
    if !path.exists() {
        return Ok(T::default());
    }
    read_required(path)
}

fn write_output<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| RadarError::Io { path: parent.to_path_buf(), source })?;
        }
    }
    let body = serde_json::to_string_pretty(value)
        .map_err(|err| RadarError::InvalidInput { path: path.to_path_buf(), message: err.to_string() })?;
    fs::write(path, body).map_err(|source| RadarError::Io { path: path.to_path_buf(), source })
}

/// Run the whole deterministic batch transform described in §2's data
/// flow: load inputs, resolve the canonical company graph, rewrite rows,
/// build the alias vocabulary, match story mentions, then write all four
/// output artifacts to the paths named in `config`.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput> {
    log::info!("loading required inputs");
    let companies: Vec<RawCompany> = read_required(&config.companies_file)?;
    let quotes: Vec<CompanyRow> = read_required(&config.quotes_file)?;
    let mentions: Vec<CompanyRow> = read_required(&config.mentions_file)?;
    log::info!(
        "loaded {} companies, {} quotes, {} mentions",
        companies.len(),
        quotes.len(),
        mentions.len()
    );

    let alias_pairs = rules_store::load_alias_pairs(config.entity_alias_rules_file.as_deref());
    let block_pairs = rules_store::load_block_pairs(config.entity_block_rules_file.as_deref());
    let non_company_rules = rules_store::load_non_company_rules(config.non_company_rules_file.as_deref());
    log::info!("loaded {} alias pairs, {} block pairs", alias_pairs.len(), block_pairs.len());

    log::info!("resolving canonical company graph");
    let outcome = resolution::resolve(&companies, &quotes, &mentions, &alias_pairs, &block_pairs, &non_company_rules);
    log::info!(
        "resolved {} raw companies into {} canonical companies ({} quarantined)",
        companies.len(),
        outcome.canonical_companies.len(),
        outcome.quarantine.len()
    );

    let rewritten_quotes = rewrite::rewrite_rows(&quotes, &outcome.alias_map, &outcome.quarantine);
    let rewritten_mentions = rewrite::rewrite_rows(&mentions, &outcome.alias_map, &outcome.quarantine);
    log::info!(
        "rewrote rows: {} quotes ({} dropped), {} mentions ({} dropped)",
        rewritten_quotes.rows.len(),
        rewritten_quotes.dropped,
        rewritten_mentions.rows.len(),
        rewritten_mentions.dropped
    );

    let company_names: HashMap<String, String> = companies.iter().map(|c| (c.id.clone(), c.name.clone())).collect();
    let company_market_keys: HashMap<String, String> = companies
        .iter()
        .filter_map(|c| market_key_from_url(c.url.as_deref()).map(|key| (c.id.clone(), key)))
        .collect();
    let mut quote_counts: HashMap<String, u64> = HashMap::new();
    for row in &quotes {
        *quote_counts.entry(row.company_id.clone()).or_default() += 1;
    }
    let mut mention_counts: HashMap<String, u64> = HashMap::new();
    for row in &mentions {
        *mention_counts.entry(row.company_id.clone()).or_default() += 1;
    }

    let resolution_report = report::build_report(
        &outcome,
        companies.len(),
        quotes.len(),
        rewritten_quotes.rows.len(),
        mentions.len(),
        rewritten_mentions.rows.len(),
        &company_names,
        &company_market_keys,
        &quote_counts,
        &mention_counts,
    );

    log::info!("building alias vocabulary");
    let alias_rules: AliasRules = alias_vocab::load_alias_rules(config.dailybrief_alias_rules_file.as_deref());
    let alias_specs = alias_vocab::build_alias_specs(&outcome.canonical_companies, &outcome.merged_groups, &alias_rules);
    log::info!("built alias specs for {} of {} canonical companies", alias_specs.len(), outcome.canonical_companies.len());

    let posts: Vec<BriefPost> = read_optional(config.dailybrief_posts_file.as_deref())?;
    log::info!("matching {} daily-brief posts against the alias vocabulary", posts.len());
    let story_mentions = mentions::match_story_mentions(&posts, &outcome.canonical_companies, &alias_specs);
    log::info!("emitted {} story mentions", story_mentions.len());

    write_output(&config.entity_resolution_report_file, &resolution_report)?;
    write_output(&config.dailybrief_story_mentions_file, &story_mentions)?;

    Ok(PipelineOutput {
        canonical_companies: outcome.canonical_companies,
        quotes: rewritten_quotes.rows,
        mentions: rewritten_mentions.rows,
        resolution_report,
        story_mentions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).expect("create fixture file");
        file.write_all(contents.as_bytes()).expect("write fixture file");
        path
    }

    #[test]
    fn end_to_end_run_resolves_merges_and_writes_outputs() {
        let dir = tempdir().expect("tempdir");
        let companies_path = write_file(
            dir.path(),
            "companies.json",
            r#"[
                {"id": "a", "name": "Acme Industries Limited"},
                {"id": "b", "name": "Acme Industries"}
            ]"#,
        );
        let quotes_path = write_file(dir.path(), "quotes.json", "[]");
        let mentions_path = write_file(dir.path(), "mentions.json", "[]");

        let config = PipelineConfig {
            companies_file: companies_path,
            quotes_file: quotes_path,
            mentions_file: mentions_path,
            entity_alias_rules_file: None,
            entity_block_rules_file: None,
            non_company_rules_file: None,
            dailybrief_alias_rules_file: None,
            dailybrief_posts_file: None,
            entity_resolution_report_file: dir.path().join("out/report.json"),
            dailybrief_story_mentions_file: dir.path().join("out/mentions.json"),
        };

        let output = run(&config).expect("pipeline run succeeds");
        assert_eq!(output.canonical_companies.len(), 1);
        assert_eq!(output.canonical_companies[0].name, "Acme Industries");
        assert!(output.resolution_report.merged_groups.len() == 1);
        assert!(dir.path().join("out/report.json").exists());
        assert!(dir.path().join("out/mentions.json").exists());
    }

    #[test]
    fn missing_required_file_is_a_hard_error() {
        let dir = tempdir().expect("tempdir");
        let config = PipelineConfig {
            companies_file: dir.path().join("missing.json"),
            quotes_file: write_file(dir.path(), "quotes.json", "[]"),
            mentions_file: write_file(dir.path(), "mentions.json", "[]"),
            entity_alias_rules_file: None,
            entity_block_rules_file: None,
            non_company_rules_file: None,
            dailybrief_alias_rules_file: None,
            dailybrief_posts_file: None,
            entity_resolution_report_file: dir.path().join("out/report.json"),
            dailybrief_story_mentions_file: dir.path().join("out/mentions.json"),
        };
        assert!(matches!(run(&config), Err(RadarError::Io { .. })));
    }

    #[test]
    fn malformed_required_file_is_an_invalid_input_error() {
        let dir = tempdir().expect("tempdir");
        let config = PipelineConfig {
            companies_file: write_file(dir.path(), "companies.json", "not json"),
            quotes_file: write_file(dir.path(), "quotes.json", "[]"),
            mentions_file: write_file(dir.path(), "mentions.json", "[]"),
            entity_alias_rules_file: None,
            entity_block_rules_file: None,
            non_company_rules_file: None,
            dailybrief_alias_rules_file: None,
            dailybrief_posts_file: None,
            entity_resolution_report_file: dir.path().join("out/report.json"),
            dailybrief_story_mentions_file: dir.path().join("out/mentions.json"),
        };
        assert!(matches!(run(&config), Err(RadarError::InvalidInput { .. })));
    }

    #[test]
    fn absent_optional_posts_file_yields_zero_story_mentions() {
        let dir = tempdir().expect("tempdir");
        let config = PipelineConfig {
            companies_file: write_file(dir.path(), "companies.json", r#"[{"id": "a", "name": "Acme Industries"}]"#),
            quotes_file: write_file(dir.path(), "quotes.json", "[]"),
            mentions_file: write_file(dir.path(), "mentions.json", "[]"),
            entity_alias_rules_file: None,
            entity_block_rules_file: None,
            non_company_rules_file: None,
            dailybrief_alias_rules_file: None,
            dailybrief_posts_file: Some(dir.path().join("posts.json")),
            entity_resolution_report_file: dir.path().join("out/report.json"),
            dailybrief_story_mentions_file: dir.path().join("out/mentions.json"),
        };
        let output = run(&config).expect("pipeline run succeeds");
        assert!(output.story_mentions.is_empty());
    }
}
