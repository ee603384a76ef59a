//! Report Emitter (§4.9): serializes resolution metrics and diagnostics
//! into the `entity_resolution_report` output shape (§6).

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CrossBucketMerge, MarketConflict, MergedGroup, QuarantineReason, ResolutionOutcome};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportCounts {
    pub input_companies: usize,
    pub canonical_companies: usize,
    pub quarantined_companies: usize,
    pub merged_groups: usize,
    pub market_conflicts: usize,
    pub cross_bucket_merges: usize,
    pub input_quotes: usize,
    pub output_quotes: usize,
    pub dropped_quotes: usize,
    pub input_mentions: usize,
    pub output_mentions: usize,
    pub dropped_mentions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuarantinedCompany {
    pub id: String,
    pub name: String,
    pub reason: QuarantineReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_key: Option<String>,
    pub quote_count: u64,
    pub mention_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityResolutionReport {
    pub generated_at: String,
    pub counts: ReportCounts,
    pub quarantined_companies: Vec<QuarantinedCompany>,
    pub merged_groups: Vec<MergedGroup>,
    pub market_conflicts: Vec<MarketConflict>,
    pub cross_bucket_merges: Vec<CrossBucketMerge>,
}

/// Assemble the resolution report from the engine's outcome and the
/// row-rewrite counters. `quote_counts`/`mention_counts` key by raw
/// company id, used to annotate quarantined companies with the volume
/// of rows dropped on their behalf.
pub fn build_report(
    outcome: &ResolutionOutcome,
    input_companies: usize,
    input_quotes: usize,
    output_quotes: usize,
    input_mentions: usize,
    output_mentions: usize,
    company_names: &std::collections::HashMap<String, String>,
    company_market_keys: &std::collections::HashMap<String, String>,
    quote_counts: &std::collections::HashMap<String, u64>,
    mention_counts: &std::collections::HashMap<String, u64>,
) -> EntityResolutionReport {
    let mut quarantined_companies: Vec<QuarantinedCompany> = outcome
        .quarantine
        .iter()
        .map(|(id, reason)| QuarantinedCompany {
            id: id.clone(),
            name: company_names.get(id).cloned().unwrap_or_default(),
            reason: *reason,
            market_key: company_market_keys.get(id).cloned(),
            quote_count: quote_counts.get(id).copied().unwrap_or(0),
            mention_count: mention_counts.get(id).copied().unwrap_or(0),
        })
        .collect();
    quarantined_companies.sort_by(|a, b| a.id.cmp(&b.id));

    let counts = ReportCounts {
        input_companies,
        canonical_companies: outcome.canonical_companies.len(),
        quarantined_companies: outcome.quarantine.len(),
        merged_groups: outcome.merged_groups.len(),
        market_conflicts: outcome.market_conflicts.len(),
        cross_bucket_merges: outcome.cross_bucket_merges.len(),
        input_quotes,
        output_quotes,
        dropped_quotes: input_quotes.saturating_sub(output_quotes),
        input_mentions,
        output_mentions,
        dropped_mentions: input_mentions.saturating_sub(output_mentions),
    };

    EntityResolutionReport {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        counts,
        quarantined_companies,
        merged_groups: outcome.merged_groups.clone(),
        market_conflicts: outcome.market_conflicts.clone(),
        cross_bucket_merges: outcome.cross_bucket_merges.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn counts_reflect_dropped_rows_and_quarantine_size() {
        let outcome = ResolutionOutcome {
            canonical_companies: vec![],
            alias_map: IndexMap::new(),
            quarantine: BTreeMap::from([("a".to_string(), QuarantineReason::NonCompanyLabel)]),
            merged_groups: vec![],
            market_conflicts: vec![],
            cross_bucket_merges: vec![],
        };
        let report = build_report(&outcome, 3, 10, 8, 5, 4, &HashMap::new(), &HashMap::new(), &HashMap::new(), &HashMap::new());
        assert_eq!(report.counts.input_companies, 3);
        assert_eq!(report.counts.quarantined_companies, 1);
        assert_eq!(report.counts.dropped_quotes, 2);
        assert_eq!(report.counts.dropped_mentions, 1);
    }
}
