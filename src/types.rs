//! Data model shared across every pipeline stage (§3).
//!
//! These are plain serde structs; nothing here carries behavior beyond
//! construction helpers. The resolution engine is the only writer of
//! [`CanonicalCompany`], [`Quarantine`] reasons, and the diagnostic
//! records — downstream stages only read them.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An input company record exactly as extracted upstream. `id` is
/// extraction-local and not stable across runs of the upstream extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawCompany {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The post-resolution identity exposed downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalCompany {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_key: Option<String>,
    pub identity_source: IdentitySource,
    pub identity_confidence: IdentityConfidence,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    Single,
    Name,
    MarketKey,
    #[serde(rename = "market_key+name")]
    MarketKeyAndName,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentityConfidence {
    High,
    Medium,
}

/// Reason a raw company was excluded from canonical output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineReason {
    NonCompanyLabel,
    MarketKeyConflictMentionsOnly,
}

/// A quote or mention row. The payload is opaque and round-tripped
/// verbatim except for `company_id`, which is rewritten in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompanyRow {
    pub id: String,
    pub company_id: String,
    pub edition_id: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One member of a resolved component, as recorded in a diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberRef {
    pub id: String,
    pub name: String,
}

/// Per-market-key diagnostic emitted by resolution phase P2 when a market
/// key's group still contains multiple incompatible components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarketConflict {
    pub market_key: String,
    pub components: Vec<MarketConflictComponent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarketConflictComponent {
    pub root: String,
    pub is_primary: bool,
    pub quote_count: u64,
    pub mention_count: u64,
    pub members: Vec<MemberRef>,
}

/// Diagnostic for any resolved component with two or more members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergedGroup {
    pub canonical_id: String,
    pub canonical_name: String,
    pub members: Vec<MemberRef>,
    pub market_keys: Vec<String>,
}

/// Diagnostic for a union performed by phase P4 across two previously
/// separate name buckets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrossBucketMerge {
    pub left_root: String,
    pub right_root: String,
    pub left_anchor: MemberRef,
    pub right_anchor: MemberRef,
    pub left_market_keys: Vec<String>,
    pub right_market_keys: Vec<String>,
}

/// Full output of the resolution engine: canonical companies plus every
/// diagnostic needed to explain how they were formed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolutionOutcome {
    pub canonical_companies: Vec<CanonicalCompany>,
    /// `raw_id -> canonical_id`, total over every non-quarantined raw id.
    pub alias_map: IndexMap<String, String>,
    pub quarantine: BTreeMap<String, QuarantineReason>,
    pub merged_groups: Vec<MergedGroup>,
    pub market_conflicts: Vec<MarketConflict>,
    pub cross_bucket_merges: Vec<CrossBucketMerge>,
}

/// A resolved `(company, story)` mention with how many non-overlapping
/// alias occurrences were found.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoryMention {
    pub company_id: String,
    pub story_id: String,
    pub story_title: String,
    pub story_url: String,
    pub post_title: String,
    pub story_date: String,
    pub story_position: i64,
    pub story_source: String,
    pub mention_count: u32,
}

/// One story inside a [`BriefPost`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Story {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A single daily-brief post; the unit the matcher iterates over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BriefPost {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub stories: Vec<Story>,
}
