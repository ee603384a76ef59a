//! Resolution Engine (§4.5): the core algorithm. Drives a [`UnionFind`]
//! over raw company ids through six ordered phases, then canonicalizes
//! each surviving component into a [`CanonicalCompany`].
//!
//! Every phase is a free function taking and mutating an [`EngineState`]
//! so the ordering contract in §4.5 reads top to bottom in [`resolve`].

mod union_find;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::compatibility::{compatible, is_non_company_label};
use crate::market::market_key_from_url;
use crate::normalize::{has_legal_suffix, name_key, normalized_tokens};
use crate::rules_store::{NamePair, NonCompanyRules, pair};
use crate::types::{
    CanonicalCompany, CompanyRow, CrossBucketMerge, IdentityConfidence, IdentitySource, MarketConflict,
    MarketConflictComponent, MemberRef, MergedGroup, QuarantineReason, RawCompany, ResolutionOutcome,
};
use union_find::UnionFind;

/// Mutable per-raw-id bookkeeping the engine threads through its phases.
/// `url`/`market_key` are cleared in place by P2 when a non-primary
/// market-key component survives without its market identity.
#[derive(Debug, Clone)]
struct RawState {
    name: String,
    url: Option<String>,
    market_key: Option<String>,
    quote_count: u64,
    mention_count: u64,
}

struct EngineState {
    order: Vec<String>,
    states: HashMap<String, RawState>,
    quarantine: BTreeMap<String, QuarantineReason>,
    uf: UnionFind,
    alias_pairs: HashSet<NamePair>,
    block_pairs: HashSet<NamePair>,
    market_conflicts: Vec<MarketConflict>,
    cross_bucket_merges: Vec<CrossBucketMerge>,
}

impl EngineState {
    fn is_quarantined(&self, id: &str) -> bool {
        self.quarantine.contains_key(id)
    }

    fn rule_key_pair(&self, left: &str, right: &str) -> NamePair {
        pair(name_key(&self.states[left].name), name_key(&self.states[right].name))
    }
}

/// Run the full resolution pipeline over `companies`, using `quotes`/
/// `mentions` only for their per-company row counts. Never fails: every
/// input id ends in either the outcome's `alias_map` or `quarantine`.
pub fn resolve(
    companies: &[RawCompany],
    quotes: &[CompanyRow],
    mentions: &[CompanyRow],
    alias_pairs: &BTreeSet<NamePair>,
    block_pairs: &BTreeSet<NamePair>,
    non_company_rules: &NonCompanyRules,
) -> ResolutionOutcome {
    let mut quote_counts: HashMap<&str, u64> = HashMap::new();
    for row in quotes {
        *quote_counts.entry(row.company_id.as_str()).or_default() += 1;
    }
    let mut mention_counts: HashMap<&str, u64> = HashMap::new();
    for row in mentions {
        *mention_counts.entry(row.company_id.as_str()).or_default() += 1;
    }

    let order: Vec<String> = companies.iter().map(|c| c.id.clone()).collect();
    let states: HashMap<String, RawState> = companies
        .iter()
        .map(|c| {
            let market_key = market_key_from_url(c.url.as_deref());
            let state = RawState {
                name: c.name.clone(),
                url: c.url.clone(),
                market_key,
                quote_count: quote_counts.get(c.id.as_str()).copied().unwrap_or(0),
                mention_count: mention_counts.get(c.id.as_str()).copied().unwrap_or(0),
            };
            (c.id.clone(), state)
        })
        .collect();

    let mut engine = EngineState {
        uf: UnionFind::new(order.iter().map(String::as_str)),
        order,
        states,
        quarantine: BTreeMap::new(),
        alias_pairs: alias_pairs.iter().cloned().collect(),
        block_pairs: block_pairs.iter().cloned().collect(),
        market_conflicts: Vec::new(),
        cross_bucket_merges: Vec::new(),
    };

    p0_quarantine_non_company_labels(&mut engine, non_company_rules);
    p1_alias_rule_pass(&mut engine);
    p2_market_key_first_pass(&mut engine);
    p3_name_bucket_pass(&mut engine);
    p4_cross_bucket_anchor_pass(&mut engine);
    let final_components = p5_pairwise_refinement(&mut engine);
    p6_canonicalize(&engine, final_components)
}

/// P0. Quarantine raw companies whose name is a non-company label.
/// Empty/whitespace-only names are left alone — they are not labels,
/// just uninformative, and fall through to the empty-bucket path in P3.
fn p0_quarantine_non_company_labels(engine: &mut EngineState, non_company_rules: &NonCompanyRules) {
    for id in engine.order.clone() {
        let name = engine.states[&id].name.clone();
        if name.trim().is_empty() {
            continue;
        }
        if is_non_company_label(&name, non_company_rules) {
            log::debug!("quarantining {id:?} ({name:?}) as a non-company label");
            engine.quarantine.insert(id, QuarantineReason::NonCompanyLabel);
        }
    }
}

/// P1. Union every raw id keyed `k_l` against every raw id keyed `k_r`
/// for each alias pair. Curator-authoritative: quarantine status and
/// block pairs are not consulted here.
fn p1_alias_rule_pass(engine: &mut EngineState) {
    let mut by_key: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in &engine.order {
        by_key.entry(name_key(&engine.states[id].name)).or_default().push(id.clone());
    }

    let alias_pairs: Vec<NamePair> = engine.alias_pairs.iter().cloned().collect();
    let mut sorted_pairs = alias_pairs;
    sorted_pairs.sort();
    for (left_key, right_key) in sorted_pairs {
        let Some(left_ids) = by_key.get(&left_key).cloned() else { continue };
        let Some(right_ids) = by_key.get(&right_key).cloned() else { continue };
        for left_id in &left_ids {
            for right_id in &right_ids {
                if left_id != right_id {
                    engine.uf.union(left_id, right_id);
                }
            }
        }
    }
}

/// P2. Union raw ids sharing a market key when compatible, then resolve
/// any market key whose group still spans multiple components: the
/// highest-scoring component keeps the market identity, a zero-quote
/// loser is quarantined, a loser with quotes survives but loses its URL
/// and market key.
fn p2_market_key_first_pass(engine: &mut EngineState) {
    let mut by_market_key: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in &engine.order {
        if let Some(key) = engine.states[id].market_key.clone() {
            by_market_key.entry(key).or_default().push(id.clone());
        }
    }

    for (market_key, group) in &by_market_key {
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                let (left, right) = (&group[i], &group[j]);
                let left_name = engine.states[left].name.clone();
                let right_name = engine.states[right].name.clone();
                if compatible(&left_name, &right_name, &engine.alias_pairs, &engine.block_pairs) {
                    engine.uf.union(left, right);
                }
            }
        }

        // Order-preserving: `group` is already in original company-input
        // order, so the first occurrence of each root here is also that
        // root's first occurrence in input order — the order the
        // first-wins tie-break below needs to agree with Python's `max()`.
        let mut root_order: Vec<String> = Vec::new();
        let mut by_root: HashMap<String, Vec<String>> = HashMap::new();
        for id in group {
            let root = engine.uf.find(id);
            if !by_root.contains_key(&root) {
                root_order.push(root.clone());
            }
            by_root.entry(root).or_default().push(id.clone());
        }
        if root_order.len() < 2 {
            continue;
        }

        let mut components: Vec<MarketConflictComponent> = Vec::new();
        let mut scores: Vec<(i64, String)> = Vec::new();
        for root in &root_order {
            let members = &by_root[root];
            let quote_score: u64 = members.iter().map(|m| engine.states[m].quote_count).sum();
            let mention_score: u64 = members.iter().map(|m| engine.states[m].mention_count).sum();
            let score = quote_score as i64 * 10 + mention_score as i64 * 3;
            scores.push((score, root.clone()));
            components.push(MarketConflictComponent {
                root: root.clone(),
                is_primary: false,
                quote_count: quote_score,
                mention_count: mention_score,
                members: sorted_member_refs(engine, members),
            });
        }

        let primary_root = first_max_by_key(scores.iter(), |(score, root)| (*score, by_root[root].len()))
            .map(|(_, root)| root.clone())
            .expect("non-empty root_order");

        for component in &mut components {
            component.is_primary = component.root == primary_root;
        }

        for root in &root_order {
            if *root == primary_root {
                continue;
            }
            let members = &by_root[root];
            let quote_sum: u64 = members.iter().map(|m| engine.states[m].quote_count).sum();
            if quote_sum == 0 {
                for member in members {
                    log::debug!("quarantining {member:?}: loses market key conflict for {market_key} with zero quotes");
                    engine
                        .quarantine
                        .insert(member.clone(), QuarantineReason::MarketKeyConflictMentionsOnly);
                }
            } else {
                for member in members {
                    log::debug!("detaching market identity from {member:?}: loses market key conflict for {market_key}");
                    let state = engine.states.get_mut(member).expect("known id");
                    state.url = None;
                    state.market_key = None;
                }
            }
        }

        log::info!("market conflict on {market_key}: {} components, primary {primary_root}", components.len());
        engine.market_conflicts.push(MarketConflict {
            market_key: market_key.clone(),
            components,
        });
    }
}

fn sorted_member_refs(engine: &EngineState, ids: &[String]) -> Vec<MemberRef> {
    let mut refs: Vec<MemberRef> =
        ids.iter().map(|id| MemberRef { id: id.clone(), name: engine.states[id].name.clone() }).collect();
    refs.sort_by(|a, b| a.id.cmp(&b.id));
    refs
}

/// P3. Union within normalized-name buckets, guarded against reopening
/// a market-key conflict P2 already resolved.
fn p3_name_bucket_pass(engine: &mut EngineState) {
    let mut buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in &engine.order {
        if engine.is_quarantined(id) {
            continue;
        }
        let key = name_key(&engine.states[id].name);
        let bucket_key = if key.is_empty() { id.clone() } else { key };
        buckets.entry(bucket_key).or_default().push(id.clone());
    }

    for members in buckets.values() {
        if members.len() < 2 {
            continue;
        }
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                let (left, right) = (&members[i], &members[j]);
                if engine.is_quarantined(left) || engine.is_quarantined(right) {
                    continue;
                }
                if engine.block_pairs.contains(&engine.rule_key_pair(left, right)) {
                    continue;
                }
                let left_key = engine.states[left].market_key.clone();
                let right_key = engine.states[right].market_key.clone();
                let market_ok = match (&left_key, &right_key) {
                    (None, _) | (_, None) => true,
                    (Some(l), Some(r)) => l == r,
                };
                if !market_ok && !engine.alias_pairs.contains(&engine.rule_key_pair(left, right)) {
                    continue;
                }
                let left_name = engine.states[left].name.clone();
                let right_name = engine.states[right].name.clone();
                if compatible(&left_name, &right_name, &engine.alias_pairs, &engine.block_pairs) {
                    engine.uf.union(left, right);
                }
            }
        }
    }
}

/// Like `Iterator::max_by_key`, but keeps the first element achieving the
/// maximum key on a tie. Rust's `max_by_key` keeps the last; Python's
/// `max()` — which every ranking tie-break in this module is ported
/// from — keeps the first, so every `max`-style selection in this module
/// goes through here instead of `.max_by_key()` directly.
fn first_max_by_key<T, K: Ord>(items: impl IntoIterator<Item = T>, key: impl Fn(&T) -> K) -> Option<T> {
    let mut iter = items.into_iter();
    let mut best = iter.next()?;
    let mut best_key = key(&best);
    for item in iter {
        let item_key = key(&item);
        if item_key > best_key {
            best_key = item_key;
            best = item;
        }
    }
    Some(best)
}

/// Sort key for anchor selection (P4) and pairwise-refinement ordering
/// (P5): both rank by the same tuple, P4 maximizing it, P5 sorting
/// descending by it.
fn ranking_key(engine: &EngineState, id: &str) -> (u64, u64, bool, String) {
    let state = &engine.states[id];
    (state.quote_count, state.mention_count, state.market_key.is_some(), state.name.to_lowercase())
}

fn non_quarantined_components(engine: &EngineState) -> Vec<(String, Vec<String>)> {
    let mut seen_roots: Vec<String> = Vec::new();
    let mut by_root: HashMap<String, Vec<String>> = HashMap::new();
    for id in &engine.order {
        if engine.is_quarantined(id) {
            continue;
        }
        let root = engine.uf.find(id);
        if !by_root.contains_key(&root) {
            seen_roots.push(root.clone());
        }
        by_root.entry(root).or_default().push(id.clone());
    }
    seen_roots.into_iter().map(|root| {
        let members = by_root.remove(&root).expect("root was just recorded");
        (root, members)
    }).collect()
}

fn market_key_set(engine: &EngineState, ids: &[String]) -> BTreeSet<String> {
    ids.iter().filter_map(|id| engine.states[id].market_key.clone()).collect()
}

/// P4. Union component anchors across previously separate name buckets
/// when their market-key footprints don't conflict and they're
/// lexically compatible.
fn p4_cross_bucket_anchor_pass(engine: &mut EngineState) {
    let components = non_quarantined_components(engine);
    let mut anchors: Vec<(String, String, BTreeSet<String>)> = Vec::new();
    for (_, members) in &components {
        let anchor = first_max_by_key(members.iter(), |id| ranking_key(engine, id.as_str()))
            .cloned()
            .expect("non-empty component");
        anchors.push((anchor, members[0].clone(), market_key_set(engine, members)));
    }

    for i in 0..anchors.len() {
        for j in (i + 1)..anchors.len() {
            let (anchor_l, _, keys_l) = anchors[i].clone();
            let (anchor_r, _, keys_r) = anchors[j].clone();
            if engine.uf.find(&anchor_l) == engine.uf.find(&anchor_r) {
                continue;
            }
            if engine.block_pairs.contains(&engine.rule_key_pair(&anchor_l, &anchor_r)) {
                continue;
            }
            if !keys_l.is_empty() && !keys_r.is_empty() && keys_l != keys_r {
                continue;
            }
            let name_l = engine.states[&anchor_l].name.clone();
            let name_r = engine.states[&anchor_r].name.clone();
            if !compatible(&name_l, &name_r, &engine.alias_pairs, &engine.block_pairs) {
                continue;
            }

            log::debug!("cross-bucket merge: {anchor_l:?} ({name_l:?}) <-> {anchor_r:?} ({name_r:?})");
            let left_root = engine.uf.find(&anchor_l);
            let right_root = engine.uf.find(&anchor_r);
            engine.uf.union(&anchor_l, &anchor_r);
            engine.cross_bucket_merges.push(CrossBucketMerge {
                left_root,
                right_root,
                left_anchor: MemberRef { id: anchor_l.clone(), name: name_l },
                right_anchor: MemberRef { id: anchor_r.clone(), name: name_r },
                left_market_keys: keys_l.into_iter().collect(),
                right_market_keys: keys_r.into_iter().collect(),
            });
        }
    }
}

struct FinalComponent {
    id: String,
    members: Vec<String>,
}

/// P5. Split each component into pairwise-compatible clusters so weak
/// transitive chains don't drag unrelated members together. A
/// single-cluster component keeps its root id; later clusters are
/// numbered `root#1, root#2, ...` in creation order.
fn p5_pairwise_refinement(engine: &mut EngineState) -> Vec<FinalComponent> {
    let components = non_quarantined_components(engine);
    let mut out = Vec::new();

    for (root, mut members) in components {
        // A plain ascending sort followed by `.reverse()` would flip the
        // relative order of tied elements; the original's
        // `sorted(..., reverse=True)` is stable and keeps ties in their
        // original order, so sort descending directly via a flipped
        // comparator instead.
        members.sort_by(|a, b| ranking_key(engine, b).cmp(&ranking_key(engine, a)));

        let mut clusters: Vec<Vec<String>> = Vec::new();
        for id in &members {
            let name = engine.states[id].name.clone();
            let home = clusters.iter_mut().find(|cluster| {
                cluster.iter().all(|other| {
                    let other_name = engine.states[other].name.clone();
                    compatible(&name, &other_name, &engine.alias_pairs, &engine.block_pairs)
                })
            });
            match home {
                Some(cluster) => cluster.push(id.clone()),
                None => clusters.push(vec![id.clone()]),
            }
        }

        if clusters.len() <= 1 {
            out.push(FinalComponent { id: root, members });
        } else {
            for (index, cluster_members) in clusters.into_iter().enumerate() {
                let id = if index == 0 { root.clone() } else { format!("{root}#{index}") };
                out.push(FinalComponent { id, members: cluster_members });
            }
        }
    }

    out
}

/// P6. Turn each final component into a [`CanonicalCompany`] plus
/// diagnostics, and assemble the full [`ResolutionOutcome`].
fn p6_canonicalize(engine: &EngineState, final_components: Vec<FinalComponent>) -> ResolutionOutcome {
    let mut canonical_companies = Vec::new();
    let mut alias_map = indexmap::IndexMap::new();
    let mut merged_groups = Vec::new();

    for component in &final_components {
        let primary = first_max_by_key(component.members.iter(), |id| {
            let state = &engine.states[id.as_str()];
            (
                state.market_key.is_some(),
                state.url.is_some(),
                state.quote_count,
                state.mention_count,
                !has_legal_suffix(&state.name),
                -(state.name.len() as i64),
            )
        })
        .expect("non-empty component");

        let display_name = component
            .members
            .iter()
            .map(|id| engine.states[id].name.clone())
            .min_by_key(|name| (has_legal_suffix(name), normalized_tokens(name).len(), name.len(), name.to_lowercase()))
            .expect("non-empty component");

        let canonical_url = component.members.iter().find_map(|id| {
            let url = engine.states[id].url.clone()?;
            market_key_from_url(Some(&url)).map(|_| url)
        });
        let market_key = canonical_url.as_deref().and_then(market_key_from_url);

        let distinct_market_keys: BTreeSet<String> = market_key_set(engine, &component.members);
        let (identity_source, identity_confidence) = if component.members.len() == 1 {
            if canonical_url.is_some() {
                (IdentitySource::MarketKey, IdentityConfidence::High)
            } else {
                (IdentitySource::Single, IdentityConfidence::Medium)
            }
        } else if distinct_market_keys.is_empty() {
            (IdentitySource::Name, IdentityConfidence::Medium)
        } else if distinct_market_keys.len() == 1 {
            (IdentitySource::MarketKeyAndName, IdentityConfidence::High)
        } else {
            (IdentitySource::MarketKeyAndName, IdentityConfidence::Medium)
        };

        for id in &component.members {
            alias_map.insert(id.clone(), primary.clone());
        }

        if component.members.len() >= 2 {
            let mut member_refs = sorted_member_refs(engine, &component.members);
            member_refs.sort_by(|a, b| a.id.cmp(&b.id));
            merged_groups.push(MergedGroup {
                canonical_id: primary.clone(),
                canonical_name: display_name.clone(),
                members: member_refs,
                market_keys: distinct_market_keys.iter().cloned().collect(),
            });
        }

        canonical_companies.push(CanonicalCompany {
            id: primary.clone(),
            name: display_name,
            url: canonical_url,
            market_key,
            identity_source,
            identity_confidence,
        });
    }

    canonical_companies.sort_by(|a, b| a.id.cmp(&b.id));
    merged_groups.sort_by(|a, b| a.canonical_id.cmp(&b.canonical_id));

    ResolutionOutcome {
        canonical_companies,
        alias_map,
        quarantine: engine.quarantine.clone(),
        merged_groups,
        market_conflicts: engine.market_conflicts.clone(),
        cross_bucket_merges: engine.cross_bucket_merges.clone(),
    }
}
