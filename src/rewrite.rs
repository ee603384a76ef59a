//! Row Rewriter (§4.6): applies the alias map to quote/mention rows,
//! dropping rows whose source company was quarantined. Row order is
//! preserved — a stable filter-then-map, never a re-sort.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::types::{CompanyRow, QuarantineReason};

/// Outcome of rewriting one row collection: the surviving rows with
/// `company_id` replaced by its canonical id, and how many were dropped.
pub struct RewriteOutcome {
    pub rows: Vec<CompanyRow>,
    pub dropped: usize,
}

/// Rewrite `rows` in place order: drop a row only when its source
/// `company_id` is quarantined; otherwise remap through `alias_map`,
/// falling back to the row's own id unchanged when it isn't one of the
/// ids the alias map covers (a dangling `company_id` with no matching
/// `companies.json` entry is preserved verbatim, not dropped).
pub fn rewrite_rows(
    rows: &[CompanyRow],
    alias_map: &IndexMap<String, String>,
    quarantine: &BTreeMap<String, QuarantineReason>,
) -> RewriteOutcome {
    let mut out = Vec::with_capacity(rows.len());
    let mut dropped = 0;
    for row in rows {
        if quarantine.contains_key(&row.company_id) {
            dropped += 1;
            continue;
        }
        let mut rewritten = row.clone();
        rewritten.company_id = alias_map.get(&row.company_id).cloned().unwrap_or_else(|| row.company_id.clone());
        out.push(rewritten);
    }
    RewriteOutcome { rows: out, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, company_id: &str) -> CompanyRow {
        CompanyRow { id: id.to_string(), company_id: company_id.to_string(), edition_id: "e1".to_string(), extra: BTreeMap::new() }
    }

    #[test]
    fn rewrites_company_id_to_canonical_and_preserves_order() {
        let mut alias_map = IndexMap::new();
        alias_map.insert("a".to_string(), "canon-a".to_string());
        alias_map.insert("b".to_string(), "canon-a".to_string());
        let rows = vec![row("q1", "a"), row("q2", "b")];
        let outcome = rewrite_rows(&rows, &alias_map, &BTreeMap::new());
        assert_eq!(outcome.dropped, 0);
        assert_eq!(outcome.rows[0].company_id, "canon-a");
        assert_eq!(outcome.rows[1].company_id, "canon-a");
        assert_eq!(outcome.rows[0].id, "q1");
        assert_eq!(outcome.rows[1].id, "q2");
    }

    #[test]
    fn drops_rows_for_quarantined_companies() {
        let mut alias_map = IndexMap::new();
        alias_map.insert("a".to_string(), "canon-a".to_string());
        let mut quarantine = BTreeMap::new();
        quarantine.insert("quarantined-id".to_string(), QuarantineReason::NonCompanyLabel);
        let rows = vec![row("q1", "a"), row("q2", "quarantined-id")];
        let outcome = rewrite_rows(&rows, &alias_map, &quarantine);
        assert_eq!(outcome.dropped, 1);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].id, "q1");
    }

    #[test]
    fn dangling_company_id_is_preserved_unchanged_not_dropped() {
        // "missing" appears in a quote row but has no entry in
        // `companies.json`, so it's in neither `alias_map` nor
        // `quarantine` — it must survive with its original id verbatim.
        let rows = vec![row("q1", "missing")];
        let outcome = rewrite_rows(&rows, &IndexMap::new(), &BTreeMap::new());
        assert_eq!(outcome.dropped, 0);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].company_id, "missing");
    }

    #[test]
    fn empty_rows_is_a_no_op() {
        let outcome = rewrite_rows(&[], &IndexMap::new(), &BTreeMap::new());
        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.dropped, 0);
    }
}
