//! Union-find over raw company ids (§4.5, §9 design note: "no pointer
//! cycles, component membership recovered by path-compressed find").
//!
//! Deliberately *not* union-by-rank: `union(left, right)` always makes
//! `left`'s root the new root, matching the spec's tie-break convention
//! that the left operand wins. Callers that need deterministic
//! components regardless of call order drive `union` in a fixed order
//! (sorted ids, sorted rule pairs) rather than relying on this function
//! to pick a canonical side.

use std::collections::HashMap;

pub struct UnionFind {
    parent: HashMap<String, String>,
}

impl UnionFind {
    pub fn new<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let parent = ids.into_iter().map(|id| (id.to_string(), id.to_string())).collect();
        Self { parent }
    }

    pub fn find(&mut self, id: &str) -> String {
        let mut root = id.to_string();
        while self.parent[&root] != root {
            root = self.parent[&root].clone();
        }

        let mut current = id.to_string();
        while self.parent[&current] != current {
            let next = self.parent[&current].clone();
            self.parent.insert(current, root.clone());
            current = next;
        }
        root
    }

    pub fn union(&mut self, left: &str, right: &str) {
        let left_root = self.find(left);
        let right_root = self.find(right);
        if left_root == right_root {
            return;
        }
        self.parent.insert(right_root, left_root);
    }
}
