//! Ratcliff/Obershelp similarity ratio (§9 design note): the same
//! matching-blocks-over-total-length metric as Python's
//! `difflib.SequenceMatcher.ratio()`. The Compatibility Oracle's 0.93
//! threshold (§4.4 step 5) is calibrated against this exact metric — a
//! different similarity function would need recalibration, so this is a
//! from-scratch implementation rather than a stand-in from a general
//! string-distance crate.
//!
//! Company names compared here are always short (well under the 200
//! character point at which `difflib` starts treating frequent elements
//! as junk), so the "autojunk" heuristic from the original algorithm is
//! intentionally not implemented.

use std::collections::HashMap;

/// The Ratcliff/Obershelp ratio of `a` and `b`, in `[0.0, 1.0]`.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let b2j = build_b2j(&b);
    let matches = matching_block_total(&a, &b, &b2j);
    2.0 * matches as f64 / (a.len() + b.len()) as f64
}

fn build_b2j(b: &[char]) -> HashMap<char, Vec<usize>> {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (index, &ch) in b.iter().enumerate() {
        b2j.entry(ch).or_default().push(index);
    }
    b2j
}

fn matching_block_total(a: &[char], b: &[char], b2j: &HashMap<char, Vec<usize>>) -> usize {
    let mut total = 0usize;
    // Stack of (alo, ahi, blo, bhi) ranges left to examine, mirroring
    // difflib's iterative queue-based get_matching_blocks.
    let mut queue = vec![(0usize, a.len(), 0usize, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, size) = find_longest_match(a, b2j, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        total += size;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            queue.push((i + size, ahi, j + size, bhi));
        }
    }
    total
}

fn find_longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best_i = alo;
    let mut best_j = blo;
    let mut best_size = 0usize;

    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for i in alo..ahi {
        let mut new_j2len: HashMap<usize, usize> = HashMap::new();
        if let Some(indices) = b2j.get(&a[i]) {
            for &j in indices {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j2len.get(&j.wrapping_sub(1)).copied().unwrap_or(0) + 1;
                new_j2len.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        j2len = new_j2len;
    }

    (best_i, best_j, best_size)
}
