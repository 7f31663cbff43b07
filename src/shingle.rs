//! Turns a function subtree into its multiset of structural k-shingles.
//!
//! Using only node *types* (never tokens or identifiers) is what makes the
//! downstream similarity metric insensitive to renaming: a Type-2 clone
//! differs from its Type-1 sibling only in identifiers/literals, which never
//! enter a shingle.

use crate::node::Node;

/// Pre-order traverses `root`, emitting the sliding `k`-gram shingles of its
/// node-type stream, each joined by the `|` (0x7C) separator. Returns an
/// empty list when fewer than `k` nodes were visited.
pub fn extract_shingles(root: &Node, k: usize) -> Vec<Vec<u8>> {
    let mut types = Vec::new();
    root.visit_pre_order(&mut |node, _depth| {
        if !node.node_type.is_empty() {
            types.push(node.node_type.as_str());
        }
    });

    if k == 0 || types.len() < k {
        return Vec::new();
    }

    let mut shingles = Vec::with_capacity(types.len() - k + 1);
    for window in types.windows(k) {
        shingles.push(window.join("|").into_bytes());
    }
    shingles
}
