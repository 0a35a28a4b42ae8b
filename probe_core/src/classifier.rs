//! Frozen decision tree separating precise probes from imprecise ones.
//!
//! The tree is a trained artifact. It is stored as a flat table of split
//! nodes so that a retrained model only changes data, never code. A sample
//! goes to `le` when `input[feature] <= threshold` and to `gt` otherwise; a
//! NaN input therefore always takes the `gt` branch.

use crate::features::Features;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Node(usize),
    Good,
    Bad,
}

#[derive(Debug, Clone, Copy)]
pub struct Split {
    /// Index into `Features::classifier_inputs()`.
    pub feature: usize,
    pub threshold: f32,
    pub le: Branch,
    pub gt: Branch,
}

const fn split(feature: usize, threshold: f32, le: Branch, gt: Branch) -> Split {
    Split {
        feature,
        threshold,
        le,
        gt,
    }
}

use Branch::{Bad, Good, Node};

/// Feature indices: 0..=3 load angles (CS, CE, DS, DE); 4 r2_20ms.CS;
/// 5 r2_20ms.DE; 6 r2_30ms.CE; 7 r2_30ms.DS; 8 r2_50ms.CS; 9 r2_50ms.DE;
/// 10 r2_60ms.CE; 11 r2_60ms.DS; 12 load mean after decompression.
pub static TREE: [Split; 20] = [
    /* 0 */ split(5, 0.9712, Node(1), Node(2)),
    /* 1 */ split(9, 0.9563, Bad, Node(3)),
    /* 2 */ split(4, 0.9408, Node(5), Node(6)),
    /* 3 */ split(0, 61.27, Bad, Node(4)),
    /* 4 */ split(12, 9.84, Good, Bad),
    /* 5 */ split(8, 0.9781, Bad, Node(7)),
    /* 6 */ split(1, 24.66, Node(8), Node(9)),
    /* 7 */ split(3, 70.15, Bad, Good),
    /* 8 */ split(6, 0.9987, Bad, Node(10)),
    /* 9 */ split(2, 155.9, Node(11), Node(12)),
    /* 10 */ split(2, 168.03, Good, Bad),
    /* 11 */ split(10, 0.9752, Node(13), Node(14)),
    /* 12 */ split(7, 0.9969, Bad, Node(19)),
    /* 13 */ split(11, 0.9801, Bad, Good),
    /* 14 */ split(3, 64.4, Node(15), Node(16)),
    /* 15 */ split(7, 0.999, Bad, Good),
    /* 16 */ split(12, -27.31, Bad, Node(17)),
    /* 17 */ split(12, 38.52, Good, Node(18)),
    /* 18 */ split(9, 0.9991, Bad, Good),
    /* 19 */ split(0, 74.9, Bad, Good),
];

/// Walk `tree` from the root. Returns `true` for a precise probe.
///
/// A malformed table (child index out of bounds or pointing backwards)
/// classifies as imprecise instead of looping or panicking.
pub fn classify_with(tree: &[Split], inputs: &[f32]) -> bool {
    let mut idx = 0usize;
    loop {
        let Some(node) = tree.get(idx) else {
            return false;
        };
        let Some(&x) = inputs.get(node.feature) else {
            return false;
        };
        let next = if x <= node.threshold { node.le } else { node.gt };
        match next {
            Good => return true,
            Bad => return false,
            Node(child) if child > idx => idx = child,
            Node(_) => return false,
        }
    }
}

/// Classify with the built-in tree.
pub fn classify(features: &Features) -> bool {
    classify_with(&TREE, &features.classifier_inputs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_point_forward_and_in_bounds() {
        for (i, node) in TREE.iter().enumerate() {
            for b in [node.le, node.gt] {
                if let Node(c) = b {
                    assert!(c > i && c < TREE.len(), "node {i} -> {c}");
                }
            }
            assert!(node.feature < 13);
        }
    }

    #[test]
    fn every_node_is_reachable() {
        let mut seen = [false; 20];
        seen[0] = true;
        for node in &TREE {
            for b in [node.le, node.gt] {
                if let Node(c) = b {
                    seen[c] = true;
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn low_fit_quality_at_decompression_end_is_bad() {
        let mut x = [0.0f32; 13];
        x[5] = 0.5; // r2_20ms.DE
        x[9] = 0.5; // r2_50ms.DE
        assert!(!classify_with(&TREE, &x));
    }

    #[test]
    fn clean_probe_path_is_good() {
        // 0 -> 2 -> 6 -> 9 -> 11 -> 14 -> 16 -> 17 -> Good
        let x = [
            90.0, 90.0, 100.0, 80.0, 0.99, 0.99, 0.999, 0.999, 0.99, 0.99, 0.99, 0.99, 1.0,
        ];
        assert!(classify_with(&TREE, &x));
    }

    #[test]
    fn nan_takes_greater_branch() {
        let tree = [split(0, 1.0, Bad, Good)];
        assert!(classify_with(&tree, &[f32::NAN]));
    }

    #[test]
    fn malformed_table_is_bad() {
        let backwards = [split(0, 1.0, Node(0), Good)];
        assert!(!classify_with(&backwards, &[0.0]));
        let dangling = [split(0, 1.0, Node(7), Good)];
        assert!(!classify_with(&dangling, &[0.0]));
        assert!(!classify_with(&[], &[0.0]));
    }
}
