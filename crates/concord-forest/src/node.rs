use std::fmt;

use crate::sample::majority_class;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node of an induced decision tree.
///
/// Each `Internal` node owns both of its children; there are no parent or
/// shared references, so a tree is dropped, cloned and compared as one value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum TreeNode {
    /// A terminal node holding the raw per-class sample counts of its partition.
    Leaf {
        /// `class_counts[c]` is the number of training samples of class `c`
        /// that reached this leaf.
        class_counts: Vec<usize>,
    },
    /// A threshold split: samples with `features[feature] <= threshold` go left.
    Internal {
        /// Feature used for the split.
        feature: FeatureIndex,
        /// Midpoint between two consecutive distinct observed values.
        threshold: f64,
        /// Subtree for `features[feature] <= threshold`.
        left: Box<TreeNode>,
        /// Subtree for `features[feature] > threshold`.
        right: Box<TreeNode>,
        /// Number of training samples that reached this node.
        n_samples: usize,
        /// Sample-weighted Gini decrease achieved by this split.
        impurity_decrease: f64,
    },
}

impl TreeNode {
    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            TreeNode::Leaf { class_counts } => class_counts.iter().sum(),
            TreeNode::Internal { n_samples, .. } => *n_samples,
        }
    }

    /// Route `sample` from this node down to a leaf and return that leaf's counts.
    ///
    /// The caller guarantees `sample` has the training arity.
    #[must_use]
    pub fn leaf_counts(&self, sample: &[f64]) -> &[usize] {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { class_counts } => return class_counts,
                TreeNode::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if sample[feature.index()] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Return the majority class of the leaf `sample` lands in.
    #[must_use]
    pub fn vote(&self, sample: &[f64]) -> usize {
        majority_class(self.leaf_counts(sample))
    }

    /// Total number of nodes in this subtree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Internal { left, right, .. } => 1 + left.n_nodes() + right.n_nodes(),
        }
    }

    /// Number of leaves in this subtree.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Internal { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }

    /// Depth of this subtree; a lone leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Add each split's impurity decrease to `totals[feature]`.
    pub(crate) fn accumulate_importance(&self, totals: &mut [f64]) {
        if let TreeNode::Internal {
            feature,
            left,
            right,
            impurity_decrease,
            ..
        } = self
        {
            totals[feature.index()] += impurity_decrease;
            left.accumulate_importance(totals);
            right.accumulate_importance(totals);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FeatureIndex, TreeNode};

    fn leaf(counts: &[usize]) -> Box<TreeNode> {
        Box::new(TreeNode::Leaf {
            class_counts: counts.to_vec(),
        })
    }

    // x0 <= 1.5 -> [3, 0]; else x1 <= 0.5 -> [0, 2]; else [1, 4]
    fn make_tree() -> TreeNode {
        TreeNode::Internal {
            feature: FeatureIndex::new(0),
            threshold: 1.5,
            left: leaf(&[3, 0]),
            right: Box::new(TreeNode::Internal {
                feature: FeatureIndex::new(1),
                threshold: 0.5,
                left: leaf(&[0, 2]),
                right: leaf(&[1, 4]),
                n_samples: 7,
                impurity_decrease: 0.4,
            }),
            n_samples: 10,
            impurity_decrease: 2.0,
        }
    }

    #[test]
    fn feature_index_display() {
        assert_eq!(format!("{}", FeatureIndex::new(3)), "3");
    }

    #[test]
    fn routing_uses_inclusive_left_bound() {
        let tree = make_tree();
        assert_eq!(tree.leaf_counts(&[1.5, 9.0]), &[3, 0]);
        assert_eq!(tree.leaf_counts(&[1.6, 0.5]), &[0, 2]);
        assert_eq!(tree.leaf_counts(&[1.6, 0.6]), &[1, 4]);
    }

    #[test]
    fn vote_is_leaf_majority() {
        let tree = make_tree();
        assert_eq!(tree.vote(&[0.0, 0.0]), 0);
        assert_eq!(tree.vote(&[5.0, 5.0]), 1);
    }

    #[test]
    fn shape_queries() {
        let tree = make_tree();
        assert_eq!(tree.n_nodes(), 5);
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.n_samples(), 10);
        assert!(!tree.is_leaf());
    }

    #[test]
    fn leaf_n_samples_is_count_sum() {
        assert_eq!(leaf(&[2, 3, 4]).n_samples(), 9);
    }

    #[test]
    fn importance_accumulates_per_feature() {
        let mut totals = vec![0.0; 2];
        make_tree().accumulate_importance(&mut totals);
        assert!((totals[0] - 2.0).abs() < f64::EPSILON);
        assert!((totals[1] - 0.4).abs() < f64::EPSILON);
    }
}
