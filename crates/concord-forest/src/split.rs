use rand::Rng;

use crate::node::FeatureIndex;
use crate::sample::LabeledSample;

/// Gini impurity `1 - Σ p_c²` of a partition with the given class counts.
///
/// An empty partition has impurity `0.0`.
#[must_use]
pub fn gini_impurity(class_counts: &[usize], n_samples: usize) -> f64 {
    if n_samples == 0 {
        return 0.0;
    }
    let n = n_samples as f64;
    let sum_sq: f64 = class_counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum();
    1.0 - sum_sq
}

/// The winning split of a node and the partition it induces.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// `(|L|/|N|)·gini(L) + (|R|/|N|)·gini(R)`.
    pub(crate) weighted_impurity: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Draw `take` distinct feature indices out of `n_features`, uniformly and
/// without replacement, in draw order.
pub(crate) fn draw_features(n_features: usize, take: usize, rng: &mut impl Rng) -> Vec<usize> {
    let take = take.min(n_features);
    let mut order: Vec<usize> = (0..n_features).collect();
    // Partial Fisher-Yates over the first `take` slots.
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        order.swap(i, j);
    }
    order.truncate(take);
    order
}

/// Find the lowest weighted-Gini split over `max_features` randomly drawn features.
///
/// For each drawn feature the `(value, label)` pairs are sorted and scanned
/// once; a candidate threshold is the midpoint between every pair of
/// consecutive distinct values, so both sides are always non-empty. The first
/// candidate reaching the minimum wins, iterating features in draw order and
/// thresholds in ascending order.
///
/// Returns `None` when every drawn feature is constant over `indices`.
pub(crate) fn find_best_split(
    samples: &[LabeledSample],
    indices: &[usize],
    n_classes: usize,
    max_features: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_samples = indices.len();
    let n_features = samples.first()?.n_features();
    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let mut parent_counts = vec![0usize; n_classes];
    for &si in indices {
        parent_counts[samples[si].label] += 1;
    }

    let n = n_samples as f64;
    let mut best: Option<(usize, f64, f64)> = None;

    for feat_idx in draw_features(n_features, max_features, rng) {
        let mut sorted: Vec<(f64, usize)> = indices
            .iter()
            .map(|&si| (samples[si].features[feat_idx], samples[si].label))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = parent_counts.clone();

        for i in 0..(n_samples - 1) {
            let (value, class) = sorted[i];
            left_counts[class] += 1;
            right_counts[class] -= 1;

            let next = sorted[i + 1].0;
            if value == next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n_samples - n_left;
            let impurity = (n_left as f64 / n) * gini_impurity(&left_counts, n_left)
                + (n_right as f64 / n) * gini_impurity(&right_counts, n_right);

            if best.is_none_or(|(_, _, b)| impurity < b) {
                best = Some((feat_idx, midpoint(value, next), impurity));
            }
        }
    }

    let (feat_idx, threshold, weighted_impurity) = best?;

    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&si| samples[si].features[feat_idx] <= threshold);

    Some(SplitResult {
        feature: FeatureIndex::new(feat_idx),
        threshold,
        weighted_impurity,
        left_indices,
        right_indices,
    })
}

/// Threshold between two distinct sorted values, always in `[value, next)`.
///
/// Halving first keeps large magnitudes from overflowing; adjacent floats can
/// still round onto `next`, in which case `value` itself separates the pair.
fn midpoint(value: f64, next: f64) -> f64 {
    let mid = value / 2.0 + next / 2.0;
    if mid >= value && mid < next { mid } else { value }
}
