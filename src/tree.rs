use serde::{Deserialize, Serialize};

use crate::types::Shape;

/// A split test comparing two feature pixels of the current cascade level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitFeature {
    /// Index of the first feature pixel.
    pub idx1: usize,
    /// Index of the second feature pixel.
    pub idx2: usize,
    pub thresh: f32,
}

/// A single regression tree stored as a complete binary tree.
///
/// Split `i` has children `2i + 1` and `2i + 2`; indices at or past
/// `splits.len()` address `leaf_values[index - splits.len()]`.
///
/// The tree predicts a shape delta by:
/// 1. Starting at the root split
/// 2. At each split, taking the difference of two feature pixel intensities
/// 3. Going left if the difference exceeds the threshold, right otherwise
/// 4. Returning the shape delta at the reached leaf
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub splits: Vec<SplitFeature>,
    pub leaf_values: Vec<Shape>,
}

impl RegressionTree {
    pub fn new(splits: Vec<SplitFeature>, leaf_values: Vec<Shape>) -> Self {
        Self {
            splits,
            leaf_values,
        }
    }

    /// A tree with no splits that always yields `delta`.
    pub fn leaf(delta: Shape) -> Self {
        Self::new(Vec::new(), vec![delta])
    }

    pub fn num_leaves(&self) -> usize {
        self.leaf_values.len()
    }

    /// Index of the leaf reached for the given feature pixel values.
    pub fn leaf_index(&self, feature_pixel_values: &[f32]) -> usize {
        let mut i = 0usize;
        while i < self.splits.len() {
            let split = &self.splits[i];
            let diff = feature_pixel_values[split.idx1] - feature_pixel_values[split.idx2];
            i = if diff > split.thresh { 2 * i + 1 } else { 2 * i + 2 };
        }
        i - self.splits.len()
    }

    /// Traverse the tree and return a reference to the leaf delta.
    pub fn predict(&self, feature_pixel_values: &[f32]) -> &Shape {
        &self.leaf_values[self.leaf_index(feature_pixel_values)]
    }
}
