use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detection::FullObjectDetection;
use crate::error::{Error, Result};
use crate::features::extract_feature_pixel_values;
use crate::image::ImageAccess;
use crate::tree::RegressionTree;
use crate::types::{DetectionRegion, Point, Shape};

/// The main shape predictor model.
///
/// This implements the ERT algorithm for facial landmark detection with the
/// same model layout and prediction rules as dlib's `shape_predictor`.
/// The model consists of:
/// - An initial shape in normalized [0,1] rectangle coordinates
/// - A cascade of tree forests that iteratively refine the shape
/// - Per cascade level, the feature pixels the trees compare, each given as
///   an anchor landmark plus a normalized offset
///
/// A default-constructed predictor has no parts and no cascade levels; it
/// returns detections with zero parts.
///
/// # Usage
///
/// ```ignore
/// let model = ShapePredictor::load("shape_predictor_5_face_landmarks.dat")?;
/// let face_rect = Rectangle::new(100, 100, 299, 299);
/// let landmarks = model.predict(&image, &face_rect);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapePredictor {
    initial_shape: Shape,
    forests: Vec<Vec<RegressionTree>>,
    anchor_idx: Vec<Vec<usize>>,
    deltas: Vec<Vec<Point>>,
}

impl ShapePredictor {
    /// Assemble a predictor, checking that every index stays in range so
    /// prediction can never read out of bounds.
    pub fn new(
        initial_shape: Shape,
        forests: Vec<Vec<RegressionTree>>,
        anchor_idx: Vec<Vec<usize>>,
        deltas: Vec<Vec<Point>>,
    ) -> Result<Self> {
        let num_parts = initial_shape.num_landmarks();

        if anchor_idx.len() != forests.len() || deltas.len() != forests.len() {
            return Err(Error::InvalidModel(format!(
                "{} cascade levels but {} anchor sets and {} delta sets",
                forests.len(),
                anchor_idx.len(),
                deltas.len()
            )));
        }

        for (level, trees) in forests.iter().enumerate() {
            let anchors = &anchor_idx[level];
            let num_feature_pixels = anchors.len();

            if deltas[level].len() != num_feature_pixels {
                return Err(Error::InvalidModel(format!(
                    "Cascade {}: {} anchors but {} deltas",
                    level,
                    num_feature_pixels,
                    deltas[level].len()
                )));
            }

            if let Some(bad) = anchors.iter().find(|&&a| a >= num_parts) {
                return Err(Error::InvalidModel(format!(
                    "Cascade {}: anchor {} out of range for {} parts",
                    level, bad, num_parts
                )));
            }

            for (t, tree) in trees.iter().enumerate() {
                validate_tree(tree, num_parts, num_feature_pixels)
                    .map_err(|msg| Error::InvalidModel(format!("Cascade {} tree {}: {}", level, t, msg)))?;
            }
        }

        Ok(Self {
            initial_shape,
            forests,
            anchor_idx,
            deltas,
        })
    }

    /// Load a model in dlib's format (`.dat`, or `.dat.bz2`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        crate::dlib::load_dlib_model(path)
    }

    /// Save the model in dlib's format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::dlib::save_dlib_model(self, path)
    }

    /// Number of landmarks this model predicts.
    pub fn num_parts(&self) -> usize {
        self.initial_shape.num_landmarks()
    }

    /// Total number of leaves across every tree of every cascade level.
    pub fn num_features(&self) -> usize {
        self.forests
            .iter()
            .flat_map(|trees| trees.iter())
            .map(RegressionTree::num_leaves)
            .sum()
    }

    /// Get the number of cascade stages.
    pub fn num_cascade_stages(&self) -> usize {
        self.forests.len()
    }

    pub fn initial_shape(&self) -> &Shape {
        &self.initial_shape
    }

    pub fn forests(&self) -> &[Vec<RegressionTree>] {
        &self.forests
    }

    pub fn anchor_idx(&self) -> &[Vec<usize>] {
        &self.anchor_idx
    }

    pub fn deltas(&self) -> &[Vec<Point>] {
        &self.deltas
    }

    /// Predict landmarks for the object inside `region`.
    ///
    /// # Arguments
    ///
    /// * `image` - Any pixel buffer; color pixels are reduced to intensity
    /// * `region` - A plain [`Rectangle`](crate::Rectangle) or a scored
    ///   [`MmodRect`](crate::MmodRect); only its rectangle is used
    ///
    /// # Returns
    ///
    /// A detection holding the rectangle and the landmark positions in image
    /// coordinates.
    pub fn predict<I, R>(&self, image: &I, region: &R) -> FullObjectDetection
    where
        I: ImageAccess,
        R: DetectionRegion + ?Sized,
    {
        let rect = region.region();
        let mut current_shape = self.initial_shape.clone();
        let mut feature_pixel_values = Vec::new();

        for (level, trees) in self.forests.iter().enumerate() {
            extract_feature_pixel_values(
                image,
                &rect,
                &current_shape,
                &self.initial_shape,
                &self.anchor_idx[level],
                &self.deltas[level],
                &mut feature_pixel_values,
            );

            for tree in trees {
                current_shape.add_delta(tree.predict(&feature_pixel_values));
            }
        }

        let parts = current_shape
            .points
            .iter()
            .map(|p| rect.unnormalize(*p))
            .collect();

        FullObjectDetection::new(rect, parts)
    }
}

fn validate_tree(
    tree: &RegressionTree,
    num_parts: usize,
    num_feature_pixels: usize,
) -> std::result::Result<(), String> {
    if tree.num_leaves() != tree.splits.len() + 1 {
        return Err(format!(
            "{} splits should have {} leaves, got {}",
            tree.splits.len(),
            tree.splits.len() + 1,
            tree.num_leaves()
        ));
    }

    if let Some(leaf) = tree.leaf_values.iter().find(|l| l.num_landmarks() != num_parts) {
        return Err(format!(
            "leaf delta has {} parts, expected {}",
            leaf.num_landmarks(),
            num_parts
        ));
    }

    if let Some(split) = tree
        .splits
        .iter()
        .find(|s| s.idx1 >= num_feature_pixels || s.idx2 >= num_feature_pixels)
    {
        return Err(format!(
            "split reads feature pixels ({}, {}) of {}",
            split.idx1, split.idx2, num_feature_pixels
        ));
    }

    Ok(())
}

/// Builder for creating a ShapePredictor model.
pub struct ShapePredictorBuilder {
    initial_shape: Option<Shape>,
    forests: Vec<Vec<RegressionTree>>,
    anchor_idx: Vec<Vec<usize>>,
    deltas: Vec<Vec<Point>>,
}

impl ShapePredictorBuilder {
    pub fn new() -> Self {
        Self {
            initial_shape: None,
            forests: Vec::new(),
            anchor_idx: Vec::new(),
            deltas: Vec::new(),
        }
    }

    /// Set the initial shape, in normalized rectangle coordinates.
    pub fn initial_shape(mut self, shape: Shape) -> Self {
        self.initial_shape = Some(shape);
        self
    }

    /// Add a cascade level: its trees and the feature pixels they compare,
    /// given as `(anchor landmark, normalized offset)` pairs.
    pub fn add_cascade_stage(mut self, trees: Vec<RegressionTree>, feature_pixels: Vec<(usize, Point)>) -> Self {
        let (anchors, deltas) = feature_pixels.into_iter().unzip();
        self.forests.push(trees);
        self.anchor_idx.push(anchors);
        self.deltas.push(deltas);
        self
    }

    /// Build the ShapePredictor.
    pub fn build(self) -> Result<ShapePredictor> {
        let initial_shape = self
            .initial_shape
            .ok_or_else(|| Error::InvalidModel("Missing initial shape".into()))?;

        if self.forests.is_empty() {
            return Err(Error::InvalidModel(
                "Cascade must have at least one stage".into(),
            ));
        }

        ShapePredictor::new(initial_shape, self.forests, self.anchor_idx, self.deltas)
    }
}

impl Default for ShapePredictorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
