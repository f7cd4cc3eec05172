use serde::{Deserialize, Serialize};

use crate::types::{ImagePoint, Rectangle};

/// The result of one prediction: the region it ran in and the landmark
/// positions, in model part order, in image coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullObjectDetection {
    rect: Rectangle,
    parts: Vec<ImagePoint>,
}

impl FullObjectDetection {
    pub fn new(rect: Rectangle, parts: Vec<ImagePoint>) -> Self {
        Self { rect, parts }
    }

    pub fn rect(&self) -> Rectangle {
        self.rect
    }

    pub fn num_parts(&self) -> usize {
        self.parts.len()
    }

    pub fn part(&self, idx: usize) -> Option<ImagePoint> {
        self.parts.get(idx).copied()
    }

    pub fn parts(&self) -> &[ImagePoint] {
        &self.parts
    }
}

impl std::ops::Index<usize> for FullObjectDetection {
    type Output = ImagePoint;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.parts[idx]
    }
}
