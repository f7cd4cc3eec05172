//! # shape-predictor-bridge
//!
//! Pure Rust facial landmark shape predictor with a flat C interface.
//!
//! This crate provides:
//! - **Landmark Prediction**: dlib-compatible ERT shape predictor over any
//!   supported pixel type
//! - **Model Files**: reading and writing dlib's `shape_predictor` format,
//!   plain or bzip2-compressed
//! - **C Boundary**: opaque handles, element-type tags and status codes in
//!   [`ffi`], for hosts that load the library as a `cdylib`
//!
//! Implements the algorithm from "One Millisecond Face Alignment with an
//! Ensemble of Regression Trees" (Kazemi & Sullivan, 2014).
//!
//! ## Algorithm Overview
//!
//! 1. Start from the model's normalized initial shape
//! 2. For each cascade level:
//!    - Align the initial shape to the current estimate
//!    - Sample feature pixels relative to their anchor landmarks
//!    - Walk every regression tree and add its leaf delta
//! 3. Map the shape into the detection rectangle and round to pixels
//!
//! ## Quick Start
//!
//! ```rust
//! use shape_predictor_bridge::{
//!     Array2D, Point, Rectangle, RegressionTree, Shape, ShapePredictorBuilder,
//! };
//!
//! // Load a trained model
//! // let model = ShapePredictor::load("shape_predictor_5_face_landmarks.dat").unwrap();
//!
//! // Or build a small one for development
//! let initial = Shape::new(vec![Point::new(0.3, 0.4), Point::new(0.7, 0.4)]);
//! let model = ShapePredictorBuilder::new()
//!     .initial_shape(initial)
//!     .add_cascade_stage(
//!         vec![RegressionTree::leaf(Shape::zeros(2))],
//!         vec![(0, Point::zero())],
//!     )
//!     .build()
//!     .unwrap();
//!
//! let image = Array2D::from_fn(480, 640, |x, y| ((x + y) % 256) as u8);
//! let face = Rectangle::new(100, 50, 299, 249);
//!
//! let detection = model.predict(&image, &face);
//! assert_eq!(detection.num_parts(), 2);
//! ```
//!
//! ## Custom Image Types
//!
//! Implement [`ImageAccess`] to predict on your own buffers:
//!
//! ```rust
//! use shape_predictor_bridge::ImageAccess;
//!
//! struct Frame {
//!     width: usize,
//!     height: usize,
//!     luma: Vec<u8>,
//! }
//!
//! impl ImageAccess for Frame {
//!     type Pixel = u8;
//!
//!     fn width(&self) -> usize { self.width }
//!     fn height(&self) -> usize { self.height }
//!     fn get_pixel(&self, x: usize, y: usize) -> &u8 {
//!         &self.luma[y * self.width + x]
//!     }
//! }
//! ```

mod detection;
pub mod dlib;
mod error;
mod features;
pub mod ffi;
mod image;
mod model;
mod pixel;
pub mod proxy;
mod tree;
mod types;

pub use detection::FullObjectDetection;
pub use error::{Error, Result};
pub use features::{find_similarity_transform, SimilarityTransform2D};
pub use image::{Array2D, ImageAccess, Matrix};
pub use model::{ShapePredictor, ShapePredictorBuilder};
pub use pixel::{HsiPixel, PixelIntensity, RgbAlphaPixel, RgbPixel};
pub use proxy::{Deserializer, ProxyDeserialize};
pub use tree::{RegressionTree, SplitFeature};
pub use types::{DetectionRegion, ImagePoint, MmodRect, Point, Rectangle, Shape};
