use crate::image::ImageAccess;
use crate::pixel::PixelIntensity;
use crate::types::{Point, Rectangle, Shape};

/// The linear part of a similarity transform (rotation and uniform scale).
///
/// Translation is never needed here: the transform only re-orients the
/// feature-pixel offsets, which are then added to an anchor landmark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTransform2D {
    /// Row-major 2x2 matrix `[[m00, m01], [m10, m11]]`.
    pub m: [[f32; 2]; 2],
}

impl SimilarityTransform2D {
    pub const fn identity() -> Self {
        Self {
            m: [[1.0, 0.0], [0.0, 1.0]],
        }
    }

    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.m[0][0] * p.x + self.m[0][1] * p.y,
            self.m[1][0] * p.x + self.m[1][1] * p.y,
        )
    }
}

impl Default for SimilarityTransform2D {
    fn default() -> Self {
        Self::identity()
    }
}

/// Least-squares similarity transform mapping `from` onto `to`.
///
/// Closed form of Umeyama's method in two dimensions: with centered point
/// sets, `a = Σ(f·t)` and `b = Σ(f×t)` give the rotation direction, and the
/// scale follows from dividing by the variance of `from`. Reflections are
/// never produced. Returns identity when `from` has no spread.
pub fn find_similarity_transform(from: &Shape, to: &Shape) -> SimilarityTransform2D {
    debug_assert_eq!(from.num_landmarks(), to.num_landmarks());
    let n = from.num_landmarks();
    if n == 0 {
        return SimilarityTransform2D::identity();
    }

    let mean = |s: &Shape| {
        let sum = s
            .points
            .iter()
            .fold(Point::zero(), |acc, p| acc + *p);
        sum * (1.0 / n as f32)
    };
    let mean_from = mean(from);
    let mean_to = mean(to);

    let mut sigma_from = 0.0f32;
    let mut a = 0.0f32;
    let mut b = 0.0f32;
    for (f, t) in from.points.iter().zip(to.points.iter()) {
        let f = *f - mean_from;
        let t = *t - mean_to;
        sigma_from += f.x * f.x + f.y * f.y;
        a += f.x * t.x + f.y * t.y;
        b += f.x * t.y - f.y * t.x;
    }

    if sigma_from == 0.0 {
        return SimilarityTransform2D::identity();
    }

    // n cancels between the covariance and the variance.
    let a = a / sigma_from;
    let b = b / sigma_from;
    SimilarityTransform2D {
        m: [[a, -b], [b, a]],
    }
}

/// Transform between two shapes, identity when there is a single landmark.
pub fn find_tform_between_shapes(from: &Shape, to: &Shape) -> SimilarityTransform2D {
    if from.num_landmarks() == 1 {
        return SimilarityTransform2D::identity();
    }
    find_similarity_transform(from, to)
}

/// Sample one cascade level's feature pixels.
///
/// Each feature pixel sits at `deltas[i]`, re-oriented by the transform from
/// `reference_shape` to `current_shape`, relative to landmark
/// `anchor_idx[i]` of the current shape. The normalized location is mapped
/// into the image through `rect` and rounded; pixels outside the image read
/// as 0.
pub fn extract_feature_pixel_values<I: ImageAccess>(
    image: &I,
    rect: &Rectangle,
    current_shape: &Shape,
    reference_shape: &Shape,
    anchor_idx: &[usize],
    deltas: &[Point],
    feature_pixel_values: &mut Vec<f32>,
) {
    let tform = find_tform_between_shapes(reference_shape, current_shape);
    let area = Rectangle::from_size(image.width(), image.height());

    feature_pixel_values.clear();
    feature_pixel_values.extend(anchor_idx.iter().zip(deltas.iter()).map(|(&anchor, &delta)| {
        let normalized = tform.apply(delta) + current_shape[anchor];
        let p = rect.unnormalize(normalized);
        if area.contains(p) {
            image.get_pixel(p.x as usize, p.y as usize).intensity()
        } else {
            0.0
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Array2D;

    fn assert_tform_eq(t: &SimilarityTransform2D, expected: [[f32; 2]; 2]) {
        for r in 0..2 {
            for c in 0..2 {
                assert!(
                    (t.m[r][c] - expected[r][c]).abs() < 1e-5,
                    "m[{}][{}] = {}, expected {}",
                    r,
                    c,
                    t.m[r][c],
                    expected[r][c]
                );
            }
        }
    }

    fn square() -> Shape {
        Shape::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ])
    }

    #[test]
    fn identical_shapes_give_identity() {
        let s = square();
        let t = find_similarity_transform(&s, &s);
        assert_tform_eq(&t, [[1.0, 0.0], [0.0, 1.0]]);
    }

    #[test]
    fn recovers_rotation_and_scale() {
        // Rotate by 90 degrees and scale by 2, then translate.
        let from = square();
        let to = Shape::new(
            from.points
                .iter()
                .map(|p| Point::new(-2.0 * p.y + 5.0, 2.0 * p.x - 3.0))
                .collect(),
        );
        let t = find_similarity_transform(&from, &to);
        assert_tform_eq(&t, [[0.0, -2.0], [2.0, 0.0]]);

        let v = t.apply(Point::new(1.0, 0.0));
        assert!((v.x - 0.0).abs() < 1e-5);
        assert!((v.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn degenerate_shapes_give_identity() {
        let single = Shape::new(vec![Point::new(0.3, 0.3)]);
        let moved = Shape::new(vec![Point::new(0.9, 0.1)]);
        assert_tform_eq(
            &find_tform_between_shapes(&single, &moved),
            [[1.0, 0.0], [0.0, 1.0]],
        );

        let collapsed = Shape::new(vec![Point::new(0.5, 0.5); 3]);
        assert_tform_eq(
            &find_similarity_transform(&collapsed, &square_of(3)),
            [[1.0, 0.0], [0.0, 1.0]],
        );
    }

    fn square_of(n: usize) -> Shape {
        Shape::new(square().points.into_iter().take(n).collect())
    }

    #[test]
    fn feature_pixels_sample_anchors() {
        // Simple 10x10 gradient image
        let img = Array2D::from_fn(10, 10, |x, _y| (x * 25) as u8);

        let rect = Rectangle::new(0, 0, 9, 9);
        let shape = Shape::new(vec![
            Point::new(2.0 / 9.0, 5.0 / 9.0), // landmark 0 at pixel (2, 5)
            Point::new(7.0 / 9.0, 5.0 / 9.0), // landmark 1 at pixel (7, 5)
        ]);

        let mut values = Vec::new();
        extract_feature_pixel_values(
            &img,
            &rect,
            &shape,
            &shape,
            &[0, 1, 0],
            &[Point::zero(), Point::zero(), Point::new(1.0 / 9.0, 0.0)],
            &mut values,
        );

        // pixel at x=2 is 50, x=7 is 175, x=3 is 75
        assert_eq!(values, vec![50.0, 175.0, 75.0]);
    }

    #[test]
    fn feature_pixels_outside_image_read_zero() {
        let img = Array2D::from_fn(4, 4, |_, _| 200u8);
        let rect = Rectangle::new(0, 0, 3, 3);
        let shape = Shape::new(vec![Point::new(0.5, 0.5)]);

        let mut values = vec![1.0; 8];
        extract_feature_pixel_values(
            &img,
            &rect,
            &shape,
            &shape,
            &[0, 0],
            &[Point::new(-2.0, 0.0), Point::zero()],
            &mut values,
        );

        assert_eq!(values, vec![0.0, 200.0]);
    }
}
