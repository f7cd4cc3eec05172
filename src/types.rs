use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
///
/// Used for shape-space locations, which live in the normalized coordinate
/// system of the detection rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::AddAssign for Point {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// An integer pixel location, laid out for the C boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImagePoint {
    pub x: i64,
    pub y: i64,
}

impl ImagePoint {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle with inclusive corners.
///
/// A rectangle with `right == left` is one pixel wide; one with
/// `right < left` (or `bottom < top`) is empty.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Rectangle {
    pub const fn new(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The rectangle covering a whole `width` x `height` image.
    pub fn from_size(width: usize, height: usize) -> Self {
        Self::new(0, 0, width as i64 - 1, height as i64 - 1)
    }

    pub fn width(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            (self.right - self.left + 1) as u64
        }
    }

    pub fn height(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            (self.bottom - self.top + 1) as u64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left > self.right || self.top > self.bottom
    }

    pub fn contains(&self, p: ImagePoint) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    /// Map a point from normalized shape space to the nearest pixel.
    ///
    /// (0, 0) lands on the top-left corner and (1, 1) on the bottom-right.
    /// The mapping runs in `f64` so coordinates far from the origin stay
    /// exact; halves round towards positive infinity.
    pub fn unnormalize(&self, p: Point) -> ImagePoint {
        let (left, top) = (self.left as f64, self.top as f64);
        let x = left + p.x as f64 * (self.right as f64 - left);
        let y = top + p.y as f64 * (self.bottom as f64 - top);
        ImagePoint::new((x + 0.5).floor() as i64, (y + 0.5).floor() as i64)
    }
}

/// A rectangle produced by a detector, carrying its detection score.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MmodRect {
    pub rect: Rectangle,
    pub detection_confidence: f64,
    pub ignore: bool,
}

impl MmodRect {
    pub const fn new(rect: Rectangle, detection_confidence: f64, ignore: bool) -> Self {
        Self {
            rect,
            detection_confidence,
            ignore,
        }
    }
}

impl From<Rectangle> for MmodRect {
    fn from(rect: Rectangle) -> Self {
        Self::new(rect, 0.0, false)
    }
}

/// Anything that identifies the window a prediction runs in.
pub trait DetectionRegion {
    fn region(&self) -> Rectangle;
}

impl DetectionRegion for Rectangle {
    fn region(&self) -> Rectangle {
        *self
    }
}

impl DetectionRegion for MmodRect {
    fn region(&self) -> Rectangle {
        self.rect
    }
}

/// A landmark shape in normalized coordinates.
///
/// Stored as points; the on-disk form is the flat column
/// `[x0, y0, x1, y1, ...]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub points: Vec<Point>,
}

impl Shape {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn num_landmarks(&self) -> usize {
        self.points.len()
    }

    /// Create a zeroed shape with n landmarks.
    pub fn zeros(n: usize) -> Self {
        Self {
            points: vec![Point::zero(); n],
        }
    }

    /// Add another shape's deltas to this shape.
    pub fn add_delta(&mut self, delta: &Shape) {
        debug_assert_eq!(self.points.len(), delta.points.len());
        for (p, d) in self.points.iter_mut().zip(delta.points.iter()) {
            *p += *d;
        }
    }

    /// Flatten shape to a vector of [x0, y0, x1, y1, ...] coordinates.
    pub fn to_flat_vec(&self) -> Vec<f32> {
        let mut v = Vec::with_capacity(self.points.len() * 2);
        for p in &self.points {
            v.push(p.x);
            v.push(p.y);
        }
        v
    }

    /// Create shape from a flat vector of [x0, y0, x1, y1, ...] coordinates.
    pub fn from_flat_vec(v: &[f32]) -> Self {
        debug_assert!(v.len() % 2 == 0);
        let points: Vec<Point> = v
            .chunks_exact(2)
            .map(|chunk| Point::new(chunk[0], chunk[1]))
            .collect();
        Self { points }
    }
}

impl std::ops::Index<usize> for Shape {
    type Output = Point;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.points[idx]
    }
}

impl std::ops::IndexMut<usize> for Shape {
    fn index_mut(&mut self, idx: usize) -> &mut Self::Output {
        &mut self.points[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, 4.0);

        let sum = a + b;
        assert_eq!(sum.x, 4.0);
        assert_eq!(sum.y, 6.0);

        let diff = b - a;
        assert_eq!(diff.x, 2.0);
        assert_eq!(diff.y, 2.0);

        let scaled = a * 2.0;
        assert_eq!(scaled.x, 2.0);
        assert_eq!(scaled.y, 4.0);
    }

    #[test]
    fn rectangle_geometry() {
        let rect = Rectangle::new(10, 20, 59, 119);
        assert_eq!(rect.width(), 50);
        assert_eq!(rect.height(), 100);
        assert!(!rect.is_empty());

        assert!(rect.contains(ImagePoint::new(10, 20)));
        assert!(rect.contains(ImagePoint::new(59, 119)));
        assert!(!rect.contains(ImagePoint::new(60, 119)));

        let empty = Rectangle::new(5, 5, 4, 10);
        assert!(empty.is_empty());
        assert_eq!(empty.width(), 0);

        assert_eq!(Rectangle::from_size(640, 480), Rectangle::new(0, 0, 639, 479));
    }

    #[test]
    fn rectangle_unnormalization() {
        let rect = Rectangle::new(100, 100, 300, 300);

        assert_eq!(rect.unnormalize(Point::new(0.5, 0.5)), ImagePoint::new(200, 200));
        assert_eq!(rect.unnormalize(Point::new(1.0, 1.0)), ImagePoint::new(300, 300));
        assert_eq!(rect.unnormalize(Point::new(0.0, 0.0)), ImagePoint::new(100, 100));

        let small = Rectangle::new(0, 0, 99, 99);
        assert_eq!(small.unnormalize(Point::new(0.25, 0.5)), ImagePoint::new(25, 50));
        assert_eq!(small.unnormalize(Point::new(-0.004, -0.006)), ImagePoint::new(0, -1));
    }

    #[test]
    fn unnormalize_is_exact_far_from_origin() {
        let left = (1i64 << 24) + 1;
        let rect = Rectangle::new(left, left, left + 100, left + 100);
        assert_eq!(rect.unnormalize(Point::zero()), ImagePoint::new(left, left));
        assert_eq!(
            rect.unnormalize(Point::new(0.5, 1.0)),
            ImagePoint::new(left + 50, left + 100)
        );

        // Spans wider than i64 do not overflow.
        let huge = Rectangle::new(i64::MIN, i64::MIN, i64::MAX, i64::MAX);
        let p = huge.unnormalize(Point::new(0.0, 1.0));
        assert_eq!(p.x, i64::MIN);
        assert_eq!(p.y, i64::MAX);
    }

    #[test]
    fn mmod_rect_region() {
        let rect = Rectangle::new(1, 2, 3, 4);
        let scored = MmodRect::new(rect, 0.9, false);
        assert_eq!(scored.region(), rect);
        assert!(!scored.ignore);
    }

    #[test]
    fn shape_delta() {
        let mut shape = Shape::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        let delta = Shape::new(vec![Point::new(0.1, 0.2), Point::new(0.3, 0.4)]);
        shape.add_delta(&delta);

        assert!((shape[0].x - 0.1).abs() < 1e-6);
        assert!((shape[0].y - 0.2).abs() < 1e-6);
        assert!((shape[1].x - 1.3).abs() < 1e-6);
        assert!((shape[1].y - 1.4).abs() < 1e-6);
    }

    #[test]
    fn shape_flat_layout() {
        let shape = Shape::from_flat_vec(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(shape.num_landmarks(), 2);
        assert_eq!(shape[1], Point::new(3.0, 4.0));
        assert_eq!(shape.to_flat_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }
}
