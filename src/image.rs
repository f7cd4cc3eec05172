use crate::error::{Error, Result};
use crate::pixel::PixelIntensity;

/// Trait for reading pixels from an image buffer.
///
/// Implemented by [`Array2D`] and [`Matrix`]; implement it for your own
/// buffer types to predict on them directly.
pub trait ImageAccess {
    type Pixel: PixelIntensity;

    /// Number of columns.
    fn width(&self) -> usize;

    /// Number of rows.
    fn height(&self) -> usize;

    /// Pixel at column `x`, row `y`. Callers stay within bounds.
    fn get_pixel(&self, x: usize, y: usize) -> &Self::Pixel;
}

/// A dense 2-D pixel grid, stored row-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Array2D<T> {
    data: Vec<T>,
    nr: usize,
    nc: usize,
}

impl<T: PixelIntensity> Array2D<T> {
    /// A `nr` x `nc` grid filled with `T::default()`.
    pub fn new(nr: usize, nc: usize) -> Self {
        Self {
            data: vec![T::default(); nr * nc],
            nr,
            nc,
        }
    }

    pub fn from_vec(data: Vec<T>, nr: usize, nc: usize) -> Result<Self> {
        if data.len() != nr * nc {
            return Err(Error::BufferSize {
                expected: nr * nc,
                actual: data.len(),
            });
        }
        Ok(Self { data, nr, nc })
    }

    pub fn from_fn<F>(nr: usize, nc: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> T,
    {
        let mut data = Vec::with_capacity(nr * nc);
        for y in 0..nr {
            for x in 0..nc {
                data.push(f(x, y));
            }
        }
        Self { data, nr, nc }
    }

    pub fn nr(&self) -> usize {
        self.nr
    }

    pub fn nc(&self) -> usize {
        self.nc
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Overwrite every element from a row-major slice of the same length.
    pub fn assign(&mut self, values: &[T]) -> Result<()> {
        if values.len() != self.data.len() {
            return Err(Error::BufferSize {
                expected: self.data.len(),
                actual: values.len(),
            });
        }
        self.data.copy_from_slice(values);
        Ok(())
    }
}

impl<T: PixelIntensity> ImageAccess for Array2D<T> {
    type Pixel = T;

    fn width(&self) -> usize {
        self.nc
    }

    fn height(&self) -> usize {
        self.nr
    }

    #[inline]
    fn get_pixel(&self, x: usize, y: usize) -> &T {
        &self.data[y * self.nc + x]
    }
}

/// A general row-major matrix. Accepts a wider set of element types than
/// the pixel grid at the C boundary but reads the same way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: PixelIntensity> Matrix<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![T::default(); rows * cols],
            rows,
            cols,
        }
    }

    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::BufferSize {
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    pub fn from_fn<F>(rows: usize, cols: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> T,
    {
        let data = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .map(|(r, c)| f(c, r))
            .collect();
        Self { data, rows, cols }
    }

    pub fn nr(&self) -> usize {
        self.rows
    }

    pub fn nc(&self) -> usize {
        self.cols
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn assign(&mut self, values: &[T]) -> Result<()> {
        if values.len() != self.data.len() {
            return Err(Error::BufferSize {
                expected: self.data.len(),
                actual: values.len(),
            });
        }
        self.data.copy_from_slice(values);
        Ok(())
    }
}

impl<T: PixelIntensity> ImageAccess for Matrix<T> {
    type Pixel = T;

    fn width(&self) -> usize {
        self.cols
    }

    fn height(&self) -> usize {
        self.rows
    }

    #[inline]
    fn get_pixel(&self, x: usize, y: usize) -> &T {
        &self.data[y * self.cols + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::RgbPixel;

    #[test]
    fn array2d_access() {
        // 3x3 checkerboard pattern
        let data = vec![
            0u8, 255, 0, //
            255, 0, 255, //
            0, 255, 0, //
        ];
        let img = Array2D::from_vec(data, 3, 3).unwrap();

        assert_eq!(*img.get_pixel(0, 0), 0);
        assert_eq!(*img.get_pixel(1, 0), 255);
        assert_eq!(*img.get_pixel(1, 1), 0);
        assert_eq!(img.width(), 3);
        assert_eq!(img.height(), 3);
    }

    #[test]
    fn from_fn_is_row_major() {
        let img = Array2D::from_fn(2, 3, |x, y| (10 * y + x) as u16);
        assert_eq!(img.as_slice(), &[0, 1, 2, 10, 11, 12]);

        let mat = Matrix::from_fn(2, 3, |x, y| (10 * y + x) as i32);
        assert_eq!(mat.as_slice(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(*mat.get_pixel(2, 1), 12);
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let err = Matrix::<f32>::from_vec(vec![0.0; 5], 2, 3).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferSize {
                expected: 6,
                actual: 5
            }
        ));

        let mut grid = Array2D::<RgbPixel>::new(2, 2);
        assert!(grid.assign(&[RgbPixel::default(); 3]).is_err());
        grid.assign(&[RgbPixel::new(1, 2, 3); 4]).unwrap();
        assert_eq!(*grid.get_pixel(1, 1), RgbPixel::new(1, 2, 3));
    }
}
