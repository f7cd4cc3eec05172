//! Streaming deserialization of several values from one source.
//!
//! A [`ProxyDeserialize`] owns an open stream and hands out the next
//! serialized value each time [`Deserializer::extract`] is called, so one
//! file can carry a shape predictor alongside other objects.

use std::io::Read;
use std::path::Path;

use crate::dlib::{open_model_reader, DlibDeserialize, DlibReader};
use crate::error::Result;

/// Anything that can produce the next serialized value of a stream.
pub trait Deserializer {
    fn extract<T: DlibDeserialize>(&mut self) -> Result<T>;
}

impl<R: Read> Deserializer for DlibReader<R> {
    fn extract<T: DlibDeserialize>(&mut self) -> Result<T> {
        T::deserialize(self)
    }
}

/// A caller-owned, open stream of dlib-serialized values.
pub struct ProxyDeserialize {
    reader: DlibReader<Box<dyn Read + Send>>,
    extracted: usize,
}

impl ProxyDeserialize {
    /// Open a file (bzip2-compressed when it ends in `.bz2`).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Opening deserialization proxy on {}", path.display());
        Ok(Self::from_boxed(open_model_reader(path)?))
    }

    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self::from_boxed(Box::new(reader))
    }

    fn from_boxed(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader: DlibReader::new(reader),
            extracted: 0,
        }
    }

    /// Number of values successfully read so far.
    pub fn extracted(&self) -> usize {
        self.extracted
    }
}

impl Deserializer for ProxyDeserialize {
    fn extract<T: DlibDeserialize>(&mut self) -> Result<T> {
        let value = self.reader.extract()?;
        self.extracted += 1;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dlib::{DlibSerialize, DlibWriter};
    use crate::error::Error;
    use crate::model::ShapePredictor;
    use crate::tree::RegressionTree;
    use crate::types::{Point, Shape};
    use std::io::Cursor;

    fn one_point_model(x: f32) -> ShapePredictor {
        ShapePredictor::new(
            Shape::new(vec![Point::new(x, 0.5)]),
            vec![vec![RegressionTree::leaf(Shape::zeros(1))]],
            vec![vec![0]],
            vec![vec![Point::zero()]],
        )
        .unwrap()
    }

    #[test]
    fn extracts_values_in_sequence() {
        let mut data = Vec::new();
        {
            let mut w = DlibWriter::new(&mut data);
            one_point_model(0.25).serialize(&mut w).unwrap();
            vec![7usize, 8, 9].serialize(&mut w).unwrap();
            one_point_model(0.75).serialize(&mut w).unwrap();
        }

        let mut proxy = ProxyDeserialize::from_reader(Cursor::new(data));
        let first: ShapePredictor = proxy.extract().unwrap();
        let numbers: Vec<usize> = proxy.extract().unwrap();
        let second: ShapePredictor = proxy.extract().unwrap();

        assert_eq!(first, one_point_model(0.25));
        assert_eq!(numbers, vec![7, 8, 9]);
        assert_eq!(second, one_point_model(0.75));
        assert_eq!(proxy.extracted(), 3);

        // Stream exhausted.
        assert!(matches!(proxy.extract::<ShapePredictor>(), Err(Error::Io(_))));
        assert_eq!(proxy.extracted(), 3);
    }

    #[test]
    fn open_missing_file_fails() {
        let result = ProxyDeserialize::open("/nonexistent/shape_predictor.dat");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
