//! Reader and writer for dlib's serialization format.
//!
//! This module provides a pure Rust implementation of the subset of dlib's
//! binary format that a `shape_predictor` uses, for both raw `.dat` files and
//! bzip2-compressed `.dat.bz2` files. Models written here load in dlib and
//! vice versa.
//!
//! # Example
//!
//! ```ignore
//! use shape_predictor_bridge::dlib::load_dlib_model;
//!
//! // Load compressed model directly
//! let model = load_dlib_model("shape_predictor_68_face_landmarks.dat.bz2")?;
//!
//! // Or uncompressed
//! let model = load_dlib_model("shape_predictor_68_face_landmarks.dat")?;
//! ```
//!
//! # Obtaining Models
//!
//! Pre-trained models are available from the dlib-models repository:
//!
//! ```bash
//! git clone --depth 1 git@github.com:davisking/dlib-models.git
//! ```
//!
//! Common models:
//! - `shape_predictor_5_face_landmarks.dat.bz2` - 5-point model (eyes + nose)
//! - `shape_predictor_68_face_landmarks.dat.bz2` - Full 68-point model

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression;

use crate::error::{Error, Result};
use crate::model::ShapePredictor;
use crate::tree::{RegressionTree, SplitFeature};
use crate::types::{Point, Shape};

/// Exponent markers for non-finite floats.
const IS_INF: i64 = 32000;
const IS_NINF: i64 = 32001;
const IS_NAN: i64 = 32002;

/// Mantissa bits kept when writing an `f32`.
const F32_DIGITS: i32 = f32::MANTISSA_DIGITS as i32;

/// Upper bound on speculative allocation while reading sequence lengths.
const MAX_PREALLOC: usize = 4096;

/// Reader wrapper for parsing dlib's binary format.
///
/// dlib uses a variable-length integer encoding:
/// - Control byte: high bit = sign (1 = negative), low 4 bits = number of bytes following
/// - Value bytes: little-endian magnitude
///
/// Floats are stored as (mantissa, exponent) integer pairs, reconstructed via ldexp.
pub struct DlibReader<R: Read> {
    reader: R,
}

impl<R: Read> DlibReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.reader.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Decode a variable-length integer.
    pub fn read_int(&mut self) -> Result<i64> {
        let control = self.read_byte()?;
        let is_negative = (control & 0x80) != 0;
        let num_bytes = (control & 0x0F) as usize;

        if num_bytes > 8 {
            return Err(Error::InvalidModel(format!(
                "Integer encoded with {} bytes",
                num_bytes
            )));
        }

        let mut val: u64 = 0;
        for i in 0..num_bytes {
            let byte = self.read_byte()? as u64;
            val |= byte << (8 * i);
        }

        let signed_val = val as i64;
        Ok(if is_negative { signed_val.wrapping_neg() } else { signed_val })
    }

    /// Read an unsigned long.
    pub fn read_ulong(&mut self) -> Result<u64> {
        let val = self.read_int()?;
        if val < 0 {
            return Err(Error::InvalidModel(format!(
                "Expected unsigned value, got {}",
                val
            )));
        }
        Ok(val as u64)
    }

    /// Decode a float stored as (mantissa, exponent) pair.
    pub fn read_float(&mut self) -> Result<f64> {
        let mantissa = self.read_int()?;
        let exponent = self.read_int()?;

        Ok(match exponent {
            e if e < IS_INF => {
                if mantissa == 0 {
                    0.0
                } else {
                    (mantissa as f64) * 2.0_f64.powi(e as i32)
                }
            }
            IS_INF => f64::INFINITY,
            IS_NINF => f64::NEG_INFINITY,
            _ => f64::NAN,
        })
    }

    /// Read a float matrix stored as (-rows, -cols, data...).
    pub fn read_float_matrix(&mut self) -> Result<(usize, usize, Vec<f32>)> {
        // Older writers stored positive dimensions.
        let rows = self.read_int()?.unsigned_abs() as usize;
        let cols = self.read_int()?.unsigned_abs() as usize;

        let len = rows
            .checked_mul(cols)
            .ok_or_else(|| Error::InvalidModel(format!("Matrix too large: {}x{}", rows, cols)))?;

        let mut data = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            data.push(self.read_float()? as f32);
        }

        Ok((rows, cols, data))
    }
}

/// Writer producing dlib's binary format.
pub struct DlibWriter<W: Write> {
    writer: W,
}

impl<W: Write> DlibWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Encode an integer with the fewest magnitude bytes (at least one).
    pub fn write_int(&mut self, val: i64) -> Result<()> {
        let neg = if val < 0 { 0x80u8 } else { 0 };
        let mut magnitude = val.unsigned_abs();

        let mut buf = [0u8; 9];
        let mut size = 8usize;
        for (i, slot) in buf.iter_mut().enumerate().skip(1) {
            *slot = (magnitude & 0xFF) as u8;
            magnitude >>= 8;
            if magnitude == 0 {
                size = i;
                break;
            }
        }
        buf[0] = size as u8 | neg;

        self.writer.write_all(&buf[..=size])?;
        Ok(())
    }

    pub fn write_ulong(&mut self, val: u64) -> Result<()> {
        let val = i64::try_from(val)
            .map_err(|_| Error::InvalidModel(format!("Value {} too large to encode", val)))?;
        self.write_int(val)
    }

    pub fn write_float(&mut self, val: f32) -> Result<()> {
        let (mantissa, exponent) = if val.is_nan() {
            (0, IS_NAN)
        } else if val == f32::INFINITY {
            (0, IS_INF)
        } else if val == f32::NEG_INFINITY {
            (0, IS_NINF)
        } else {
            let (m, e) = frexp(val as f64);
            let mut mantissa = (m * 2.0_f64.powi(F32_DIGITS)) as i64;
            let mut exponent = (e - F32_DIGITS) as i64;
            // Strip whole zero bytes to keep the encoding short.
            while mantissa != 0 && (mantissa & 0xFF) == 0 {
                mantissa >>= 8;
                exponent += 8;
            }
            (mantissa, exponent)
        };

        self.write_int(mantissa)?;
        self.write_int(exponent)
    }

    pub fn write_float_matrix(&mut self, rows: usize, cols: usize, data: &[f32]) -> Result<()> {
        debug_assert_eq!(rows * cols, data.len());
        self.write_int(-(rows as i64))?;
        self.write_int(-(cols as i64))?;
        for &v in data {
            self.write_float(v)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Split a finite float into `m * 2^e` with `0.5 <= |m| < 1`.
fn frexp(val: f64) -> (f64, i32) {
    if val == 0.0 || !val.is_finite() {
        return (val, 0);
    }
    let bits = val.to_bits();
    let biased = ((bits >> 52) & 0x7FF) as i32;
    if biased == 0 {
        // Subnormal: scale into the normal range first.
        let (m, e) = frexp(val * 2.0_f64.powi(64));
        return (m, e - 64);
    }
    let mantissa_bits = (bits & !(0x7FF_u64 << 52)) | (1022_u64 << 52);
    (f64::from_bits(mantissa_bits), biased - 1022)
}

/// A value that can be read from a dlib stream.
pub trait DlibDeserialize: Sized {
    fn deserialize<R: Read>(reader: &mut DlibReader<R>) -> Result<Self>;
}

/// A value that can be written to a dlib stream.
pub trait DlibSerialize {
    fn serialize<W: Write>(&self, writer: &mut DlibWriter<W>) -> Result<()>;
}

impl DlibDeserialize for usize {
    fn deserialize<R: Read>(reader: &mut DlibReader<R>) -> Result<Self> {
        let val = reader.read_ulong()?;
        usize::try_from(val).map_err(|_| Error::InvalidModel(format!("Index {} out of range", val)))
    }
}

impl DlibSerialize for usize {
    fn serialize<W: Write>(&self, writer: &mut DlibWriter<W>) -> Result<()> {
        writer.write_ulong(*self as u64)
    }
}

impl DlibDeserialize for f32 {
    fn deserialize<R: Read>(reader: &mut DlibReader<R>) -> Result<Self> {
        Ok(reader.read_float()? as f32)
    }
}

impl DlibSerialize for f32 {
    fn serialize<W: Write>(&self, writer: &mut DlibWriter<W>) -> Result<()> {
        writer.write_float(*self)
    }
}

/// `dlib::vector<float,2>`: x then y.
impl DlibDeserialize for Point {
    fn deserialize<R: Read>(reader: &mut DlibReader<R>) -> Result<Self> {
        let x = f32::deserialize(reader)?;
        let y = f32::deserialize(reader)?;
        Ok(Point::new(x, y))
    }
}

impl DlibSerialize for Point {
    fn serialize<W: Write>(&self, writer: &mut DlibWriter<W>) -> Result<()> {
        writer.write_float(self.x)?;
        writer.write_float(self.y)
    }
}

/// `std::vector<T>`: length then elements.
impl<T: DlibDeserialize> DlibDeserialize for Vec<T> {
    fn deserialize<R: Read>(reader: &mut DlibReader<R>) -> Result<Self> {
        let len = usize::deserialize(reader)?;
        let mut items = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            items.push(T::deserialize(reader)?);
        }
        Ok(items)
    }
}

impl<T: DlibSerialize> DlibSerialize for [T] {
    fn serialize<W: Write>(&self, writer: &mut DlibWriter<W>) -> Result<()> {
        writer.write_ulong(self.len() as u64)?;
        for item in self {
            item.serialize(writer)?;
        }
        Ok(())
    }
}

impl<T: DlibSerialize> DlibSerialize for Vec<T> {
    fn serialize<W: Write>(&self, writer: &mut DlibWriter<W>) -> Result<()> {
        self.as_slice().serialize(writer)
    }
}

/// `matrix<float,0,1>`: a column of interleaved x, y coordinates.
impl DlibDeserialize for Shape {
    fn deserialize<R: Read>(reader: &mut DlibReader<R>) -> Result<Self> {
        let (rows, cols, data) = reader.read_float_matrix()?;
        if data.is_empty() {
            return Ok(Shape::default());
        }
        if cols != 1 || rows % 2 != 0 {
            return Err(Error::InvalidModel(format!(
                "Invalid shape dimensions: {}x{}",
                rows, cols
            )));
        }
        Ok(Shape::from_flat_vec(&data))
    }
}

impl DlibSerialize for Shape {
    fn serialize<W: Write>(&self, writer: &mut DlibWriter<W>) -> Result<()> {
        let data = self.to_flat_vec();
        writer.write_float_matrix(data.len(), 1, &data)
    }
}

impl DlibDeserialize for SplitFeature {
    fn deserialize<R: Read>(reader: &mut DlibReader<R>) -> Result<Self> {
        Ok(SplitFeature {
            idx1: usize::deserialize(reader)?,
            idx2: usize::deserialize(reader)?,
            thresh: f32::deserialize(reader)?,
        })
    }
}

impl DlibSerialize for SplitFeature {
    fn serialize<W: Write>(&self, writer: &mut DlibWriter<W>) -> Result<()> {
        self.idx1.serialize(writer)?;
        self.idx2.serialize(writer)?;
        self.thresh.serialize(writer)
    }
}

impl DlibDeserialize for RegressionTree {
    fn deserialize<R: Read>(reader: &mut DlibReader<R>) -> Result<Self> {
        let splits = Vec::<SplitFeature>::deserialize(reader)?;
        let leaf_values = Vec::<Shape>::deserialize(reader)?;
        Ok(RegressionTree::new(splits, leaf_values))
    }
}

impl DlibSerialize for RegressionTree {
    fn serialize<W: Write>(&self, writer: &mut DlibWriter<W>) -> Result<()> {
        self.splits.serialize(writer)?;
        self.leaf_values.serialize(writer)
    }
}

/// Layout: version (1), initial shape, forests, anchor indices, deltas.
impl DlibDeserialize for ShapePredictor {
    fn deserialize<R: Read>(reader: &mut DlibReader<R>) -> Result<Self> {
        let version = reader.read_int()?;
        if version != 1 {
            return Err(Error::UnsupportedVersion(version));
        }

        let initial_shape = Shape::deserialize(reader)?;
        let forests = Vec::<Vec<RegressionTree>>::deserialize(reader)?;
        let anchor_idx = Vec::<Vec<usize>>::deserialize(reader)?;
        let deltas = Vec::<Vec<Point>>::deserialize(reader)?;

        ShapePredictor::new(initial_shape, forests, anchor_idx, deltas)
    }
}

impl DlibSerialize for ShapePredictor {
    fn serialize<W: Write>(&self, writer: &mut DlibWriter<W>) -> Result<()> {
        writer.write_int(1)?;
        self.initial_shape().serialize(writer)?;
        self.forests().serialize(writer)?;
        self.anchor_idx().serialize(writer)?;
        self.deltas().serialize(writer)
    }
}

fn is_bz2(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bz2")
}

/// Open a model file for reading, decompressing `.bz2` transparently.
pub fn open_model_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn Read + Send>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    if is_bz2(path) {
        Ok(Box::new(BzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Load a dlib shape_predictor from a .dat or .dat.bz2 file.
pub fn load_dlib_model<P: AsRef<Path>>(path: P) -> Result<ShapePredictor> {
    let path = path.as_ref();
    tracing::debug!("Loading shape predictor from {}", path.display());

    let model = load_dlib_model_from_reader(open_model_reader(path)?)?;

    tracing::debug!(
        parts = model.num_parts(),
        features = model.num_features(),
        cascades = model.num_cascade_stages(),
        "Shape predictor loaded"
    );
    Ok(model)
}

/// Load a dlib model from an already-opened reader.
pub fn load_dlib_model_from_reader<R: Read>(reader: R) -> Result<ShapePredictor> {
    let mut r = DlibReader::new(reader);
    ShapePredictor::deserialize(&mut r)
}

/// Save a shape_predictor, bzip2-compressed when the path ends in `.bz2`.
pub fn save_dlib_model<P: AsRef<Path>>(model: &ShapePredictor, path: P) -> Result<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(File::create(path)?);

    if is_bz2(path) {
        let mut w = DlibWriter::new(BzEncoder::new(writer, Compression::default()));
        model.serialize(&mut w)?;
        w.into_inner().finish()?.flush()?;
    } else {
        let mut w = DlibWriter::new(writer);
        model.serialize(&mut w)?;
        w.flush()?;
    }

    tracing::debug!("Shape predictor saved to {}", path.display());
    Ok(())
}
