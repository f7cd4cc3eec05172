//! Flat C-linkage surface over the shape predictor.
//!
//! Every object crossing the boundary is an opaque pointer produced by
//! `Box::into_raw` and released by the matching `*_delete` export. Image
//! buffers travel as `(tag, void*)` pairs; the tag selects the concrete
//! `Array2D<T>` or `Matrix<T>` the pointer is read as.
//!
//! # Safety
//!
//! Nothing here validates pointers. Callers must pass handles obtained from
//! this library, keep buffers alive for the duration of a call, pass a tag
//! matching the buffer's real element type, and delete each handle exactly
//! once.
//!
//! Failures that are not a status code (a model that cannot be read) return
//! a null handle; [`last_error_message`] then describes the cause.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::fmt::Display;
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

use crate::error::{Error, Result};

pub const ERR_OK: i32 = 0;

const ERR_GENERAL_ERROR: i32 = 0x7600_0000;
pub const ERR_GENERAL_SERIALIZATION: i32 = -(ERR_GENERAL_ERROR | 0x2);
pub const ERR_INDEX_OUT_OF_RANGE: i32 = -(ERR_GENERAL_ERROR | 0x3);

const ERR_ARRAY_TYPE_ERROR: i32 = 0x7A00_0000;
pub const ERR_INPUT_ARRAY_TYPE_NOT_SUPPORT: i32 = -(ERR_ARRAY_TYPE_ERROR | 0x1);

const ERR_MATRIX_ELEMENT_TYPE_ERROR: i32 = 0x7B00_0000;
pub const ERR_MATRIX_ELEMENT_TYPE_NOT_SUPPORT: i32 = -(ERR_MATRIX_ELEMENT_TYPE_ERROR | 0x1);

/// Element type tags for dense pixel grids.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Array2DType {
    UInt8 = 0,
    UInt16,
    UInt32,
    Int8,
    Int16,
    Int32,
    Float,
    Double,
    RgbPixel,
    BgrPixel,
    RgbAlphaPixel,
    HsiPixel,
    LabPixel,
}

impl Array2DType {
    const ALL: [Self; 13] = [
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Float,
        Self::Double,
        Self::RgbPixel,
        Self::BgrPixel,
        Self::RgbAlphaPixel,
        Self::HsiPixel,
        Self::LabPixel,
    ];
}

impl TryFrom<i32> for Array2DType {
    type Error = i32;

    fn try_from(value: i32) -> std::result::Result<Self, i32> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(value)
    }
}

/// Element type tags for generic matrices.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixElementType {
    UInt8 = 0,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    RgbPixel,
    BgrPixel,
    RgbAlphaPixel,
    HsiPixel,
    LabPixel,
}

impl MatrixElementType {
    const ALL: [Self; 15] = [
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float,
        Self::Double,
        Self::RgbPixel,
        Self::BgrPixel,
        Self::RgbAlphaPixel,
        Self::HsiPixel,
        Self::LabPixel,
    ];
}

impl TryFrom<i32> for MatrixElementType {
    type Error = i32;

    fn try_from(value: i32) -> std::result::Result<Self, i32> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(value)
    }
}

/// Call `$func::<T>(args)` with `T` chosen by a dense-grid tag.
///
/// Evaluates to `Some(result)`, or `None` when the tag is not one of the
/// supported grid element types.
macro_rules! dispatch_array2d {
    ($img_type:expr, $func:ident($($arg:expr),* $(,)?)) => {{
        use $crate::ffi::Array2DType;
        use $crate::pixel::{HsiPixel, RgbAlphaPixel, RgbPixel};
        match Array2DType::try_from($img_type) {
            Ok(Array2DType::UInt8) => Some($func::<u8>($($arg),*)),
            Ok(Array2DType::UInt16) => Some($func::<u16>($($arg),*)),
            Ok(Array2DType::Int32) => Some($func::<i32>($($arg),*)),
            Ok(Array2DType::Float) => Some($func::<f32>($($arg),*)),
            Ok(Array2DType::Double) => Some($func::<f64>($($arg),*)),
            Ok(Array2DType::RgbPixel) => Some($func::<RgbPixel>($($arg),*)),
            Ok(Array2DType::HsiPixel) => Some($func::<HsiPixel>($($arg),*)),
            Ok(Array2DType::RgbAlphaPixel) => Some($func::<RgbAlphaPixel>($($arg),*)),
            _ => None,
        }
    }};
}

/// Call `$func::<T>(args)` with `T` chosen by a matrix tag.
macro_rules! dispatch_matrix {
    ($img_type:expr, $func:ident($($arg:expr),* $(,)?)) => {{
        use $crate::ffi::MatrixElementType;
        use $crate::pixel::{HsiPixel, RgbAlphaPixel, RgbPixel};
        match MatrixElementType::try_from($img_type) {
            Ok(MatrixElementType::UInt8) => Some($func::<u8>($($arg),*)),
            Ok(MatrixElementType::UInt16) => Some($func::<u16>($($arg),*)),
            Ok(MatrixElementType::UInt32) => Some($func::<u32>($($arg),*)),
            Ok(MatrixElementType::Int8) => Some($func::<i8>($($arg),*)),
            Ok(MatrixElementType::Int16) => Some($func::<i16>($($arg),*)),
            Ok(MatrixElementType::Int32) => Some($func::<i32>($($arg),*)),
            Ok(MatrixElementType::Float) => Some($func::<f32>($($arg),*)),
            Ok(MatrixElementType::Double) => Some($func::<f64>($($arg),*)),
            Ok(MatrixElementType::RgbPixel) => Some($func::<RgbPixel>($($arg),*)),
            Ok(MatrixElementType::HsiPixel) => Some($func::<HsiPixel>($($arg),*)),
            Ok(MatrixElementType::RgbAlphaPixel) => Some($func::<RgbAlphaPixel>($($arg),*)),
            _ => None,
        }
    }};
}

pub mod buffers;
pub mod detection;
pub mod proxy;
pub mod shape_predictor;

pub use buffers::*;
pub use detection::*;
pub use proxy::*;
pub use shape_predictor::*;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Record a boundary failure for [`last_error_message`] and log it.
pub(crate) fn set_last_error(context: &str, err: &dyn Display) {
    tracing::error!("{}: {}", context, err);
    let message = format!("{}: {}", context, err).replace('\0', " ");
    let message = CString::new(message).ok();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = message);
}

/// Box a successful result, or record the error and return null.
pub(crate) fn into_handle<T>(context: &str, result: Result<T>) -> *mut T {
    match result {
        Ok(value) => Box::into_raw(Box::new(value)),
        Err(err) => {
            set_last_error(context, &err);
            ptr::null_mut()
        }
    }
}

/// Borrow a NUL-terminated path from the caller.
///
/// # Safety
///
/// `file_name` must be null or point to a NUL-terminated string that
/// outlives the returned borrow.
pub(crate) unsafe fn path_from_c<'a>(file_name: *const c_char) -> Result<&'a Path> {
    if file_name.is_null() {
        return Err(Error::InvalidPath("null file name".into()));
    }
    let name = CStr::from_ptr(file_name)
        .to_str()
        .map_err(|e| Error::InvalidPath(e.to_string()))?;
    Ok(Path::new(name))
}

/// Message of the last failed call on this thread, or null.
///
/// The pointer stays valid until the next failure on the same thread.
#[no_mangle]
pub extern "C" fn last_error_message() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ptr::null(), |message| message.as_ptr())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_convert_from_declared_values_only() {
        assert_eq!(Array2DType::try_from(0), Ok(Array2DType::UInt8));
        assert_eq!(Array2DType::try_from(10), Ok(Array2DType::RgbAlphaPixel));
        assert_eq!(Array2DType::try_from(13), Err(13));
        assert_eq!(Array2DType::try_from(-1), Err(-1));

        assert_eq!(MatrixElementType::try_from(12), Ok(MatrixElementType::RgbAlphaPixel));
        assert_eq!(MatrixElementType::try_from(15), Err(15));
        assert_eq!(MatrixElementType::try_from(i32::MAX), Err(i32::MAX));
    }

    #[test]
    fn tag_discriminants_match_table_order() {
        for (i, tag) in Array2DType::ALL.iter().enumerate() {
            assert_eq!(*tag as i32, i as i32);
        }
        for (i, tag) in MatrixElementType::ALL.iter().enumerate() {
            assert_eq!(*tag as i32, i as i32);
        }
    }

    fn element_name<T>() -> &'static str {
        std::any::type_name::<T>()
    }

    #[test]
    fn matrix_tags_select_their_own_element_type() {
        let expected = [
            (MatrixElementType::UInt8, "u8"),
            (MatrixElementType::UInt16, "u16"),
            (MatrixElementType::UInt32, "u32"),
            (MatrixElementType::Int8, "i8"),
            (MatrixElementType::Int16, "i16"),
            (MatrixElementType::Int32, "i32"),
            (MatrixElementType::Float, "f32"),
            (MatrixElementType::Double, "f64"),
            (MatrixElementType::RgbPixel, "::RgbPixel"),
            (MatrixElementType::HsiPixel, "::HsiPixel"),
            (MatrixElementType::RgbAlphaPixel, "::RgbAlphaPixel"),
        ];
        for (tag, name) in expected {
            let selected = dispatch_matrix!(tag as i32, element_name()).unwrap();
            assert!(selected.ends_with(name), "{:?} selected {}", tag, selected);
        }
    }

    #[test]
    fn grid_tags_select_their_own_element_type() {
        let expected = [
            (Array2DType::UInt8, "u8"),
            (Array2DType::UInt16, "u16"),
            (Array2DType::Int32, "i32"),
            (Array2DType::Float, "f32"),
            (Array2DType::Double, "f64"),
            (Array2DType::RgbPixel, "::RgbPixel"),
            (Array2DType::HsiPixel, "::HsiPixel"),
            (Array2DType::RgbAlphaPixel, "::RgbAlphaPixel"),
        ];
        for (tag, name) in expected {
            let selected = dispatch_array2d!(tag as i32, element_name()).unwrap();
            assert!(selected.ends_with(name), "{:?} selected {}", tag, selected);
        }
    }

    #[test]
    fn error_codes_are_distinct_and_negative() {
        let codes = [
            ERR_GENERAL_SERIALIZATION,
            ERR_INDEX_OUT_OF_RANGE,
            ERR_INPUT_ARRAY_TYPE_NOT_SUPPORT,
            ERR_MATRIX_ELEMENT_TYPE_NOT_SUPPORT,
        ];
        for (i, a) in codes.iter().enumerate() {
            assert!(*a < 0);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn last_error_is_per_call_message() {
        set_last_error("loading model", &"file missing");
        let message = unsafe { CStr::from_ptr(last_error_message()) };
        assert_eq!(message.to_str().unwrap(), "loading model: file missing");
    }
}
