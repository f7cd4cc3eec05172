//! Caller-visible image buffers.
//!
//! A buffer handle is a `Box<Array2D<T>>` or `Box<Matrix<T>>` erased to
//! `void*`; every call carries the element tag so the box can be rebuilt with
//! its real type. Pixel data is copied in row-major order from a caller array
//! of `rows * cols` elements of that type.

use std::ffi::c_void;
use std::ptr;
use std::slice;

use super::{
    set_last_error, ERR_GENERAL_SERIALIZATION, ERR_INPUT_ARRAY_TYPE_NOT_SUPPORT,
    ERR_MATRIX_ELEMENT_TYPE_NOT_SUPPORT, ERR_OK,
};
use crate::error::Result;
use crate::image::{Array2D, Matrix};
use crate::pixel::PixelIntensity;

fn new_array2d<T: PixelIntensity>(rows: usize, cols: usize) -> *mut c_void {
    Box::into_raw(Box::new(Array2D::<T>::new(rows, cols))) as *mut c_void
}

fn new_matrix<T: PixelIntensity>(rows: usize, cols: usize) -> *mut c_void {
    Box::into_raw(Box::new(Matrix::<T>::new(rows, cols))) as *mut c_void
}

unsafe fn assign_array2d<T: PixelIntensity>(array: *mut c_void, data: *const c_void) -> Result<()> {
    let array = &mut *(array as *mut Array2D<T>);
    let values = slice::from_raw_parts(data as *const T, array.nr() * array.nc());
    array.assign(values)
}

unsafe fn assign_matrix<T: PixelIntensity>(matrix: *mut c_void, data: *const c_void) -> Result<()> {
    let matrix = &mut *(matrix as *mut Matrix<T>);
    let values = slice::from_raw_parts(data as *const T, matrix.size());
    matrix.assign(values)
}

unsafe fn delete_array2d<T: PixelIntensity>(array: *mut c_void) {
    drop(Box::from_raw(array as *mut Array2D<T>));
}

unsafe fn delete_matrix<T: PixelIntensity>(matrix: *mut c_void) {
    drop(Box::from_raw(matrix as *mut Matrix<T>));
}

unsafe fn array2d_dims<T: PixelIntensity>(array: *const c_void) -> (usize, usize) {
    let array = &*(array as *const Array2D<T>);
    (array.nr(), array.nc())
}

unsafe fn matrix_dims<T: PixelIntensity>(matrix: *const c_void) -> (usize, usize) {
    let matrix = &*(matrix as *const Matrix<T>);
    (matrix.nr(), matrix.nc())
}

/// Write one dimension of a dispatched buffer to `out`.
unsafe fn dims_status(
    dims: Option<(usize, usize)>,
    select: fn((usize, usize)) -> usize,
    out: *mut i32,
    not_supported: i32,
) -> i32 {
    match dims {
        Some(dims) => {
            *out = select(dims) as i32;
            ERR_OK
        }
        None => not_supported,
    }
}

fn assign_status(context: &str, result: Option<Result<()>>, not_supported: i32) -> i32 {
    match result {
        Some(Ok(())) => ERR_OK,
        Some(Err(err)) => {
            set_last_error(context, &err);
            ERR_GENERAL_SERIALIZATION
        }
        None => not_supported,
    }
}

/// Allocate a zeroed `rows` x `cols` pixel grid of the tagged element type.
///
/// # Safety
///
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn array2d_new1(
    img_type: i32,
    rows: u32,
    cols: u32,
    out: *mut *mut c_void,
) -> i32 {
    *out = ptr::null_mut();
    match dispatch_array2d!(img_type, new_array2d(rows as usize, cols as usize)) {
        Some(array) => {
            *out = array;
            ERR_OK
        }
        None => ERR_INPUT_ARRAY_TYPE_NOT_SUPPORT,
    }
}

/// Copy `rows * cols` elements from `data` into a grid.
///
/// # Safety
///
/// `array` must come from [`array2d_new1`] with the same tag and `data` must
/// hold `rows * cols` elements of that type.
#[no_mangle]
pub unsafe extern "C" fn array2d_assign(img_type: i32, array: *mut c_void, data: *const c_void) -> i32 {
    let result = dispatch_array2d!(img_type, assign_array2d(array, data));
    assign_status("array2d_assign", result, ERR_INPUT_ARRAY_TYPE_NOT_SUPPORT)
}

/// Number of rows of a grid.
///
/// # Safety
///
/// `array` must come from [`array2d_new1`] with the same tag and `out` must
/// be writable.
#[no_mangle]
pub unsafe extern "C" fn array2d_nr(img_type: i32, array: *const c_void, out: *mut i32) -> i32 {
    let dims = dispatch_array2d!(img_type, array2d_dims(array));
    dims_status(dims, |(nr, _)| nr, out, ERR_INPUT_ARRAY_TYPE_NOT_SUPPORT)
}

/// Number of columns of a grid.
///
/// # Safety
///
/// As [`array2d_nr`].
#[no_mangle]
pub unsafe extern "C" fn array2d_nc(img_type: i32, array: *const c_void, out: *mut i32) -> i32 {
    let dims = dispatch_array2d!(img_type, array2d_dims(array));
    dims_status(dims, |(_, nc)| nc, out, ERR_INPUT_ARRAY_TYPE_NOT_SUPPORT)
}

/// Number of elements of a grid.
///
/// # Safety
///
/// As [`array2d_nr`].
#[no_mangle]
pub unsafe extern "C" fn array2d_size(img_type: i32, array: *const c_void, out: *mut i32) -> i32 {
    let dims = dispatch_array2d!(img_type, array2d_dims(array));
    dims_status(dims, |(nr, nc)| nr * nc, out, ERR_INPUT_ARRAY_TYPE_NOT_SUPPORT)
}

/// Release a grid. Null and unknown tags are ignored.
///
/// # Safety
///
/// `array` must be null or come from [`array2d_new1`] with the same tag.
#[no_mangle]
pub unsafe extern "C" fn array2d_delete(img_type: i32, array: *mut c_void) {
    if array.is_null() {
        return;
    }
    if dispatch_array2d!(img_type, delete_array2d(array)).is_none() {
        tracing::warn!(img_type, "array2d_delete with unsupported element type");
    }
}

/// Allocate a zeroed `rows` x `cols` matrix of the tagged element type.
///
/// # Safety
///
/// `out` must be writable.
#[no_mangle]
pub unsafe extern "C" fn matrix_new1(
    element_type: i32,
    rows: u32,
    cols: u32,
    out: *mut *mut c_void,
) -> i32 {
    *out = ptr::null_mut();
    match dispatch_matrix!(element_type, new_matrix(rows as usize, cols as usize)) {
        Some(matrix) => {
            *out = matrix;
            ERR_OK
        }
        None => ERR_MATRIX_ELEMENT_TYPE_NOT_SUPPORT,
    }
}

/// Copy `rows * cols` elements from `data` into a matrix.
///
/// # Safety
///
/// `matrix` must come from [`matrix_new1`] with the same tag and `data` must
/// hold `rows * cols` elements of that type.
#[no_mangle]
pub unsafe extern "C" fn matrix_assign(element_type: i32, matrix: *mut c_void, data: *const c_void) -> i32 {
    let result = dispatch_matrix!(element_type, assign_matrix(matrix, data));
    assign_status("matrix_assign", result, ERR_MATRIX_ELEMENT_TYPE_NOT_SUPPORT)
}

/// Number of rows of a matrix.
///
/// # Safety
///
/// `matrix` must come from [`matrix_new1`] with the same tag and `out` must
/// be writable.
#[no_mangle]
pub unsafe extern "C" fn matrix_nr(element_type: i32, matrix: *const c_void, out: *mut i32) -> i32 {
    let dims = dispatch_matrix!(element_type, matrix_dims(matrix));
    dims_status(dims, |(nr, _)| nr, out, ERR_MATRIX_ELEMENT_TYPE_NOT_SUPPORT)
}

/// Number of columns of a matrix.
///
/// # Safety
///
/// As [`matrix_nr`].
#[no_mangle]
pub unsafe extern "C" fn matrix_nc(element_type: i32, matrix: *const c_void, out: *mut i32) -> i32 {
    let dims = dispatch_matrix!(element_type, matrix_dims(matrix));
    dims_status(dims, |(_, nc)| nc, out, ERR_MATRIX_ELEMENT_TYPE_NOT_SUPPORT)
}

/// Number of elements of a matrix.
///
/// # Safety
///
/// As [`matrix_nr`].
#[no_mangle]
pub unsafe extern "C" fn matrix_size(element_type: i32, matrix: *const c_void, out: *mut i32) -> i32 {
    let dims = dispatch_matrix!(element_type, matrix_dims(matrix));
    dims_status(dims, |(nr, nc)| nr * nc, out, ERR_MATRIX_ELEMENT_TYPE_NOT_SUPPORT)
}

/// Release a matrix. Null and unknown tags are ignored.
///
/// # Safety
///
/// `matrix` must be null or come from [`matrix_new1`] with the same tag.
#[no_mangle]
pub unsafe extern "C" fn matrix_delete(element_type: i32, matrix: *mut c_void) {
    if matrix.is_null() {
        return;
    }
    if dispatch_matrix!(element_type, delete_matrix(matrix)).is_none() {
        tracing::warn!(element_type, "matrix_delete with unsupported element type");
    }
}
