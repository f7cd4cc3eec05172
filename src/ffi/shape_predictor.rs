use std::ffi::c_void;
use std::os::raw::c_char;
use std::ptr;

use super::{
    into_handle, path_from_c, set_last_error, ERR_GENERAL_SERIALIZATION,
    ERR_INPUT_ARRAY_TYPE_NOT_SUPPORT, ERR_MATRIX_ELEMENT_TYPE_NOT_SUPPORT, ERR_OK,
};
use crate::detection::FullObjectDetection;
use crate::image::{Array2D, Matrix};
use crate::model::ShapePredictor;
use crate::pixel::PixelIntensity;
use crate::proxy::{Deserializer, ProxyDeserialize};
use crate::types::{DetectionRegion, MmodRect, Rectangle};

/// A fresh, untrained predictor with no parts and no features.
#[no_mangle]
pub extern "C" fn shape_predictor_new() -> *mut ShapePredictor {
    Box::into_raw(Box::new(ShapePredictor::default()))
}

/// Load a predictor from a dlib model file.
///
/// Returns null when the file cannot be read or is not a valid model.
///
/// # Safety
///
/// `file_name` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn deserialize_shape_predictor(file_name: *const c_char) -> *mut ShapePredictor {
    let result = path_from_c(file_name).and_then(ShapePredictor::load);
    into_handle("deserialize_shape_predictor", result)
}

/// Read the next value of an open stream as a predictor.
///
/// # Safety
///
/// `proxy` must be a live handle from `proxy_deserialize_new`.
#[no_mangle]
pub unsafe extern "C" fn deserialize_shape_predictor_proxy(
    proxy: *mut ProxyDeserialize,
) -> *mut ShapePredictor {
    let result = (*proxy).extract::<ShapePredictor>();
    into_handle("deserialize_shape_predictor_proxy", result)
}

/// Write a predictor in dlib's format.
///
/// # Safety
///
/// `predictor` must be a live handle; `file_name` null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn serialize_shape_predictor(
    predictor: *const ShapePredictor,
    file_name: *const c_char,
) -> i32 {
    match path_from_c(file_name).and_then(|path| (*predictor).save(path)) {
        Ok(()) => ERR_OK,
        Err(err) => {
            set_last_error("serialize_shape_predictor", &err);
            ERR_GENERAL_SERIALIZATION
        }
    }
}

unsafe fn predict_array2d<T: PixelIntensity>(
    predictor: &ShapePredictor,
    img: *const c_void,
    region: &dyn DetectionRegion,
) -> *mut FullObjectDetection {
    let image = &*(img as *const Array2D<T>);
    Box::into_raw(Box::new(predictor.predict(image, region)))
}

unsafe fn predict_matrix<T: PixelIntensity>(
    predictor: &ShapePredictor,
    img: *const c_void,
    region: &dyn DetectionRegion,
) -> *mut FullObjectDetection {
    let image = &*(img as *const Matrix<T>);
    Box::into_raw(Box::new(predictor.predict(image, region)))
}

unsafe fn operator_array2d(
    predictor: *const ShapePredictor,
    img_type: i32,
    img: *const c_void,
    region: &dyn DetectionRegion,
    full_obj_det: *mut *mut FullObjectDetection,
) -> i32 {
    *full_obj_det = ptr::null_mut();
    let predictor = &*predictor;

    match dispatch_array2d!(img_type, predict_array2d(predictor, img, region)) {
        Some(det) => {
            *full_obj_det = det;
            ERR_OK
        }
        None => {
            tracing::warn!(img_type, "array2d element type not supported");
            ERR_INPUT_ARRAY_TYPE_NOT_SUPPORT
        }
    }
}

unsafe fn operator_matrix(
    predictor: *const ShapePredictor,
    img_type: i32,
    img: *const c_void,
    region: &dyn DetectionRegion,
    full_obj_det: *mut *mut FullObjectDetection,
) -> i32 {
    *full_obj_det = ptr::null_mut();
    let predictor = &*predictor;

    match dispatch_matrix!(img_type, predict_matrix(predictor, img, region)) {
        Some(det) => {
            *full_obj_det = det;
            ERR_OK
        }
        None => {
            tracing::warn!(img_type, "matrix element type not supported");
            ERR_MATRIX_ELEMENT_TYPE_NOT_SUPPORT
        }
    }
}

/// Predict landmarks on a pixel grid inside a rectangle.
///
/// # Safety
///
/// `predictor` must be a live handle, `img` an `Array2D` whose element type
/// is `img_type`, `rect` a valid rectangle and `full_obj_det` writable.
#[no_mangle]
pub unsafe extern "C" fn shape_predictor_operator(
    predictor: *const ShapePredictor,
    img_type: i32,
    img: *const c_void,
    rect: *const Rectangle,
    full_obj_det: *mut *mut FullObjectDetection,
) -> i32 {
    operator_array2d(predictor, img_type, img, &*rect, full_obj_det)
}

/// Predict landmarks on a matrix inside a rectangle.
///
/// # Safety
///
/// As [`shape_predictor_operator`], with `img` a `Matrix` whose element type
/// is `img_type`.
#[no_mangle]
pub unsafe extern "C" fn shape_predictor_matrix_operator(
    predictor: *const ShapePredictor,
    img_type: i32,
    img: *const c_void,
    rect: *const Rectangle,
    full_obj_det: *mut *mut FullObjectDetection,
) -> i32 {
    operator_matrix(predictor, img_type, img, &*rect, full_obj_det)
}

/// Predict landmarks on a pixel grid inside a detector's rectangle.
///
/// # Safety
///
/// As [`shape_predictor_operator`], with `rect` a valid `MmodRect`.
#[no_mangle]
pub unsafe extern "C" fn shape_predictor_operator_mmod_rect(
    predictor: *const ShapePredictor,
    img_type: i32,
    img: *const c_void,
    rect: *const MmodRect,
    full_obj_det: *mut *mut FullObjectDetection,
) -> i32 {
    operator_array2d(predictor, img_type, img, &*rect, full_obj_det)
}

/// Predict landmarks on a matrix inside a detector's rectangle.
///
/// # Safety
///
/// As [`shape_predictor_matrix_operator`], with `rect` a valid `MmodRect`.
#[no_mangle]
pub unsafe extern "C" fn shape_predictor_matrix_operator_mmod_rect(
    predictor: *const ShapePredictor,
    img_type: i32,
    img: *const c_void,
    rect: *const MmodRect,
    full_obj_det: *mut *mut FullObjectDetection,
) -> i32 {
    operator_matrix(predictor, img_type, img, &*rect, full_obj_det)
}

/// # Safety
///
/// `predictor` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn shape_predictor_num_parts(predictor: *const ShapePredictor) -> u32 {
    (*predictor).num_parts() as u32
}

/// # Safety
///
/// `predictor` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn shape_predictor_num_features(predictor: *const ShapePredictor) -> u32 {
    (*predictor).num_features() as u32
}

/// Release a predictor. Null is ignored.
///
/// # Safety
///
/// `predictor` must be null or a live handle not used afterwards.
#[no_mangle]
pub unsafe extern "C" fn shape_predictor_delete(predictor: *mut ShapePredictor) {
    if !predictor.is_null() {
        drop(Box::from_raw(predictor));
    }
}
