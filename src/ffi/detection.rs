use super::{ERR_INDEX_OUT_OF_RANGE, ERR_OK};
use crate::detection::FullObjectDetection;
use crate::types::{ImagePoint, Rectangle};

/// # Safety
///
/// `det` must be a live detection handle.
#[no_mangle]
pub unsafe extern "C" fn full_object_detection_num_parts(det: *const FullObjectDetection) -> u32 {
    (*det).num_parts() as u32
}

/// Copy part `index` into `out_point`.
///
/// # Safety
///
/// `det` must be a live detection handle and `out_point` writable.
#[no_mangle]
pub unsafe extern "C" fn full_object_detection_part(
    det: *const FullObjectDetection,
    index: u32,
    out_point: *mut ImagePoint,
) -> i32 {
    match (*det).part(index as usize) {
        Some(point) => {
            *out_point = point;
            ERR_OK
        }
        None => ERR_INDEX_OUT_OF_RANGE,
    }
}

/// # Safety
///
/// `det` must be a live detection handle and `out_rect` writable.
#[no_mangle]
pub unsafe extern "C" fn full_object_detection_get_rect(
    det: *const FullObjectDetection,
    out_rect: *mut Rectangle,
) {
    *out_rect = (*det).rect();
}

/// Release a detection. Null is ignored.
///
/// # Safety
///
/// `det` must be null or a live handle not used afterwards.
#[no_mangle]
pub unsafe extern "C" fn full_object_detection_delete(det: *mut FullObjectDetection) {
    if !det.is_null() {
        drop(Box::from_raw(det));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_parts_and_rect() {
        let det = Box::into_raw(Box::new(FullObjectDetection::new(
            Rectangle::new(5, 6, 50, 60),
            vec![ImagePoint::new(10, 20), ImagePoint::new(30, 40)],
        )));

        unsafe {
            assert_eq!(full_object_detection_num_parts(det), 2);

            let mut point = ImagePoint::default();
            assert_eq!(full_object_detection_part(det, 1, &mut point), ERR_OK);
            assert_eq!(point, ImagePoint::new(30, 40));

            assert_eq!(full_object_detection_part(det, 2, &mut point), ERR_INDEX_OUT_OF_RANGE);
            assert_eq!(point, ImagePoint::new(30, 40));

            let mut rect = Rectangle::default();
            full_object_detection_get_rect(det, &mut rect);
            assert_eq!(rect, Rectangle::new(5, 6, 50, 60));

            full_object_detection_delete(det);
            full_object_detection_delete(std::ptr::null_mut());
        }
    }
}
