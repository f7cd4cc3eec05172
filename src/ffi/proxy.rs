use std::os::raw::c_char;

use super::{into_handle, path_from_c};
use crate::proxy::ProxyDeserialize;

/// Open a stream of serialized values. Returns null on failure.
///
/// # Safety
///
/// `file_name` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn proxy_deserialize_new(file_name: *const c_char) -> *mut ProxyDeserialize {
    let result = path_from_c(file_name).and_then(ProxyDeserialize::open);
    into_handle("proxy_deserialize_new", result)
}

/// Close a stream. Null is ignored.
///
/// # Safety
///
/// `proxy` must be null or a live handle not used afterwards.
#[no_mangle]
pub unsafe extern "C" fn proxy_deserialize_delete(proxy: *mut ProxyDeserialize) {
    if !proxy.is_null() {
        drop(Box::from_raw(proxy));
    }
}
