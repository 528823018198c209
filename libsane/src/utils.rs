use bstr::{BStr, ByteSlice};
use std::ffi::{c_char, CStr};

pub unsafe fn cstr2bstr<'a>(str: *const c_char) -> Option<&'a BStr> {
    str.as_ref()
        .map(|cstr| CStr::from_ptr(cstr).to_bytes().into())
}

/// Lossy owned copy of a C string, empty for null.
pub unsafe fn cstr2string(str: *const c_char) -> String {
    cstr2bstr(str)
        .map(|bstr| bstr.to_str_lossy().into_owned())
        .unwrap_or_default()
}

/// Elements of a null-terminated array of pointers.
pub unsafe fn slice_from_c_array<'a, T>(ptr: *const *const T) -> Vec<&'a T> {
    if ptr.is_null() {
        return Vec::new();
    }

    (0..)
        .map_while(|i| (*ptr.add(i)).as_ref())
        .collect()
}

/// Copies `text` into a C buffer of `capacity` bytes, always null-terminated.
pub unsafe fn copy_to_c_buffer(text: &str, dest: *mut c_char, capacity: usize) {
    if dest.is_null() || capacity == 0 {
        return;
    }

    let bytes = text.as_bytes();
    let len = bytes.len().min(capacity - 1);
    std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), dest, len);
    *dest.add(len) = 0;
}
