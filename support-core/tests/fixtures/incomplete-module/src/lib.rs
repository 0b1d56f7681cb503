//! Exports the identity query and nothing else

use std::ffi::c_char;

#[unsafe(no_mangle)]
pub extern "C" fn _support_plugin_name() -> *const c_char {
    c"incomplete".as_ptr()
}
