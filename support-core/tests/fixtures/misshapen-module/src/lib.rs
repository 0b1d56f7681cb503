//! Exports both capability names, but the command supplier is a plain
//! descriptor of some other kind

use std::ffi::c_char;

#[repr(C)]
pub struct Descriptor {
    pub tag: u64,
    pub revision: u64,
}

#[unsafe(no_mangle)]
pub extern "C" fn _support_plugin_name() -> *const c_char {
    c"misshapen".as_ptr()
}

#[unsafe(no_mangle)]
#[allow(non_upper_case_globals)]
pub static _support_plugin_commands: Descriptor = Descriptor {
    tag: 0x7b8,
    revision: 1,
};
