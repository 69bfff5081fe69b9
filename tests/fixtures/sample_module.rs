// Shared object loaded by the integration tests.

use std::os::raw::c_int;

#[no_mangle]
pub extern "C" fn sample_function() -> c_int {
    123
}

#[no_mangle]
pub extern "C" fn other_function() -> c_int {
    7
}
