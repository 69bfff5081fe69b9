// Second shared object, kept loaded alongside sample_module by the tests.

use std::os::raw::c_int;

#[no_mangle]
pub extern "C" fn second_function() -> c_int {
    42
}
