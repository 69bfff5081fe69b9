#![allow(dead_code)]

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use memfd_loader::ModuleImage;

/// Path of the cdylib built by build.rs. Exports `sample_function` (returns
/// 123) and `other_function` (returns 7).
pub const SAMPLE_MODULE: &str = env!("MEMFD_LOADER_SAMPLE_MODULE");

/// Exports only `second_function` (returns 42).
pub const SECOND_MODULE: &str = env!("MEMFD_LOADER_SECOND_MODULE");

static NAME_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn sample_image() -> ModuleImage {
    ModuleImage::from_file(SAMPLE_MODULE).unwrap()
}

pub fn second_image() -> ModuleImage {
    ModuleImage::from_file(SECOND_MODULE).unwrap()
}

/// Backing resource name unique to this process and call.
pub fn unique_name(label: &str) -> String {
    let n = NAME_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("memfd-loader-it-{}-{}-{}", std::process::id(), label, n)
}

pub fn open_descriptor_count() -> usize {
    fs::read_dir("/proc/self/fd").unwrap().count()
}
