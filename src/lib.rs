//! Load a shared object straight from memory.
//!
//! The image is written into an anonymous memory-backed file (`memfd_create`
//! on Linux 3.17+, a `/dev/shm` object before that) and opened through the
//! dynamic loader by path. A `/dev/shm` entry is unlinked as soon as `dlopen`
//! returns; the descriptor lives until the module is unloaded. Nothing
//! durable is left on disk.
//!
//! ```no_run
//! use memfd_loader::{run, ModuleImage, Settings};
//!
//! let image = ModuleImage::from_file("libsample.so")?;
//! let report = run(&image, &Settings::default())?;
//! println!("{} returned {}", report.symbol, report.value);
//! # Ok::<(), memfd_loader::Error>(())
//! ```

#[cfg(not(target_os = "linux"))]
compile_error!("memfd-loader relies on memfd_create, /proc/self/fd and /dev/shm and only builds on Linux");

pub mod backing;
pub mod bridge;
pub mod error;
pub mod error_reporting;
pub mod image;
pub mod loader;
pub mod probe;
pub mod settings;

pub use backing::BackingHandle;
pub use bridge::{EntryPoint, ExportedFunction, LoadedModule};
pub use error::{Error, InvocationMismatch, Result};
pub use image::ModuleImage;
pub use loader::{invoke_export, load_from_memory, run, LoadReport, Session};
pub use probe::{probe, CapabilityLevel, MEMFD_MIN_KERNEL_VERSION};
pub use settings::{Settings, StrategyPreference};
