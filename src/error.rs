//! Error kinds surfaced by the loader.
//!
//! Every OS or dynamic-loader failure is converted at its call site into one
//! of these variants, with the underlying diagnostic attached.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a module from memory.
#[derive(Debug, Error)]
pub enum Error {
    /// The kernel release string could not be turned into a version number.
    #[error("could not determine kernel version from release {release:?}: {reason}")]
    VersionProbe { release: String, reason: String },

    /// The backing resource name cannot be used with the selected primitive.
    #[error("invalid backing resource name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The memory-backed descriptor could not be obtained.
    #[error("could not create {primitive} descriptor {name:?}: {source}")]
    ResourceCreate {
        primitive: &'static str,
        name: String,
        #[source]
        source: io::Error,
    },

    /// Writing the image into the backing resource failed or came up short.
    #[error("could not write {len} bytes to {path}: {source}")]
    Write {
        len: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The dynamic loader rejected the backing path.
    #[error("dlopen of {path} failed: {reason}")]
    Open { path: PathBuf, reason: String },

    /// The export is missing or the loader flagged an error while resolving it.
    #[error("cannot find entry point {symbol:?} in module: {reason}")]
    SymbolNotFound { symbol: String, reason: String },

    /// The module image could not be read into memory.
    #[error("could not read module image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Process exit code for this failure.
    ///
    /// `1` for image-read failures, `2` for anything that prevents the module
    /// from being loaded, `3` for symbol resolution failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ImageRead { .. } => 1,
            Error::VersionProbe { .. }
            | Error::InvalidName { .. }
            | Error::ResourceCreate { .. }
            | Error::Write { .. }
            | Error::Open { .. } => 2,
            Error::SymbolNotFound { .. } => 3,
        }
    }
}

/// The invoked function returned something other than the expected sentinel.
///
/// This is advisory only and never aborts a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid function return. Expected: {expected}. Got: {actual}")]
pub struct InvocationMismatch {
    pub expected: i32,
    pub actual: i32,
}

pub type Result<T> = std::result::Result<T, Error>;
