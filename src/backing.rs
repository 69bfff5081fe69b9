//! Anonymous backing store: exposes an in-memory image under a path the
//! dynamic loader can open.
//!
//! A [`BackingHandle`] owns the descriptor and, for the shared-memory
//! strategy, the `/dev/shm` entry. Both are released when the handle is
//! dropped, including on early error returns out of [`BackingHandle::create`].

use std::ffi::CString;
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::memfd::{memfd_create, MemFdCreateFlag};
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;

use crate::error::{Error, Result};
use crate::image::ModuleImage;
use crate::probe::CapabilityLevel;

/// Prefix for synthesized backing resource names.
pub const NAME_PREFIX: &str = "memfd-";

/// Directory where glibc exposes POSIX shared-memory objects.
pub const SHM_DIR: &str = "/dev/shm";

/// A module image realized as an openable path backed by anonymous memory.
#[derive(Debug)]
pub struct BackingHandle {
    file: File,
    path: PathBuf,
    name: String,
    level: CapabilityLevel,
    /// `shm_open` name still to be unlinked. Always `None` for memfd.
    shm_entry: Option<String>,
}

impl BackingHandle {
    /// Create a backing resource for `level` and write `image` into it.
    ///
    /// Without a `suggested_name` a time-based one is synthesized; callers that
    /// run many loads concurrently should pass their own unique name.
    pub fn create(
        image: &ModuleImage,
        suggested_name: Option<&str>,
        level: CapabilityLevel,
    ) -> Result<Self> {
        let name = match suggested_name {
            Some(name) => name.to_string(),
            None => synthesize_name(),
        };
        validate_name(&name)?;

        let mut handle = match level {
            CapabilityLevel::AnonymousMemFd => Self::create_memfd(name)?,
            CapabilityLevel::NamedSharedMemory => Self::create_shm(name)?,
        };
        handle.write_image(image)?;

        log::debug!(
            "wrote {} bytes to {} ({:?})",
            image.len(),
            handle.path.display(),
            handle.level
        );
        Ok(handle)
    }

    fn create_memfd(name: String) -> Result<Self> {
        let c_name = CString::new(name.as_str()).map_err(|_| Error::InvalidName {
            name: name.clone(),
            reason: "name must not contain NUL bytes",
        })?;
        let fd = memfd_create(&c_name, MemFdCreateFlag::MFD_CLOEXEC).map_err(|e| {
            Error::ResourceCreate {
                primitive: "memfd",
                name: name.clone(),
                source: io::Error::from(e),
            }
        })?;

        let path = PathBuf::from(format!("/proc/self/fd/{}", fd.as_raw_fd()));
        Ok(Self {
            file: File::from(fd),
            path,
            name,
            level: CapabilityLevel::AnonymousMemFd,
            shm_entry: None,
        })
    }

    fn create_shm(name: String) -> Result<Self> {
        let entry = format!("/{}", name);
        let fd = shm_open(
            entry.as_str(),
            OFlag::O_RDWR | OFlag::O_CREAT | OFlag::O_TRUNC,
            Mode::S_IRWXU,
        )
        .map_err(|e| Error::ResourceCreate {
            primitive: "shm",
            name: name.clone(),
            source: io::Error::from(e),
        })?;

        let path = Path::new(SHM_DIR).join(&name);
        Ok(Self {
            file: File::from(fd),
            path,
            name,
            level: CapabilityLevel::NamedSharedMemory,
            shm_entry: Some(entry),
        })
    }

    /// Write the whole image in a single call. A short write is an error.
    fn write_image(&mut self, image: &ModuleImage) -> Result<()> {
        let len = image.len();
        let written = self
            .file
            .write(image.as_bytes())
            .map_err(|source| Error::Write {
                len,
                path: self.path.clone(),
                source,
            })?;

        if written != len {
            return Err(Error::Write {
                len,
                path: self.path.clone(),
                source: io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write: {} of {} bytes", written, len),
                ),
            });
        }
        Ok(())
    }

    /// Path the dynamic loader should open. Invalid once the handle is dropped.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> CapabilityLevel {
        self.level
    }

    /// Remove the named shared-memory entry, if any.
    ///
    /// Safe to call more than once; an entry that is already gone is not an
    /// error. Anonymous memfd resources have no entry to remove.
    pub fn unlink(&mut self) {
        let Some(entry) = self.shm_entry.take() else {
            log::trace!("{}: nothing to unlink", self.path.display());
            return;
        };

        match shm_unlink(entry.as_str()) {
            Ok(()) => log::debug!("unlinked {}", self.path.display()),
            Err(Errno::ENOENT) => log::debug!("{} already unlinked", self.path.display()),
            Err(e) => log::warn!("failed to unlink {}: {}", self.path.display(), e),
        }
    }
}

impl AsFd for BackingHandle {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

/// Unlinks the named entry; the descriptor closes when `file` drops right after.
impl Drop for BackingHandle {
    fn drop(&mut self) {
        self.unlink();
        log::debug!("closing backing descriptor for {}", self.path.display());
    }
}

/// `memfd-<microseconds since the epoch>`.
pub fn synthesize_name() -> String {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    format!("{}{}", NAME_PREFIX, micros)
}

fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains('/') {
        "name must not contain '/'"
    } else if name.contains('\0') {
        "name must not contain NUL bytes"
    } else {
        return Ok(());
    };

    Err(Error::InvalidName {
        name: name.to_string(),
        reason,
    })
}
