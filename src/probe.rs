//! Kernel capability detection.
//!
//! `memfd_create(2)` appeared in Linux 3.17. Older kernels fall back to a
//! named POSIX shared-memory object under `/dev/shm`.

use nix::sys::utsname::uname;
use serde::Serialize;

use crate::error::{Error, Result};

/// First kernel version (as `major * 100 + minor`) with `memfd_create`.
pub const MEMFD_MIN_KERNEL_VERSION: u32 = 317;

/// Memory-backed file primitive used to expose a module image by path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityLevel {
    /// Anonymous file from `memfd_create`, opened via `/proc/self/fd/<fd>`.
    AnonymousMemFd,
    /// Named object from `shm_open`, opened via `/dev/shm/<name>`.
    NamedSharedMemory,
}

impl CapabilityLevel {
    pub fn for_version(version: u32) -> Self {
        if version >= MEMFD_MIN_KERNEL_VERSION {
            CapabilityLevel::AnonymousMemFd
        } else {
            CapabilityLevel::NamedSharedMemory
        }
    }

    /// Short name of the OS primitive, used in diagnostics.
    pub fn primitive(&self) -> &'static str {
        match self {
            CapabilityLevel::AnonymousMemFd => "memfd",
            CapabilityLevel::NamedSharedMemory => "shm",
        }
    }
}

/// Parse a kernel release such as `6.8.0-45-generic` into `major * 100 + minor % 100`.
///
/// Each component contributes its leading decimal digits, so `4.19-arch1`
/// parses as 419.
pub fn parse_kernel_version(release: &str) -> Result<u32> {
    let fail = |reason: &str| Error::VersionProbe {
        release: release.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = release.split('.');
    let major = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| fail("empty release"))?;
    let minor = parts
        .next()
        .ok_or_else(|| fail("missing minor version"))?;

    let major = leading_number(major).ok_or_else(|| fail("major version is not numeric"))?;
    let minor = leading_number(minor).ok_or_else(|| fail("minor version is not numeric"))?;

    major
        .checked_mul(100)
        .and_then(|m| m.checked_add(minor % 100))
        .ok_or_else(|| fail("version out of range"))
}

fn leading_number(component: &str) -> Option<u32> {
    let end = component
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(component.len());
    component[..end].parse().ok()
}

/// Version number of the running kernel.
pub fn kernel_version() -> Result<u32> {
    let uts = uname().map_err(|e| Error::VersionProbe {
        release: String::new(),
        reason: format!("uname failed: {}", e),
    })?;
    let release = uts.release().to_string_lossy();
    log::debug!("Kernel version: {}", release);
    parse_kernel_version(&release)
}

/// Pick the backing primitive supported by the running kernel.
pub fn probe() -> Result<CapabilityLevel> {
    let version = kernel_version()?;
    let level = CapabilityLevel::for_version(version);
    log::debug!("kernel version {} selects {:?}", version, level);
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_release_strings() {
        assert_eq!(parse_kernel_version("3.17.0").unwrap(), 317);
        assert_eq!(parse_kernel_version("6.8.0-45-generic").unwrap(), 608);
        assert_eq!(parse_kernel_version("6.18.44-fc-v139").unwrap(), 618);
        assert_eq!(parse_kernel_version("4.19-arch1").unwrap(), 419);
        assert_eq!(parse_kernel_version("2.6.32-754.el6.x86_64").unwrap(), 206);
    }

    #[test]
    fn minor_is_taken_modulo_100() {
        assert_eq!(parse_kernel_version("2.123").unwrap(), 223);
    }

    #[test]
    fn rejects_malformed_release_strings() {
        for release in ["", "6", "6-generic", "x.y", "6.x", ".5", "6."] {
            let err = parse_kernel_version(release).unwrap_err();
            assert!(
                matches!(err, Error::VersionProbe { .. }),
                "{:?} should fail with VersionProbe, got {:?}",
                release,
                err
            );
        }
    }

    #[test]
    fn threshold_selects_capability() {
        assert_eq!(
            CapabilityLevel::for_version(316),
            CapabilityLevel::NamedSharedMemory
        );
        assert_eq!(
            CapabilityLevel::for_version(317),
            CapabilityLevel::AnonymousMemFd
        );
        assert_eq!(
            CapabilityLevel::for_version(608),
            CapabilityLevel::AnonymousMemFd
        );
        assert_eq!(
            CapabilityLevel::for_version(206),
            CapabilityLevel::NamedSharedMemory
        );
    }

    #[test]
    fn probe_matches_running_kernel() {
        let version = kernel_version().unwrap();
        assert_eq!(probe().unwrap(), CapabilityLevel::for_version(version));
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&CapabilityLevel::AnonymousMemFd).unwrap(),
            "\"anonymous_mem_fd\""
        );
    }
}
