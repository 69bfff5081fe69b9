//! Composes the backing store and the load bridge into a single
//! load-use-unload cycle.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::backing::BackingHandle;
use crate::bridge::LoadedModule;
use crate::error::{InvocationMismatch, Result};
use crate::image::ModuleImage;
use crate::probe::CapabilityLevel;
use crate::settings::Settings;

/// Load `image` through a memory-backed path.
///
/// A named shared-memory entry is unlinked as soon as `dlopen` returns. The
/// descriptor itself belongs to the returned module and is closed after the
/// module is unloaded, so each loaded module keeps a distinct path.
pub fn load_from_memory(
    image: &ModuleImage,
    suggested_name: Option<&str>,
    level: CapabilityLevel,
) -> Result<LoadedModule> {
    let backing = BackingHandle::create(image, suggested_name, level)?;
    LoadedModule::open_backing(backing)
}

/// Resolve `symbol` and call it with no arguments.
///
/// Nothing is invoked if resolution fails.
pub fn invoke_export(module: &LoadedModule, symbol: &str) -> Result<i32> {
    // Exports driven through here are required to be `int (*)(void)`.
    let function = unsafe { module.resolve(symbol) }?;
    Ok(function.invoke())
}

/// Outcome of a successful [`run`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub strategy: CapabilityLevel,
    pub backing_path: PathBuf,
    pub symbol: String,
    pub value: i32,
    pub expected: Option<i32>,
}

impl LoadReport {
    /// Advisory mismatch between the returned and the expected value.
    pub fn mismatch(&self) -> Option<InvocationMismatch> {
        match self.expected {
            Some(expected) if expected != self.value => Some(InvocationMismatch {
                expected,
                actual: self.value,
            }),
            _ => None,
        }
    }
}

/// A module loaded for one [`run`], waiting for its export to be called.
#[derive(Debug)]
pub struct Session {
    module: LoadedModule,
    strategy: CapabilityLevel,
}

impl Session {
    /// Select the backing strategy and load `image`.
    pub fn load(image: &ModuleImage, settings: &Settings) -> Result<Self> {
        let strategy = settings.strategy.select()?;
        let module = load_from_memory(image, settings.resource_name.as_deref(), strategy)?;
        log::info!("Shared object loaded from memory");
        Ok(Self { module, strategy })
    }

    pub fn strategy(&self) -> CapabilityLevel {
        self.strategy
    }

    pub fn backing_path(&self) -> &Path {
        self.module.path()
    }

    /// Call the configured export once and unload the module.
    ///
    /// The module is unloaded even when the export cannot be resolved.
    pub fn invoke(self, settings: &Settings) -> Result<LoadReport> {
        let Session { module, strategy } = self;

        let outcome = invoke_export(&module, &settings.symbol);
        let backing_path = module.path().to_path_buf();
        module.close();
        let value = outcome?;

        Ok(LoadReport {
            strategy,
            backing_path,
            symbol: settings.symbol.clone(),
            value,
            expected: settings.expected,
        })
    }
}

/// Load `image`, call the configured export once and unload the module.
pub fn run(image: &ModuleImage, settings: &Settings) -> Result<LoadReport> {
    Session::load(image, settings)?.invoke(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(value: i32, expected: Option<i32>) -> LoadReport {
        LoadReport {
            strategy: CapabilityLevel::AnonymousMemFd,
            backing_path: PathBuf::from("/proc/self/fd/3"),
            symbol: "sample_function".to_string(),
            value,
            expected,
        }
    }

    #[test]
    fn matching_value_has_no_mismatch() {
        assert_eq!(report(123, Some(123)).mismatch(), None);
        assert_eq!(report(7, None).mismatch(), None);
    }

    #[test]
    fn differing_value_is_reported() {
        assert_eq!(
            report(7, Some(123)).mismatch(),
            Some(InvocationMismatch {
                expected: 123,
                actual: 7
            })
        );
    }

    #[test]
    fn report_serializes_to_json() {
        let json = serde_json::to_value(report(123, Some(123))).unwrap();
        assert_eq!(json["strategy"], "anonymous_mem_fd");
        assert_eq!(json["backing_path"], "/proc/self/fd/3");
        assert_eq!(json["value"], 123);
        assert_eq!(json["expected"], 123);
    }
}
