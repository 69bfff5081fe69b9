//! Dynamic load bridge over `dlopen`/`dlsym`/`dlclose`.
//!
//! The load states are carried by ownership: a [`LoadedModule`] only exists
//! once `dlopen` succeeded, an [`ExportedFunction`] borrows the module it was
//! resolved from, and [`LoadedModule::close`] consumes the module. A module
//! that is dropped without an explicit close is unloaded in `Drop`.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use libc::c_int;
use libloading::os::unix::{Library, Symbol, RTLD_LAZY};

use crate::backing::BackingHandle;
use crate::error::{Error, Result};

/// Signature every invoked export is assumed to have.
pub type EntryPoint = unsafe extern "C" fn() -> c_int;

/// A shared object opened through the dynamic loader.
#[derive(Debug)]
pub struct LoadedModule {
    lib: Option<Library>,
    path: PathBuf,
    /// Descriptor the module was opened through, held until after `dlclose`.
    ///
    /// The loader matches already-loaded objects by path, so a freed
    /// `/proc/self/fd/<n>` must not be handed to another load while this
    /// module is still mapped.
    backing: Option<BackingHandle>,
}

impl LoadedModule {
    /// Open `path` with lazy symbol binding.
    ///
    /// Opening runs the module's initializers, so `path` must point at a
    /// shared object that is safe to load into this process.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("dlopen {}", path.display());

        let lib = unsafe { Library::open(Some(path), RTLD_LAZY) }.map_err(|e| Error::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            lib: Some(lib),
            path: path.to_path_buf(),
            backing: None,
        })
    }

    /// Open the module through `backing` and take ownership of it.
    ///
    /// The named entry (if any) is unlinked as soon as `dlopen` returns; the
    /// descriptor stays open until the module is unloaded. On failure the
    /// backing resource is released before the error is returned.
    pub fn open_backing(mut backing: BackingHandle) -> Result<Self> {
        let mut module = Self::open(backing.path());
        backing.unlink();
        if let Ok(module) = module.as_mut() {
            module.backing = Some(backing);
        }
        module
    }

    /// Path the module was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve `symbol` as a zero-argument function returning a C `int`.
    ///
    /// Both the loader's error flag and the returned address are checked; a
    /// symbol that resolves to null is reported as missing.
    ///
    /// # Safety
    ///
    /// The export named `symbol` must actually have the [`EntryPoint`]
    /// signature. Calling it through a mismatched signature is undefined
    /// behaviour.
    pub unsafe fn resolve(&self, symbol: &str) -> Result<ExportedFunction<'_>> {
        let not_found = |reason: String| Error::SymbolNotFound {
            symbol: symbol.to_string(),
            reason,
        };

        let lib = self
            .lib
            .as_ref()
            .ok_or_else(|| not_found("module already unloaded".to_string()))?;

        let resolved: Symbol<Option<EntryPoint>> =
            unsafe { lib.get(symbol.as_bytes()) }.map_err(|e| not_found(e.to_string()))?;
        let function = resolved
            .lift_option()
            .ok_or_else(|| not_found("symbol resolved to a null address".to_string()))?;

        log::debug!("resolved {} in {}", symbol, self.path.display());
        Ok(ExportedFunction {
            function,
            name: symbol.to_string(),
            _module: PhantomData,
        })
    }

    /// Unload the module. A `dlclose` failure is logged and otherwise ignored.
    pub fn close(mut self) {
        self.unload();
    }

    fn unload(&mut self) {
        if let Some(lib) = self.lib.take() {
            log::debug!("dlclose {}", self.path.display());
            if let Err(e) = lib.close() {
                log::warn!("dlclose of {} failed: {}", self.path.display(), e);
            }
        }
        // Only now may the descriptor number be reused.
        drop(self.backing.take());
    }
}

impl Drop for LoadedModule {
    fn drop(&mut self) {
        self.unload();
    }
}

/// A resolved export, valid only while its [`LoadedModule`] is loaded.
pub struct ExportedFunction<'m> {
    function: Symbol<EntryPoint>,
    name: String,
    _module: PhantomData<&'m LoadedModule>,
}

impl ExportedFunction<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the export with no arguments and return its status value.
    pub fn invoke(&self) -> i32 {
        log::debug!("invoking {}", self.name);
        // The signature was vouched for when the symbol was resolved.
        unsafe { (*self.function)() }
    }
}

impl std::fmt::Debug for ExportedFunction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
