// Kept in its own binary so no earlier load in this process can leave an
// object registered under the empty image's path.

use std::fs;

use memfd_loader::{BackingHandle, CapabilityLevel, Error, LoadedModule, ModuleImage};

#[test]
fn empty_image_fails_to_open() {
    let empty = ModuleImage::new(Vec::new());

    for level in [
        CapabilityLevel::AnonymousMemFd,
        CapabilityLevel::NamedSharedMemory,
    ] {
        let name = format!("memfd-loader-empty-{}-{}", std::process::id(), level.primitive());
        let backing = BackingHandle::create(&empty, Some(&name), level).unwrap();
        assert!(fs::read(backing.path()).unwrap().is_empty());

        let err = LoadedModule::open(backing.path()).unwrap_err();
        match &err {
            Error::Open { path, reason } => {
                assert_eq!(path, backing.path());
                assert!(!reason.is_empty());
            }
            other => panic!("expected Open, got {:?}", other),
        }
        assert_eq!(err.exit_code(), 2);
    }
}
