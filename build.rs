use std::env;
use std::io::Result;
use std::path::{Path, PathBuf};
use std::process::Command;

// Compiles the shared objects the integration tests load from memory and
// exposes their paths as MEMFD_LOADER_SAMPLE_MODULE and
// MEMFD_LOADER_SECOND_MODULE.
fn main() -> Result<()> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let fixtures = manifest_dir.join("tests").join("fixtures");

    compile_fixture(&fixtures, &out_dir, "sample_module", "MEMFD_LOADER_SAMPLE_MODULE");
    compile_fixture(&fixtures, &out_dir, "second_module", "MEMFD_LOADER_SECOND_MODULE");
    Ok(())
}

fn compile_fixture(fixtures: &Path, out_dir: &Path, crate_name: &str, env_var: &str) {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let target = env::var("TARGET").unwrap();

    let source = fixtures.join(format!("{}.rs", crate_name));
    let output = out_dir.join(format!("lib{}.so", crate_name));

    println!("cargo:rerun-if-changed={}", source.display());

    let status = Command::new(&rustc)
        .args(["--edition", "2021", "--crate-type", "cdylib"])
        .args(["--crate-name", crate_name, "-C", "opt-level=1"])
        .args(["--target", &target])
        .arg("-o")
        .arg(&output)
        .arg(&source)
        .status()
        .unwrap_or_else(|e| panic!("Failed to run {}: {}", rustc, e));

    if !status.success() {
        panic!("Failed to compile {}: {}", source.display(), status);
    }

    println!("cargo:rustc-env={}={}", env_var, output.display());
}
