//! Build script for the test stand-in library
//!
//! Compiles `test/fixtures/cwstub.c` into a shared object with the host C
//! compiler and exports its path as `CHADWICK_STUB_LIB`. Tests that need it
//! read the variable with `option_env!` and skip when it is absent.

use std::env;
use std::path::PathBuf;

const STUB_SOURCE: &str = "test/fixtures/cwstub.c";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={}", STUB_SOURCE);

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let file_name = match target_os.as_str() {
        "linux" | "android" | "freebsd" => "libcwstub.so",
        "macos" => "libcwstub.dylib",
        _ => return,
    };
    let Ok(out_dir) = env::var("OUT_DIR").map(PathBuf::from) else {
        return;
    };
    let output = out_dir.join(file_name);

    let compiler = match cc::Build::new().try_get_compiler() {
        Ok(compiler) => compiler,
        Err(e) => {
            println!("cargo:warning=Skipping libchadwick stand-in: {}", e);
            return;
        }
    };

    let status = compiler
        .to_command()
        .args(["-shared", "-fPIC", "-o"])
        .arg(&output)
        .arg(STUB_SOURCE)
        .status();

    match status {
        Ok(s) if s.success() => {
            println!("cargo:rustc-env=CHADWICK_STUB_LIB={}", output.display());
        }
        Ok(s) => println!("cargo:warning=Stand-in library build failed: {}", s),
        Err(e) => println!("cargo:warning=Could not run C compiler: {}", e),
    }
}
