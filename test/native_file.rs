//! Native stream lifecycle tests
//!
//! Drives `NativeFile` through the system C library, which exports the same
//! `fopen`/`feof`/`fclose` symbols libchadwick is linked against.

#![cfg(target_os = "linux")]

use chadwick::ffi::shared_library;
use chadwick::{ChadwickError, DynamicLibrary, FfiRegistry, FfiSignature, FfiType, FfiValue, NativeFile};
use std::io::Write;
use std::sync::Arc;

fn libc() -> Option<Arc<DynamicLibrary>> {
    match shared_library("libc.so.6") {
        Ok(lib) => Some(lib),
        Err(e) => {
            eprintln!("skipping: {}", e);
            None
        }
    }
}

fn fgetc(lib: &Arc<DynamicLibrary>) -> FfiRegistry {
    let mut registry = FfiRegistry::new(Arc::clone(lib));
    registry
        .register(FfiSignature::new("fgetc", vec![FfiType::Ptr], FfiType::I32))
        .unwrap();
    registry
}

// ============================================================================
// Open / close
// ============================================================================

#[test]
fn test_open_missing_file() {
    let Some(lib) = libc() else { return };
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("2018ANA.EVA");

    match NativeFile::open(&lib, &missing, "r") {
        Err(ChadwickError::Open { path, mode }) => {
            assert_eq!(path, missing);
            assert_eq!(mode, "r");
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("opened a missing file"),
    }
}

#[test]
fn test_nul_in_mode_is_rejected() {
    let Some(lib) = libc() else { return };
    let file = tempfile::NamedTempFile::new().unwrap();
    assert!(matches!(
        NativeFile::open(&lib, file.path(), "r\0"),
        Err(ChadwickError::InvalidPath(_))
    ));
}

#[test]
fn test_close_is_idempotent() {
    let Some(lib) = libc() else { return };
    let file = tempfile::NamedTempFile::new().unwrap();

    let mut stream = NativeFile::open(&lib, file.path(), "r").unwrap();
    assert!(!stream.is_closed());
    assert_eq!(stream.path(), file.path());

    assert_eq!(stream.close(), 0);
    assert!(stream.is_closed());
    assert!(stream.as_ptr().is_null());
    assert!(stream.eof());
    assert_eq!(stream.close(), 0);
}

// ============================================================================
// End of file
// ============================================================================

#[test]
fn test_eof_after_reading_everything() {
    let Some(lib) = libc() else { return };
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"id,ANA201804020\n").unwrap();
    file.flush().unwrap();

    let registry = fgetc(&lib);
    let stream = NativeFile::open(&lib, file.path(), "r").unwrap();
    let handle = FfiValue::Pointer(stream.as_ptr() as usize);

    assert!(!stream.eof());
    let first = unsafe { registry.call("fgetc", &[handle.clone()]) }.unwrap();
    assert_eq!(first.as_i64(), Some(b'i' as i64));

    let mut read = 1;
    loop {
        let c = unsafe { registry.call("fgetc", &[handle.clone()]) }.unwrap();
        if c.as_i64() == Some(-1) {
            break;
        }
        read += 1;
    }
    assert_eq!(read, 16);
    assert!(stream.eof());
}

#[test]
fn test_empty_file_not_at_eof_before_read() {
    let Some(lib) = libc() else { return };
    let file = tempfile::NamedTempFile::new().unwrap();

    let stream = NativeFile::open(&lib, file.path(), "r").unwrap();
    // feof only reports end of file after a read has hit it
    assert!(!stream.eof());
}
