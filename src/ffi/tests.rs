//! FFI Module Tests

use super::*;

#[test]
fn test_ffi_type_parsing() {
    assert_eq!("u64".parse::<FfiType>().unwrap(), FfiType::U64);
    assert_eq!("int".parse::<FfiType>().unwrap(), FfiType::I32);
    assert_eq!("unsigned  int".parse::<FfiType>().unwrap(), FfiType::U32);
    assert_eq!("void*".parse::<FfiType>().unwrap(), FfiType::Ptr);
    assert_eq!("FILE *".parse::<FfiType>().unwrap(), FfiType::Ptr);
    assert_eq!("CWGameIterator*".parse::<FfiType>().unwrap(), FfiType::Ptr);
    assert_eq!("const char*".parse::<FfiType>().unwrap(), FfiType::CStr);
    assert!(matches!(
        "double".parse::<FfiType>(),
        Err(FfiError::UnknownType(_))
    ));
}

#[test]
fn test_ffi_type_properties() {
    assert!(FfiType::U64.is_integer());
    assert!(!FfiType::U64.is_pointer());
    assert!(FfiType::I32.is_signed());
    assert!(!FfiType::U32.is_signed());
    assert!(FfiType::Ptr.is_pointer());
    assert!(FfiType::CStr.is_pointer());
    assert_eq!(FfiType::I16.size(), 2);
}

#[test]
fn test_return_narrowing() {
    // feof returns int; upper register bits are garbage
    assert_eq!(FfiType::I32.narrow(0xdead_beef_0000_0001), 1);
    assert_eq!(FfiType::I32.narrow(0xffff_ffff) as i64, -1);
    assert_eq!(FfiType::U8.narrow(0x1ff), 0xff);
    assert_eq!(FfiType::Ptr.narrow(0x1234_5678_9abc), 0x1234_5678_9abc);

    match FfiValue::from_raw(0x7fff_0010, FfiType::Ptr) {
        FfiValue::Pointer(p) => assert_eq!(p, 0x7fff_0010),
        other => panic!("expected pointer, got {:?}", other),
    }
    assert!(FfiValue::from_raw(42, FfiType::Void).is_void());
}

#[test]
fn test_value_fits() {
    assert!(FfiValue::Integer(1).fits(FfiType::I32));
    assert!(!FfiValue::Integer(1).fits(FfiType::Ptr));
    assert!(FfiValue::Pointer(8).fits(FfiType::Ptr));
    assert!(FfiValue::string("r").unwrap().fits(FfiType::CStr));
    assert!(!FfiValue::Void.fits(FfiType::I32));
    assert!(FfiValue::string("a\0b").is_err());
}

#[test]
fn test_signature_parsing() {
    let sig = FfiSignature::parse("int feof(FILE* stream)").unwrap();
    assert_eq!(sig.name, "feof");
    assert_eq!(sig.return_type, FfiType::I32);
    assert_eq!(sig.params, vec![FfiType::Ptr]);
    assert!(!sig.variadic);

    let sig = FfiSignature::parse("char *cw_game_info_lookup(CWGame *game, char *label);").unwrap();
    assert_eq!(sig.name, "cw_game_info_lookup");
    assert_eq!(sig.return_type, FfiType::CStr);
    assert_eq!(sig.params, vec![FfiType::Ptr, FfiType::CStr]);

    let sig = FfiSignature::parse("void cw_gameiter_next(CWGameIterator *)").unwrap();
    assert_eq!(sig.return_type, FfiType::Void);
    assert_eq!(sig.params, vec![FfiType::Ptr]);

    let sig = FfiSignature::parse("int getpid(void)").unwrap();
    assert!(sig.params.is_empty());

    let sig = FfiSignature::parse("int printf(const char* fmt, ...)").unwrap();
    assert!(sig.variadic);
    assert_eq!(sig.params, vec![FfiType::CStr]);

    assert!(FfiSignature::parse("not a prototype").is_err());
    assert!(FfiSignature::parse("int (int)").is_err());
}

#[test]
fn test_signature_display() {
    let sig = FfiSignature::new("fopen", vec![FfiType::CStr, FfiType::CStr], FfiType::Ptr);
    assert_eq!(sig.to_string(), "ptr fopen(cstr, cstr)");

    let sig = FfiSignature::variadic("printf", vec![FfiType::CStr], FfiType::I32);
    assert_eq!(sig.to_string(), "i32 printf(cstr, ...)");
}

#[test]
fn test_signature_validation() {
    let sig = FfiSignature::new("fclose", vec![FfiType::Ptr], FfiType::I32);
    assert!(sig.validate_args(1));
    assert!(!sig.validate_args(0));
    assert!(!sig.validate_args(2));

    let sig = FfiSignature::variadic("printf", vec![FfiType::CStr], FfiType::I32);
    assert!(sig.validate_args(1));
    assert!(sig.validate_args(4));
    assert!(!sig.validate_args(0));
}

#[test]
fn test_library_filename() {
    #[cfg(target_os = "linux")]
    {
        assert_eq!(library_filename("chadwick"), "libchadwick.so");
        assert_eq!(library_filename("libchadwick.so.0"), "libchadwick.so.0");
    }
    #[cfg(target_os = "macos")]
    assert_eq!(library_filename("chadwick"), "libchadwick.dylib");
}

#[test]
fn test_loader_missing_library() {
    let loader = LibraryLoader::with_search_paths(vec![]);
    assert!(loader.find_library("definitely_not_a_library_xyz").is_none());
    let err = loader.load("/nonexistent/libdefinitely_not_here.so").err();
    assert!(matches!(err, Some(FfiError::LoadError(_))));
}

#[test]
fn test_loader_finds_file_in_search_path() {
    let dir = tempfile::tempdir().unwrap();
    let lib_path = dir.path().join(library_filename("fakechadwick"));
    std::fs::write(&lib_path, b"not really a library").unwrap();

    let loader = LibraryLoader::with_search_paths(vec![dir.path().to_path_buf()]);
    assert_eq!(loader.find_library("fakechadwick"), Some(lib_path));
}

#[test]
fn test_ffi_error_display() {
    let err = FfiError::LoadError("test".to_string());
    assert!(err.to_string().contains("Load error"));

    let err = FfiError::InvalidArgCount {
        name: "fopen".to_string(),
        expected: 2,
        got: 3,
    };
    let msg = err.to_string();
    assert!(msg.contains("fopen"));
    assert!(msg.contains('2'));
    assert!(msg.contains('3'));
}

#[cfg(target_os = "linux")]
#[test]
fn test_libc_registry_call() {
    let lib = match shared_library("libc.so.6") {
        Ok(lib) => lib,
        Err(_) => return,
    };

    let mut registry = FfiRegistry::new(lib);
    registry
        .register_prototype("int getpid(void)")
        .expect("Failed to register getpid");
    assert!(registry.contains("getpid"));

    let pid = unsafe { registry.call("getpid", &[]) }.expect("Failed to call getpid");
    assert_eq!(pid.as_i64(), Some(std::process::id() as i64));

    let err = unsafe { registry.call("getppid", &[]) }.unwrap_err();
    assert!(matches!(err, FfiError::FunctionNotFound(_)));

    let err = registry
        .register_prototype("int no_such_function_here(void)")
        .unwrap_err();
    assert!(matches!(err, FfiError::SymbolNotFound(_)));
}

#[cfg(target_os = "linux")]
#[test]
fn test_shared_library_is_cached() {
    let (a, b) = match (shared_library("libc.so.6"), shared_library("libc.so.6")) {
        (Ok(a), Ok(b)) => (a, b),
        _ => return,
    };
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert_eq!(a.symbol("strlen").unwrap(), b.symbol("strlen").unwrap());
}
