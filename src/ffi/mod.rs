//! Foreign function layer
//!
//! Loads native shared objects and declares the signatures of the functions
//! and globals used from them.
//!
//! # Architecture
//!
//! ```text
//! Chadwick binding
//!       │
//!       ▼
//! FfiRegistry (runtime-declared signatures, optional)
//!       │
//!       ▼
//! DynamicLibrary (libloading, symbol cache, globals)
//!       │
//!       ▼
//! libchadwick / libc
//! ```
//!
//! # Example
//!
//! ```ignore
//! let lib = shared_library("libchadwick.so")?;
//! let mut registry = FfiRegistry::new(lib);
//! registry.register_prototype("int feof(FILE* stream)")?;
//! let eof = unsafe { registry.call("feof", &[FfiValue::Pointer(file)])? };
//! ```

mod loader;
mod registry;
mod types;

pub use loader::{
    library_filename, release_shared_library, shared_library, DynamicLibrary, LibraryLoader,
};
pub use registry::{FfiError, FfiRegistry};
pub use types::{FfiSignature, FfiType, FfiValue};

#[cfg(test)]
mod tests;
