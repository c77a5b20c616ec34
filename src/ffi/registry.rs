//! FFI Registry
//!
//! Functions declared at runtime against one loaded library, callable by name.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::loader::DynamicLibrary;
use super::types::{FfiSignature, FfiType, FfiValue};

/// Error type for FFI operations
#[derive(Debug, Clone, Error)]
pub enum FfiError {
    #[error("Load error: {0}")]
    LoadError(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Library not found: {0}")]
    LibraryNotFound(String),

    #[error("Function not registered: {0}")]
    FunctionNotFound(String),

    #[error("Invalid argument count for {name}: expected {expected}, got {got}")]
    InvalidArgCount {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid argument {index} for {name}: expected {expected}")]
    InvalidArgType {
        name: String,
        index: usize,
        expected: FfiType,
    },

    #[error("Too many arguments: {0} (max 6)")]
    TooManyArgs(usize),

    #[error("Unknown C type: {0}")]
    UnknownType(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Type conversion error: {0}")]
    ConversionError(String),
}

/// Functions registered on a single library, keyed by symbol name
pub struct FfiRegistry {
    library: Arc<DynamicLibrary>,
    functions: HashMap<String, FfiSignature>,
}

impl FfiRegistry {
    pub fn new(library: Arc<DynamicLibrary>) -> Self {
        Self {
            library,
            functions: HashMap::new(),
        }
    }

    pub fn library(&self) -> &Arc<DynamicLibrary> {
        &self.library
    }

    /// Declare a function's signature.
    ///
    /// The symbol is resolved immediately so a misspelled name fails here
    /// rather than at the first call. Re-registering a name replaces the
    /// previous declaration.
    pub fn register(&mut self, signature: FfiSignature) -> Result<&FfiSignature, FfiError> {
        self.library.symbol(&signature.name)?;
        let name = signature.name.clone();
        self.functions.insert(name.clone(), signature);
        Ok(&self.functions[&name])
    }

    /// Declare a function from a C prototype string.
    pub fn register_prototype(&mut self, prototype: &str) -> Result<&FfiSignature, FfiError> {
        let signature = FfiSignature::parse(prototype)?;
        self.register(signature)
    }

    /// Call a registered function.
    ///
    /// # Safety
    ///
    /// The registered signature must match the native definition and the
    /// arguments must satisfy the function's own preconditions.
    pub unsafe fn call(&self, name: &str, args: &[FfiValue]) -> Result<FfiValue, FfiError> {
        let signature = self
            .functions
            .get(name)
            .ok_or_else(|| FfiError::FunctionNotFound(name.to_string()))?;
        self.library.call(signature, args)
    }

    pub fn get(&self, name: &str) -> Option<&FfiSignature> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered signatures, sorted by name
    pub fn list(&self) -> Vec<&FfiSignature> {
        let mut all: Vec<_> = self.functions.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}
