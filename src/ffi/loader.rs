//! Dynamic Library Loader
//!
//! Safe-ish wrapper around libloading: symbol resolution with a cache,
//! typed function and global-data access, calls through runtime-declared
//! signatures, and a process-wide handle cache.

use std::collections::HashMap;
use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::{Library, Symbol};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::{FfiError, FfiSignature, FfiValue};

/// Handles shared by every caller in the process, keyed by requested path.
static SHARED: Lazy<Mutex<HashMap<PathBuf, Arc<DynamicLibrary>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Load `path` once per process and hand out the same handle afterwards.
pub fn shared_library(path: impl AsRef<Path>) -> Result<Arc<DynamicLibrary>, FfiError> {
    let key = path.as_ref().to_path_buf();
    let mut shared = SHARED.lock();
    if let Some(lib) = shared.get(&key) {
        return Ok(Arc::clone(lib));
    }

    let lib = Arc::new(DynamicLibrary::load(&key)?);
    shared.insert(key, Arc::clone(&lib));
    Ok(lib)
}

/// Drop the process-wide handle for `path`.
///
/// The library stays mapped until every outstanding `Arc` is gone.
pub fn release_shared_library(path: impl AsRef<Path>) -> bool {
    SHARED.lock().remove(path.as_ref()).is_some()
}

/// A dynamically loaded library
pub struct DynamicLibrary {
    path: PathBuf,
    library: Library,
    symbols: Mutex<HashMap<String, usize>>,
}

impl DynamicLibrary {
    /// Load a library from the given path.
    ///
    /// A bare file name (no directory) is handed to the platform loader,
    /// which applies its own search rules.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FfiError> {
        let path = path.as_ref().to_path_buf();

        // Safety: running the library's initialisers is inherent to loading
        // it; the caller chose the path.
        let library = unsafe {
            Library::new(&path).map_err(|e| {
                FfiError::LoadError(format!(
                    "Failed to load library '{}': {}",
                    path.display(),
                    e
                ))
            })?
        };
        tracing::debug!(path = %path.display(), "loaded shared library");

        Ok(Self {
            path,
            library,
            symbols: Mutex::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve the address of an exported function or global.
    pub fn symbol(&self, name: &str) -> Result<usize, FfiError> {
        if let Some(&addr) = self.symbols.lock().get(name) {
            return Ok(addr);
        }

        let c_name = CString::new(name)
            .map_err(|_| FfiError::InvalidSymbol(format!("Invalid symbol name: {:?}", name)))?;

        // Safety: the address is only reinterpreted by callers that state
        // the symbol's type.
        let addr = unsafe {
            let symbol: Symbol<*const ()> =
                self.library.get(c_name.as_bytes_with_nul()).map_err(|e| {
                    FfiError::SymbolNotFound(format!(
                        "Symbol '{}' not found in '{}': {}",
                        name,
                        self.path.display(),
                        e
                    ))
                })?;
            *symbol as usize
        };

        if addr == 0 {
            return Err(FfiError::SymbolNotFound(format!(
                "Symbol '{}' resolved to null in '{}'",
                name,
                self.path.display()
            )));
        }

        self.symbols.lock().insert(name.to_string(), addr);
        Ok(addr)
    }

    /// Reinterpret an exported function as the function-pointer type `F`.
    ///
    /// # Safety
    ///
    /// `F` must be an `extern "C" fn` type matching the native definition.
    pub unsafe fn function<F: Copy>(&self, name: &str) -> Result<F, FfiError> {
        if std::mem::size_of::<F>() != std::mem::size_of::<usize>() {
            return Err(FfiError::ConversionError(format!(
                "'{}' requested as a type that is not pointer sized",
                name
            )));
        }
        let addr = self.symbol(name)?;
        Ok(std::mem::transmute_copy::<usize, F>(&addr))
    }

    /// Pointer to an exported global of type `T`.
    ///
    /// Reading or writing through the pointer is only valid if `T` mirrors
    /// the native layout.
    pub fn data<T>(&self, name: &str) -> Result<*mut T, FfiError> {
        Ok(self.symbol(name)? as *mut T)
    }

    /// Call a function through a signature declared at runtime.
    ///
    /// Every argument travels in an integer register, so only integer,
    /// pointer and string shapes are supported.
    ///
    /// # Safety
    ///
    /// The signature must match the native function and the arguments must
    /// satisfy its preconditions.
    pub unsafe fn call(
        &self,
        signature: &FfiSignature,
        args: &[FfiValue],
    ) -> Result<FfiValue, FfiError> {
        if !signature.validate_args(args.len()) {
            return Err(FfiError::InvalidArgCount {
                name: signature.name.clone(),
                expected: signature.params.len(),
                got: args.len(),
            });
        }
        for (index, (arg, &ty)) in args.iter().zip(&signature.params).enumerate() {
            if !arg.fits(ty) {
                return Err(FfiError::InvalidArgType {
                    name: signature.name.clone(),
                    index,
                    expected: ty,
                });
            }
        }

        let addr = self.symbol(&signature.name)?;
        let a: Vec<u64> = args.iter().map(FfiValue::as_raw).collect();

        // One arm per arity: the ABI needs the parameter count at compile time.
        let raw = match a.len() {
            0 => {
                let f: extern "C" fn() -> u64 = std::mem::transmute(addr);
                f()
            }
            1 => {
                let f: extern "C" fn(u64) -> u64 = std::mem::transmute(addr);
                f(a[0])
            }
            2 => {
                let f: extern "C" fn(u64, u64) -> u64 = std::mem::transmute(addr);
                f(a[0], a[1])
            }
            3 => {
                let f: extern "C" fn(u64, u64, u64) -> u64 = std::mem::transmute(addr);
                f(a[0], a[1], a[2])
            }
            4 => {
                let f: extern "C" fn(u64, u64, u64, u64) -> u64 = std::mem::transmute(addr);
                f(a[0], a[1], a[2], a[3])
            }
            5 => {
                let f: extern "C" fn(u64, u64, u64, u64, u64) -> u64 =
                    std::mem::transmute(addr);
                f(a[0], a[1], a[2], a[3], a[4])
            }
            6 => {
                let f: extern "C" fn(u64, u64, u64, u64, u64, u64) -> u64 =
                    std::mem::transmute(addr);
                f(a[0], a[1], a[2], a[3], a[4], a[5])
            }
            n => return Err(FfiError::TooManyArgs(n)),
        };

        Ok(FfiValue::from_raw(raw, signature.return_type))
    }
}

/// Resolves library names against a list of search directories
#[derive(Debug, Clone)]
pub struct LibraryLoader {
    search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    /// Loader with the platform's default search directories
    pub fn new() -> Self {
        Self {
            search_paths: default_search_paths(),
        }
    }

    /// Loader that only looks in `paths`, ahead of nothing else
    pub fn with_search_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths: paths,
        }
    }

    /// Add a directory searched before the existing ones.
    pub fn prepend_search_path(&mut self, path: impl AsRef<Path>) {
        self.search_paths.insert(0, path.as_ref().to_path_buf());
    }

    pub fn add_search_path(&mut self, path: impl AsRef<Path>) {
        self.search_paths.push(path.as_ref().to_path_buf());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find a library by path, file name or short name (`chadwick`).
    pub fn find_library(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.exists() {
            return Some(path.to_path_buf());
        }

        let candidates = [name.to_string(), library_filename(name)];
        for search_path in &self.search_paths {
            for candidate in &candidates {
                let full_path = search_path.join(candidate);
                if full_path.exists() {
                    return Some(full_path);
                }
            }
        }

        None
    }

    /// Resolve `name` and load it through the process-wide handle cache.
    ///
    /// Names that are not found on the search paths go to the platform
    /// loader unchanged.
    pub fn load(&self, name: &str) -> Result<Arc<DynamicLibrary>, FfiError> {
        let path = self
            .find_library(name)
            .unwrap_or_else(|| PathBuf::from(name));
        shared_library(path)
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the default library search paths for this platform
fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd);
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(ld_path) = std::env::var("LD_LIBRARY_PATH") {
            paths.extend(ld_path.split(':').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
        paths.push(PathBuf::from("/usr/local/lib"));
        paths.push(PathBuf::from("/usr/lib"));
        paths.push(PathBuf::from("/usr/lib64"));
        paths.push(PathBuf::from("/lib"));
        paths.push(PathBuf::from("/lib64"));
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(dyld_path) = std::env::var("DYLD_LIBRARY_PATH") {
            paths.extend(dyld_path.split(':').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
        paths.push(PathBuf::from("/usr/local/lib"));
        paths.push(PathBuf::from("/opt/homebrew/lib"));
        paths.push(PathBuf::from("/usr/lib"));
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(path) = std::env::var("PATH") {
            paths.extend(path.split(';').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
    }

    paths
}

/// Construct the platform-specific library filename
pub fn library_filename(name: &str) -> String {
    #[cfg(target_os = "linux")]
    {
        if name.starts_with("lib") && name.contains(".so") {
            name.to_string()
        } else {
            format!("lib{}.so", name)
        }
    }

    #[cfg(target_os = "macos")]
    {
        if name.starts_with("lib") && name.ends_with(".dylib") {
            name.to_string()
        } else {
            format!("lib{}.dylib", name)
        }
    }

    #[cfg(target_os = "windows")]
    {
        if name.ends_with(".dll") {
            name.to_string()
        } else {
            format!("{}.dll", name)
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        name.to_string()
    }
}
