//! Native `FILE*` streams.
//!
//! `fopen`, `feof` and `fclose` are resolved through the same library handle
//! the reader functions come from, so the stream belongs to the C runtime
//! that libchadwick reads with.

use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ChadwickError, ChadwickResult};
use crate::ffi::DynamicLibrary;
use crate::native::{symbols, FcloseFn, FeofFn, FopenFn};

/// An open native stream, closed on drop
pub struct NativeFile {
    library: Arc<DynamicLibrary>,
    handle: *mut libc::FILE,
    path: PathBuf,
    feof: FeofFn,
    fclose: FcloseFn,
}

impl NativeFile {
    /// `fopen(path, mode)`; a null stream is reported as [`ChadwickError::Open`].
    pub fn open(
        library: &Arc<DynamicLibrary>,
        path: impl AsRef<Path>,
        mode: &str,
    ) -> ChadwickResult<Self> {
        let path = path.as_ref().to_path_buf();
        let c_path = path_to_cstring(&path)?;
        let c_mode =
            CString::new(mode).map_err(|_| ChadwickError::InvalidPath(mode.to_string()))?;

        // Safety: the function types mirror the C standard library prototypes.
        let (fopen, feof, fclose) = unsafe {
            (
                library.function::<FopenFn>(symbols::FOPEN)?,
                library.function::<FeofFn>(symbols::FEOF)?,
                library.function::<FcloseFn>(symbols::FCLOSE)?,
            )
        };

        let handle = unsafe { fopen(c_path.as_ptr(), c_mode.as_ptr()) };
        if handle.is_null() {
            return Err(ChadwickError::Open {
                path,
                mode: mode.to_string(),
            });
        }
        tracing::debug!(path = %path.display(), mode, "opened native stream");

        Ok(Self {
            library: Arc::clone(library),
            handle,
            path,
            feof,
            fclose,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn library(&self) -> &Arc<DynamicLibrary> {
        &self.library
    }

    /// Raw stream for native readers; null once closed.
    pub fn as_ptr(&self) -> *mut libc::FILE {
        self.handle
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_null()
    }

    /// `feof(stream) != 0`. A closed stream is at end of file.
    pub fn eof(&self) -> bool {
        if self.handle.is_null() {
            return true;
        }
        unsafe { (self.feof)(self.handle) != 0 }
    }

    /// `fclose(stream)`; later calls are no-ops.
    ///
    /// Returns the native result of the first close, or 0 if already closed.
    pub fn close(&mut self) -> i32 {
        if self.handle.is_null() {
            return 0;
        }
        let rc = unsafe { (self.fclose)(self.handle) };
        self.handle = std::ptr::null_mut();
        if rc != 0 {
            tracing::debug!(path = %self.path.display(), rc, "fclose reported an error");
        }
        rc
    }
}

impl Drop for NativeFile {
    fn drop(&mut self) {
        self.close();
    }
}

fn path_to_cstring(path: &Path) -> ChadwickResult<CString> {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = path.to_string_lossy().into_owned().into_bytes();

    CString::new(bytes).map_err(|_| ChadwickError::InvalidPath(path.display().to_string()))
}
