//! Team rosters handed to the event processor.
//!
//! Without a roster libchadwick still produces events, but fields that need
//! player handedness come out blank. An empty roster is allocated here; a
//! populated one is read by the library from a `.ROS` file.

use std::ffi::CString;
use std::os::raw::c_int;
use std::path::Path;
use std::sync::Arc;

use crate::error::{ChadwickError, ChadwickResult};
use crate::ffi::DynamicLibrary;
use crate::fields::cstr_lossy;
use crate::file::NativeFile;
use crate::native::{symbols, CWRoster, FreeFn, RosterCleanupFn, RosterCreateFn, RosterReadFn};

enum Storage {
    /// Zeroed roster allocated on the Rust side
    Empty(Box<CWRoster>),
    /// Roster created by `cw_roster_create`
    Native {
        ptr: *mut CWRoster,
        cleanup: RosterCleanupFn,
        free: FreeFn,
        _library: Arc<DynamicLibrary>,
    },
}

/// A roster usable as the visiting or home side
pub struct Roster {
    storage: Storage,
}

impl Roster {
    /// Roster with no players
    pub fn empty() -> Self {
        Self {
            storage: Storage::Empty(Box::default()),
        }
    }

    /// Create a roster for `team_id`/`year` and fill it from a roster file.
    ///
    /// On drop the player list is released with `cw_roster_cleanup` and the
    /// struct itself with the C runtime's `free`.
    pub fn read(
        library: &Arc<DynamicLibrary>,
        path: impl AsRef<Path>,
        team_id: &str,
        year: i32,
    ) -> ChadwickResult<Self> {
        let path = path.as_ref();
        let c_team = CString::new(team_id)
            .map_err(|_| ChadwickError::InvalidPath(team_id.to_string()))?;
        let blank = CString::default();

        // Safety: the function types mirror the libchadwick prototypes.
        let (create, read, cleanup, free) = unsafe {
            (
                library.function::<RosterCreateFn>(symbols::ROSTER_CREATE)?,
                library.function::<RosterReadFn>(symbols::ROSTER_READ)?,
                library.function::<RosterCleanupFn>(symbols::ROSTER_CLEANUP)?,
                library.function::<FreeFn>(symbols::FREE)?,
            )
        };

        let ptr = unsafe {
            create(
                c_team.as_ptr(),
                year as c_int,
                blank.as_ptr(),
                blank.as_ptr(),
                blank.as_ptr(),
            )
        };
        if ptr.is_null() {
            return Err(ChadwickError::NullPointer(symbols::ROSTER_CREATE));
        }
        let roster = Self {
            storage: Storage::Native {
                ptr,
                cleanup,
                free,
                _library: Arc::clone(library),
            },
        };

        let file = NativeFile::open(library, path, "r")?;
        let ok = unsafe { read(ptr, file.as_ptr()) };
        if ok == 0 {
            return Err(ChadwickError::Roster {
                team_id: team_id.to_string(),
                year,
                path: path.to_path_buf(),
            });
        }
        tracing::debug!(team_id, year, path = %path.display(), "read roster");
        Ok(roster)
    }

    pub fn as_mut_ptr(&mut self) -> *mut CWRoster {
        match &mut self.storage {
            Storage::Empty(roster) => &mut **roster as *mut CWRoster,
            Storage::Native { ptr, .. } => *ptr,
        }
    }

    fn raw(&self) -> &CWRoster {
        match &self.storage {
            Storage::Empty(roster) => &**roster,
            // Safety: non-null and owned by this value until drop.
            Storage::Native { ptr, .. } => unsafe { &**ptr },
        }
    }

    pub fn team_id(&self) -> String {
        unsafe { cstr_lossy(self.raw().team_id) }
    }

    pub fn year(&self) -> i32 {
        self.raw().year
    }

    /// Whether the roster holds at least one player
    pub fn has_players(&self) -> bool {
        !self.raw().first_player.is_null()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for Roster {
    fn drop(&mut self) {
        if let Storage::Native {
            ptr, cleanup, free, ..
        } = self.storage
        {
            // cw_roster_cleanup leaves the malloc'd struct to the caller.
            unsafe {
                cleanup(ptr);
                free(ptr.cast());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_roster() {
        let mut roster = Roster::empty();
        assert!(!roster.as_mut_ptr().is_null());
        assert_eq!(roster.team_id(), "");
        assert_eq!(roster.year(), 0);
        assert!(!roster.has_players());
    }

    #[test]
    fn test_empty_rosters_are_distinct() {
        let mut a = Roster::empty();
        let mut b = Roster::default();
        assert_ne!(a.as_mut_ptr(), b.as_mut_ptr());
    }
}
