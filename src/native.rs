//! Memory layout of the libchadwick structures and globals the binding
//! touches.
//!
//! Structures the binding only ever receives from the library are mirrored
//! up to the last field it reads; they are never allocated on the Rust side.
//! `CWRoster` is mirrored in full because an empty roster is allocated here.

use std::os::raw::{c_char, c_int};

/// Rows in `cwevent_field_data` / entries in `fields`.
pub const FIELDS_COUNT: usize = 96;

/// Rows in `cwevent_ext_field_data` / entries in `ext_fields`.
pub const EXT_FIELDS_COUNT: usize = 63;

/// Size of the output buffer handed to `cwevent_process_game_record`.
pub const EVENT_BUFFER_SIZE: usize = 4096;

/// Exported symbol names.
pub mod symbols {
    pub const FIELD_DATA: &str = "cwevent_field_data";
    pub const FIELDS: &str = "fields";
    pub const EXT_FIELD_DATA: &str = "cwevent_ext_field_data";
    pub const EXT_FIELDS: &str = "ext_fields";

    pub const FOPEN: &str = "fopen";
    pub const FCLOSE: &str = "fclose";
    pub const FEOF: &str = "feof";
    pub const FREE: &str = "free";

    pub const GAME_READ: &str = "cw_game_read";
    pub const GAME_INFO_LOOKUP: &str = "cw_game_info_lookup";
    pub const GAMEITER_CREATE: &str = "cw_gameiter_create";
    pub const GAMEITER_NEXT: &str = "cw_gameiter_next";
    pub const PROCESS_GAME_RECORD: &str = "cwevent_process_game_record";

    pub const ROSTER_CREATE: &str = "cw_roster_create";
    pub const ROSTER_READ: &str = "cw_roster_read";
    pub const ROSTER_CLEANUP: &str = "cw_roster_cleanup";
}

/// `CWEvent`; only ever handled by pointer.
#[repr(C)]
pub struct CWEvent {
    _private: [u8; 0],
}

/// `CWPlayer`; only ever handled by pointer.
#[repr(C)]
pub struct CWPlayer {
    _private: [u8; 0],
}

/// Leading fields of `CWGame`.
#[repr(C)]
pub struct CWGame {
    pub game_id: *mut c_char,
    pub version: *mut c_char,
}

/// Leading fields of `CWGameIterator`.
#[repr(C)]
pub struct CWGameIterator {
    pub game: *mut CWGame,
    /// Current event; null once the game is exhausted.
    pub event: *mut CWEvent,
}

/// `CWRoster`.
#[repr(C)]
pub struct CWRoster {
    pub team_id: *mut c_char,
    pub city: *mut c_char,
    pub nickname: *mut c_char,
    pub league: *mut c_char,
    pub year: c_int,
    pub first_player: *mut CWPlayer,
    pub last_player: *mut CWPlayer,
    pub prev: *mut CWRoster,
    pub next: *mut CWRoster,
}

impl Default for CWRoster {
    fn default() -> Self {
        Self {
            team_id: std::ptr::null_mut(),
            city: std::ptr::null_mut(),
            nickname: std::ptr::null_mut(),
            league: std::ptr::null_mut(),
            year: 0,
            first_player: std::ptr::null_mut(),
            last_player: std::ptr::null_mut(),
            prev: std::ptr::null_mut(),
            next: std::ptr::null_mut(),
        }
    }
}

/// Writes one field of the current event into the output buffer.
pub type FieldFn = unsafe extern "C" fn(
    buffer: *mut c_char,
    gameiter: *mut CWGameIterator,
    visitors: *mut CWRoster,
    home: *mut CWRoster,
) -> c_int;

/// One row of `cwevent_field_data` / `cwevent_ext_field_data`.
#[repr(C)]
pub struct CWEventFieldStruct {
    pub f: Option<FieldFn>,
    pub header: *const c_char,
    pub description: *const c_char,
}

/// The standard and extended descriptor tables with their flag arrays.
pub type FieldData = [CWEventFieldStruct; FIELDS_COUNT];
pub type FieldFlags = [c_int; FIELDS_COUNT];
pub type ExtFieldData = [CWEventFieldStruct; EXT_FIELDS_COUNT];
pub type ExtFieldFlags = [c_int; EXT_FIELDS_COUNT];

pub type FopenFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut libc::FILE;
pub type FcloseFn = unsafe extern "C" fn(*mut libc::FILE) -> c_int;
pub type FeofFn = unsafe extern "C" fn(*mut libc::FILE) -> c_int;
pub type FreeFn = unsafe extern "C" fn(*mut libc::c_void);

pub type GameReadFn = unsafe extern "C" fn(*mut libc::FILE) -> *mut CWGame;
pub type GameInfoLookupFn = unsafe extern "C" fn(*mut CWGame, *const c_char) -> *mut c_char;
pub type GameIterCreateFn = unsafe extern "C" fn(*mut CWGame) -> *mut CWGameIterator;
pub type GameIterNextFn = unsafe extern "C" fn(*mut CWGameIterator);
pub type ProcessGameRecordFn =
    unsafe extern "C" fn(*mut CWGameIterator, *mut CWRoster, *mut CWRoster, *mut c_char);

pub type RosterCreateFn = unsafe extern "C" fn(
    team_id: *const c_char,
    year: c_int,
    league: *const c_char,
    city: *const c_char,
    nickname: *const c_char,
) -> *mut CWRoster;
pub type RosterReadFn = unsafe extern "C" fn(*mut CWRoster, *mut libc::FILE) -> c_int;
pub type RosterCleanupFn = unsafe extern "C" fn(*mut CWRoster);
