//! The Chadwick binding object
//!
//! [`Chadwick`] owns a handle to libchadwick, views over its two field
//! tables, and drives its reader:
//!
//! ```text
//! fopen ─► cw_game_read ─► cw_gameiter_create ─► cwevent_process_game_record
//!   │            │                │                      │
//!   ▼            ▼                ▼                      ▼
//! NativeFile   Game          GameIterator           EventRecord
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut cw = Chadwick::new("libchadwick.so")?;
//! cw.set_fields(&["GAME_ID", "INN_CT", "EVENT_TX"]);
//! for game in cw.games("2018ANA.EVA")? {
//!     for event in cw.process_game(&game, None, None)? {
//!         println!("{}", event);
//!     }
//! }
//! ```

use std::ffi::CString;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Arc;

use crate::config::ChadwickConfig;
use crate::error::{ChadwickError, ChadwickResult};
use crate::fields::{cstr_lossy, FieldDescriptor, FieldTables};
use crate::ffi::{shared_library, DynamicLibrary, FfiRegistry, FfiSignature, FfiValue};
use crate::file::NativeFile;
use crate::frame::{event_data_types, ColumnType, EventFrame};
use crate::native::{
    symbols, CWGame, CWGameIterator, GameInfoLookupFn, GameIterCreateFn, GameIterNextFn,
    GameReadFn, ProcessGameRecordFn, EVENT_BUFFER_SIZE,
};
use crate::record::EventRecord;
use crate::roster::Roster;

/// Binding to one loaded libchadwick
pub struct Chadwick {
    library_path: PathBuf,
    library: Arc<DynamicLibrary>,
    tables: Arc<FieldTables>,
    registry: FfiRegistry,
}

impl Chadwick {
    /// Load the library at `path` and enable every field.
    pub fn new(path: impl AsRef<Path>) -> ChadwickResult<Self> {
        let library_path = path.as_ref().to_path_buf();
        let library = shared_library(&library_path)?;
        let tables = Arc::new(FieldTables::from_library(&library)?);
        let registry = FfiRegistry::new(Arc::clone(&library));

        let cw = Self {
            library_path,
            library,
            tables,
            registry,
        };
        cw.set_all_headers();
        Ok(cw)
    }

    /// Load the library named by `config` and apply its field selection.
    pub fn from_config(config: &ChadwickConfig) -> ChadwickResult<Self> {
        let cw = Self::new(config.resolve_library())?;
        if !config.fields.enabled.is_empty() {
            cw.set_fields(&config.fields.enabled);
        }
        Ok(cw)
    }

    pub fn library_path(&self) -> &Path {
        &self.library_path
    }

    pub fn library(&self) -> &Arc<DynamicLibrary> {
        &self.library
    }

    pub fn fields(&self) -> &FieldTables {
        &self.tables
    }

    // ------------------------------------------------------------------
    // Field selection
    // ------------------------------------------------------------------

    pub fn cwevent_headers(&self) -> &[String] {
        self.tables.standard.headers()
    }

    pub fn cwevent_ext_headers(&self) -> &[String] {
        self.tables.extended.headers()
    }

    pub fn all_headers(&self) -> Vec<String> {
        self.tables.all_headers()
    }

    pub fn set_all_headers(&self) {
        self.tables.set_all(1);
    }

    pub fn set_event_field(&self, field_name: &str) -> bool {
        self.set_event_field_value(field_name, 1)
    }

    pub fn unset_event_field(&self, field_name: &str) -> bool {
        self.set_event_field_value(field_name, 0)
    }

    /// Write the enabled flag for `field_name`.
    ///
    /// The standard table is searched before the extended one. Returns
    /// `false`, after logging a warning, when no field has that name.
    pub fn set_event_field_value(&self, field_name: &str, value: i32) -> bool {
        self.tables.set_value(field_name, value)
    }

    /// Enable exactly `field_names`; returns the names that matched nothing.
    pub fn set_fields<S: AsRef<str>>(&self, field_names: &[S]) -> Vec<String> {
        self.tables.select(field_names)
    }

    /// Headers that will appear in event records, in output order
    pub fn active_headers(&self) -> Vec<String> {
        self.tables.active_headers()
    }

    pub fn field_descriptors(&self) -> Vec<FieldDescriptor> {
        self.tables.descriptors()
    }

    // ------------------------------------------------------------------
    // Files and games
    // ------------------------------------------------------------------

    pub fn fopen(&self, path: impl AsRef<Path>, mode: &str) -> ChadwickResult<NativeFile> {
        NativeFile::open(&self.library, path, mode)
    }

    /// Games in an event file, read lazily.
    pub fn games(&self, path: impl AsRef<Path>) -> ChadwickResult<Games> {
        // Safety: mirrors `CWGame *cw_game_read(FILE *)`.
        let read = unsafe { self.library.function::<GameReadFn>(symbols::GAME_READ)? };
        let file = self.fopen(path, "r")?;
        Ok(Games {
            library: Arc::clone(&self.library),
            file,
            read,
            count: 0,
        })
    }

    /// `cw_gameiter_create` positioned on the game's first event
    pub fn game_iterator(&self, game: &Game) -> ChadwickResult<GameIterator> {
        // Safety: mirror the libchadwick prototypes.
        let (create, next) = unsafe {
            (
                self.library
                    .function::<GameIterCreateFn>(symbols::GAMEITER_CREATE)?,
                self.library.function::<GameIterNextFn>(symbols::GAMEITER_NEXT)?,
            )
        };
        let ptr = unsafe { create(game.as_ptr()) };
        let ptr = NonNull::new(ptr).ok_or(ChadwickError::NullPointer(symbols::GAMEITER_CREATE))?;
        Ok(GameIterator {
            ptr,
            next,
            _library: Arc::clone(&self.library),
        })
    }

    /// Events of one game as records keyed by the active headers.
    ///
    /// Headers are read again for every event, so a field selection changed
    /// mid-game applies to the records that follow.
    ///
    /// A missing roster is replaced by an empty one, with a warning.
    pub fn process_game<'r>(
        &self,
        game: &Game,
        roster_visitor: Option<&'r mut Roster>,
        roster_home: Option<&'r mut Roster>,
    ) -> ChadwickResult<GameEvents<'r>> {
        let visitor = RosterSlot::from_option(roster_visitor, "visitor");
        let home = RosterSlot::from_option(roster_home, "home");
        self.game_events(game, visitor, home)
    }

    fn game_events<'r>(
        &self,
        game: &Game,
        visitor: RosterSlot<'r>,
        home: RosterSlot<'r>,
    ) -> ChadwickResult<GameEvents<'r>> {
        // Safety: mirrors `void cwevent_process_game_record(CWGameIterator *,
        // CWRoster *, CWRoster *, char *)`.
        let process = unsafe {
            self.library
                .function::<ProcessGameRecordFn>(symbols::PROCESS_GAME_RECORD)?
        };
        let iter = self.game_iterator(game)?;
        Ok(GameEvents {
            iter,
            process,
            visitor,
            home,
            tables: Arc::clone(&self.tables),
            buffer: vec![0; EVENT_BUFFER_SIZE],
        })
    }

    /// Every event of every game in `path`, with empty rosters.
    pub fn events(&self, path: impl AsRef<Path>) -> ChadwickResult<FileEvents<'_>> {
        Ok(FileEvents {
            chadwick: self,
            games: self.games(path)?,
            current: None,
        })
    }

    /// One game's events as a typed frame.
    ///
    /// `mapping` defaults to [`crate::frame::EVENT_DATA_TYPES`].
    pub fn game_to_frame(
        &self,
        game: &Game,
        mapping: Option<&[(String, ColumnType)]>,
    ) -> ChadwickResult<EventFrame> {
        let records: Vec<EventRecord> = self.process_game(game, None, None)?.collect();
        let mut frame = EventFrame::from_records(&records);
        match mapping {
            Some(mapping) => frame.convert_types(mapping)?,
            None => frame.convert_types(&event_data_types())?,
        }
        Ok(frame)
    }

    pub fn read_roster(
        &self,
        path: impl AsRef<Path>,
        team_id: &str,
        year: i32,
    ) -> ChadwickResult<Roster> {
        Roster::read(&self.library, path, team_id, year)
    }

    // ------------------------------------------------------------------
    // Runtime-declared functions
    // ------------------------------------------------------------------

    /// Declare another libchadwick function for [`Chadwick::call`].
    pub fn register_function(&mut self, signature: FfiSignature) -> ChadwickResult<&FfiSignature> {
        Ok(self.registry.register(signature)?)
    }

    /// Call a function declared with [`Chadwick::register_function`].
    ///
    /// # Safety
    ///
    /// The declared signature must match the native function and the
    /// arguments must be valid for it.
    pub unsafe fn call(&self, name: &str, args: &[FfiValue]) -> ChadwickResult<FfiValue> {
        Ok(self.registry.call(name, args)?)
    }

    pub fn registered_functions(&self) -> Vec<&FfiSignature> {
        self.registry.list()
    }
}

/// A game read from an event file.
///
/// The record stays allocated inside the library for the life of the
/// process.
#[derive(Clone)]
pub struct Game {
    ptr: NonNull<CWGame>,
    library: Arc<DynamicLibrary>,
}

impl Game {
    pub fn as_ptr(&self) -> *mut CWGame {
        self.ptr.as_ptr()
    }

    /// Game id, e.g. `ANA201804020`
    pub fn id(&self) -> String {
        unsafe { cstr_lossy((*self.ptr.as_ptr()).game_id) }
    }

    /// Event file format version
    pub fn version(&self) -> String {
        unsafe { cstr_lossy((*self.ptr.as_ptr()).version) }
    }

    /// Value of an `info` record such as `visteam`, `hometeam` or `date`.
    pub fn info(&self, label: &str) -> ChadwickResult<Option<String>> {
        let c_label =
            CString::new(label).map_err(|_| ChadwickError::InvalidPath(label.to_string()))?;
        // Safety: mirrors `char *cw_game_info_lookup(CWGame *, char *)`.
        let lookup = unsafe {
            self.library
                .function::<GameInfoLookupFn>(symbols::GAME_INFO_LOOKUP)?
        };
        let value: *mut c_char = unsafe { lookup(self.as_ptr(), c_label.as_ptr()) };
        if value.is_null() {
            Ok(None)
        } else {
            Ok(Some(unsafe { cstr_lossy(value) }))
        }
    }
}

/// Lazy sequence of games in one file.
///
/// Ends at end of file or when the reader returns null; the file is closed
/// at that point, or when the sequence is dropped.
pub struct Games {
    library: Arc<DynamicLibrary>,
    file: NativeFile,
    read: GameReadFn,
    count: usize,
}

impl Games {
    /// Games returned so far
    pub fn count_read(&self) -> usize {
        self.count
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Iterator for Games {
    type Item = Game;

    fn next(&mut self) -> Option<Game> {
        if self.file.eof() {
            self.file.close();
            return None;
        }

        let ptr = unsafe { (self.read)(self.file.as_ptr()) };
        match NonNull::new(ptr) {
            Some(ptr) => {
                self.count += 1;
                Some(Game {
                    ptr,
                    library: Arc::clone(&self.library),
                })
            }
            None => {
                tracing::debug!(path = %self.file.path().display(), games = self.count, "no more games");
                self.file.close();
                None
            }
        }
    }
}

/// Position within one game's events
pub struct GameIterator {
    ptr: NonNull<CWGameIterator>,
    next: GameIterNextFn,
    _library: Arc<DynamicLibrary>,
}

impl GameIterator {
    pub fn as_ptr(&self) -> *mut CWGameIterator {
        self.ptr.as_ptr()
    }

    /// Whether the iterator is on an event
    pub fn has_event(&self) -> bool {
        unsafe { !(*self.ptr.as_ptr()).event.is_null() }
    }

    /// `cw_gameiter_next`
    pub fn advance(&mut self) {
        unsafe { (self.next)(self.ptr.as_ptr()) }
    }
}

enum RosterSlot<'r> {
    Borrowed(&'r mut Roster),
    Owned(Roster),
}

impl<'r> RosterSlot<'r> {
    fn from_option(roster: Option<&'r mut Roster>, side: &str) -> Self {
        match roster {
            Some(r) => RosterSlot::Borrowed(r),
            None => {
                tracing::warn!("roster for {} is undefined.", side);
                RosterSlot::Owned(Roster::empty())
            }
        }
    }

    fn as_mut_ptr(&mut self) -> *mut crate::native::CWRoster {
        match self {
            RosterSlot::Borrowed(r) => r.as_mut_ptr(),
            RosterSlot::Owned(r) => r.as_mut_ptr(),
        }
    }
}

/// Lazy sequence of one game's event records
pub struct GameEvents<'r> {
    iter: GameIterator,
    process: ProcessGameRecordFn,
    visitor: RosterSlot<'r>,
    home: RosterSlot<'r>,
    tables: Arc<FieldTables>,
    buffer: Vec<u8>,
}

impl GameEvents<'_> {
    /// Headers the next record will be keyed by
    pub fn headers(&self) -> Vec<String> {
        self.tables.active_headers()
    }
}

impl Iterator for GameEvents<'_> {
    type Item = EventRecord;

    fn next(&mut self) -> Option<EventRecord> {
        while self.iter.has_event() {
            self.buffer.fill(0);
            unsafe {
                (self.process)(
                    self.iter.as_ptr(),
                    self.visitor.as_mut_ptr(),
                    self.home.as_mut_ptr(),
                    self.buffer.as_mut_ptr().cast(),
                )
            };
            self.iter.advance();

            // Events that produce no output (e.g. comments) leave the buffer empty.
            if self.buffer[0] != 0 {
                let headers = self.tables.active_headers();
                return Some(EventRecord::from_bytes(&self.buffer, &headers));
            }
        }
        None
    }
}

/// Every event of every game in one file
pub struct FileEvents<'c> {
    chadwick: &'c Chadwick,
    games: Games,
    current: Option<GameEvents<'static>>,
}

impl Iterator for FileEvents<'_> {
    type Item = ChadwickResult<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.current.as_mut().and_then(Iterator::next) {
                return Some(Ok(event));
            }
            let game = self.games.next()?;
            let events = self.chadwick.game_events(
                &game,
                RosterSlot::Owned(Roster::empty()),
                RosterSlot::Owned(Roster::empty()),
            );
            match events {
                Ok(events) => self.current = Some(events),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
