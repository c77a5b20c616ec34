//! Chadwick - Rust bindings for libchadwick
//!
//! [Chadwick](https://github.com/chadwickbureau/chadwick) reads Retrosheet
//! play-by-play event files and writes one comma-separated record per event,
//! the way its `cwevent` tool does. This crate loads the shared library at
//! runtime and drives that machinery from Rust; no parsing happens here.
//!
//! # Responsibilities
//!
//! - **Library acquisition**: load `libchadwick` by path, once per process
//! - **Symbol binding**: typed access to the functions and global field tables
//! - **Iteration**: games in a file and events in a game as Rust iterators
//! - **Record translation**: event lines into ordered maps and typed frames
//!
//! # Example
//!
//! ```no_run
//! use chadwick::Chadwick;
//!
//! let cw = Chadwick::new("libchadwick.so")?;
//! cw.set_fields(&["GAME_ID", "INN_CT", "BAT_ID", "EVENT_TX"]);
//!
//! for game in cw.games("2018ANA.EVA")? {
//!     let frame = cw.game_to_frame(&game, None)?;
//!     println!("{}: {} events", game.id(), frame.shape().0);
//! }
//! # Ok::<(), chadwick::ChadwickError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   Chadwick       │  field selection, games, events, frames
//! └────────┬─────────┘
//!          │
//!     ┌────┴──────┐
//!     ▼           ▼
//! ┌────────┐  ┌──────────┐
//! │ fields │  │ file     │  native tables / FILE* lifecycle
//! └───┬────┘  └────┬─────┘
//!     └─────┬──────┘
//!           ▼
//! ┌──────────────────┐
//! │   ffi            │  libloading, symbols, declared signatures
//! └──────────────────┘
//! ```

#![warn(clippy::all)]

pub mod chadwick;
pub mod config;
pub mod error;
pub mod ffi;
pub mod fields;
pub mod file;
pub mod frame;
pub mod logging;
pub mod native;
pub mod record;
pub mod roster;

pub use chadwick::{Chadwick, FileEvents, Game, GameEvents, GameIterator, Games};
pub use config::{ChadwickConfig, ConfigError, ConfigResult};
pub use error::{ChadwickError, ChadwickResult};
pub use ffi::{DynamicLibrary, FfiError, FfiRegistry, FfiSignature, FfiType, FfiValue, LibraryLoader};
pub use fields::{FieldDescriptor, FieldKind, FieldTable, FieldTables};
pub use file::NativeFile;
pub use frame::{
    event_data_types, ColumnType, EventFrame, FrameError, TypeMapping, Value, EVENT_DATA_TYPES,
};
pub use native::{EVENT_BUFFER_SIZE, EXT_FIELDS_COUNT, FIELDS_COUNT};
pub use record::{split_record, EventRecord};
pub use roster::Roster;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
