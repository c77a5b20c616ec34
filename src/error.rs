//! Error type for the Chadwick binding.

use std::path::PathBuf;

use thiserror::Error;

use crate::ffi::FfiError;
use crate::frame::FrameError;

#[derive(Debug, Error)]
pub enum ChadwickError {
    #[error(transparent)]
    Ffi(#[from] FfiError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Cannot open '{}' with mode '{mode}'", .path.display())]
    Open { path: PathBuf, mode: String },

    #[error("Path or mode contains a NUL byte: {0:?}")]
    InvalidPath(String),

    #[error("Native call {0} returned null")]
    NullPointer(&'static str),

    #[error("Cannot read roster for {team_id} {year} from '{}'", .path.display())]
    Roster {
        team_id: String,
        year: i32,
        path: PathBuf,
    },
}

pub type ChadwickResult<T> = Result<T, ChadwickError>;
