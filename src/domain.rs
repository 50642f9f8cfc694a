use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::dataset::Dataset;
use crate::loader::{LoadToken, Manifest};

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("row {index} in {path} is not an object")]
    InvalidRow { path: PathBuf, index: usize },

    #[error("no sheets found in manifest.json")]
    NoSheets,

    #[error("unknown sheet '{0}'")]
    UnknownSheet(String),

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("cannot expand path '{0}'")]
    PathExpansion(String),

    #[error("failed to set up logging: {0}")]
    Logging(String),

    #[error("loader channel closed")]
    ChannelClosed,
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct ViewerConfig {
    // Milliseconds to wait for a terminal event per frame
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub data_dir: PathBuf,
    pub initial_sheet: Option<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 40,
            data_dir: PathBuf::from("data"),
            initial_sheet: None,
        }
    }
}

#[derive(Debug)]
pub struct SheetResponse {
    pub token: LoadToken,
    pub sheet: String,
    pub result: Result<Dataset, ViewerError>,
}

#[derive(Debug)]
pub enum Message {
    Quit,
    Help,
    Exit,
    Enter,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Search,
    NextSheet,
    PreviousSheet,
    NextEventFilter,
    PreviousEventFilter,
    ToggleOnlyPositive,
    Reload,
    CopyCell,
    CopyRow,
    Resize(usize, usize),
    RawKey(KeyEvent),
    ManifestLoaded(Result<Manifest, ViewerError>),
    SheetLoaded(SheetResponse),
}

pub const NO_FILTER_LABEL: &str = "— no filter —";

pub const HELP_TEXT: &str = "\
 q          quit
 ?          this help, Esc to close
 Esc        clear the search
 /          search all columns (Enter keeps, Esc clears)
 [ ]        previous / next sheet
 e E        next / previous event filter
 p          toggle: only rows that scored in the event
 r          reload the current sheet
 ↑↓←→ hjkl  move
 PgUp PgDn  page up / down
 g G        first / last row
 c          copy cell
 y          copy row as CSV
";
