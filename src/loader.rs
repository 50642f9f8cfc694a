//! Reading the manifest and the sheet files of a data directory.
//!
//! Loading happens on worker threads. Results are posted back to the UI
//! thread as [`Message`]s. Every sheet request is tagged with a
//! [`LoadToken`]; the model only applies the response carrying the most
//! recent token, so a slow load can never overwrite a newer one.

use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Instant;
use tracing::{info, instrument, trace, warn};

use crate::dataset::{Dataset, Record};
use crate::domain::{Message, SheetResponse, ViewerError};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub sheets: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadToken(u64);

pub fn manifest_path(data_dir: &Path) -> PathBuf {
    data_dir.join(MANIFEST_FILE)
}

pub fn sheet_path(data_dir: &Path, sheet: &str) -> PathBuf {
    data_dir.join(format!("{sheet}.json"))
}

fn open(path: &Path) -> Result<BufReader<File>, ViewerError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ViewerError::FileNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => ViewerError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ViewerError::IoError(e),
    })?;
    Ok(BufReader::new(file))
}

#[instrument]
pub fn read_manifest(data_dir: &Path) -> Result<Manifest, ViewerError> {
    let path = manifest_path(data_dir);
    let manifest: Manifest =
        serde_json::from_reader(open(&path)?).map_err(|source| ViewerError::Json {
            path: path.clone(),
            source,
        })?;
    info!("Manifest lists {} sheets", manifest.sheets.len());
    Ok(manifest)
}

/// Read the records of one sheet. Every array element has to be an object.
#[instrument]
pub fn read_sheet(data_dir: &Path, sheet: &str) -> Result<Vec<Record>, ViewerError> {
    let path = sheet_path(data_dir, sheet);
    let rows: Vec<Value> =
        serde_json::from_reader(open(&path)?).map_err(|source| ViewerError::Json {
            path: path.clone(),
            source,
        })?;

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| match row {
            Value::Object(record) => Ok(record),
            _ => Err(ViewerError::InvalidRow {
                path: path.clone(),
                index,
            }),
        })
        .collect()
}

pub fn load_dataset(data_dir: &Path, sheet: &str) -> Result<Dataset, ViewerError> {
    let start_time = Instant::now();
    let records = read_sheet(data_dir, sheet)?;
    let dataset = Dataset::from_records(sheet, records);
    info!(
        "Loading {sheet} took {}ms ...",
        start_time.elapsed().as_millis()
    );
    Ok(dataset)
}

/// Issues load requests for one data directory.
pub struct SheetLoader {
    data_dir: PathBuf,
    tx: Sender<Message>,
    last_token: u64,
}

impl SheetLoader {
    pub fn new(data_dir: PathBuf, tx: Sender<Message>) -> Self {
        Self {
            data_dir,
            tx,
            last_token: 0,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn request_manifest(&self) -> Result<(), ViewerError> {
        let data_dir = self.data_dir.clone();
        let tx = self.tx.clone();
        thread::Builder::new()
            .name("manifest-loader".into())
            .spawn(move || {
                let result = read_manifest(&data_dir);
                if tx.send(Message::ManifestLoaded(result)).is_err() {
                    warn!("Manifest loaded after the viewer went away");
                }
            })?;
        Ok(())
    }

    /// Start loading `sheet`. Pending loads keep running; their responses
    /// carry older tokens.
    pub fn request_sheet(&mut self, sheet: &str) -> Result<LoadToken, ViewerError> {
        self.last_token += 1;
        let token = LoadToken(self.last_token);
        trace!("Requesting {sheet} with {token:?}");

        let data_dir = self.data_dir.clone();
        let tx = self.tx.clone();
        let sheet = sheet.to_string();
        thread::Builder::new()
            .name("sheet-loader".into())
            .spawn(move || {
                let result = load_dataset(&data_dir, &sheet);
                let response = SheetResponse {
                    token,
                    sheet,
                    result,
                };
                if tx.send(Message::SheetLoaded(response)).is_err() {
                    warn!("Sheet loaded after the viewer went away");
                }
            })?;
        Ok(token)
    }
}
