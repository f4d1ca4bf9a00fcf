//! Crash backup of the vehicle state.
//!
//! One file holding the roster followed by the ticket table, both in the
//! shared codec. Writes go to a sibling temp file that is renamed over the
//! backup, so a crash mid-write leaves the previous backup intact.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fare_types::{decode, encode, CodecError, PassengerRoster};
use fc_01_ticket_table::TicketTable;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Backup I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Backup is corrupt: {0}")]
    Codec(#[from] CodecError),
}

/// Roster and tickets as restored from a backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub roster: PassengerRoster,
    pub table: TicketTable,
}

#[derive(Debug, Clone)]
pub struct BackupStore {
    path: PathBuf,
}

impl BackupStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `roster` then `table`, replacing any previous backup.
    pub fn save(&self, roster: &PassengerRoster, table: &TicketTable) -> Result<(), BackupError> {
        let bytes = encode(&(roster, table))?;
        let staging = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&staging)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&staging, &self.path)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Backup written");
        Ok(())
    }

    /// Read the backup. A missing file is a cold start, not an error.
    pub fn load(&self) -> Result<Option<Snapshot>, BackupError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let (roster, table): (PassengerRoster, TicketTable) = decode(&bytes)?;
        info!(
            path = %self.path.display(),
            passengers = roster.len(),
            tickets = table.len(),
            "Backup restored"
        );
        Ok(Some(Snapshot { roster, table }))
    }
}
