//! File-backed persistence.
//!
//! Replica directory layout:
//!
//! ```text
//! <dir>/
//! ├─ LOCK          # advisory lock for single-writer
//! ├─ round.cbor    # active round snapshot
//! ├─ pending.cbor  # pending stroke queue
//! └─ clubs.cbor    # club reference data
//! ```
//!
//! The LOCK file ensures only one process owns a replica directory at a
//! time, which makes the single-writer rule enforceable rather than a
//! convention. All writes use the write-then-rename pattern for crash
//! safety.

use crate::persist::{Persistence, PersistenceError, PersistenceResult, ReferenceData};
use fs2::FileExt;
use roundlink_model::{Club, ClubType, Round, Stroke};
use roundlink_protocol::{from_cbor, to_cbor};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const ROUND_FILE: &str = "round.cbor";
const PENDING_FILE: &str = "pending.cbor";
const REFERENCE_FILE: &str = "clubs.cbor";
const TEMP_SUFFIX: &str = ".tmp";

/// Durable storage rooted in a replica directory.
///
/// Holds an exclusive advisory lock on the directory for its lifetime;
/// opening a second instance on the same directory fails with
/// [`PersistenceError::Locked`].
#[derive(Debug)]
pub struct FilePersistence {
    /// Root directory path.
    dir: PathBuf,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl FilePersistence {
    /// Opens or creates a replica directory and acquires its lock.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Locked`] if another process holds the
    /// lock, or an I/O error if the directory cannot be created.
    pub fn open(dir: &Path) -> PersistenceResult<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }

        let lock_path = dir.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        // Non-blocking: a held lock means another replica process.
        if lock_file.try_lock_exclusive().is_err() {
            return Err(PersistenceError::Locked);
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the replica directory path.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a file atomically: temp file, fsync, rename, fsync dir.
    fn write_atomic(&self, name: &str, bytes: &[u8]) -> PersistenceResult<()> {
        let path = self.dir.join(name);
        let temp_path = self.dir.join(format!("{name}{TEMP_SUFFIX}"));

        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &path)?;
        self.sync_directory()?;

        Ok(())
    }

    /// Reads a whole file, or `None` if it does not exist.
    fn read_opt(&self, name: &str) -> PersistenceResult<Option<Vec<u8>>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        if data.is_empty() {
            return Ok(None);
        }
        Ok(Some(data))
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> PersistenceResult<()> {
        // On Unix, fsync on a directory syncs the directory entries.
        let dir = File::open(&self.dir)?;
        dir.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> PersistenceResult<()> {
        // NTFS journaling provides metadata durability; directory fsync
        // is not supported on Windows.
        Ok(())
    }
}

impl Persistence for FilePersistence {
    fn save_round(&self, round: &Round) -> PersistenceResult<()> {
        let bytes = to_cbor(round)?;
        self.write_atomic(ROUND_FILE, &bytes)
    }

    fn load_round(&self) -> PersistenceResult<Option<Round>> {
        match self.read_opt(ROUND_FILE)? {
            Some(bytes) => Ok(Some(from_cbor(&bytes)?)),
            None => Ok(None),
        }
    }

    fn clear_round(&self) -> PersistenceResult<()> {
        let path = self.dir.join(ROUND_FILE);
        if path.exists() {
            fs::remove_file(&path)?;
            self.sync_directory()?;
        }
        Ok(())
    }

    fn save_pending(&self, strokes: &[Stroke]) -> PersistenceResult<()> {
        let bytes = to_cbor(&strokes.to_vec())?;
        self.write_atomic(PENDING_FILE, &bytes)
    }

    fn load_pending(&self) -> PersistenceResult<Vec<Stroke>> {
        match self.read_opt(PENDING_FILE)? {
            Some(bytes) => Ok(from_cbor(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_reference(&self, clubs: &[Club], club_types: &[ClubType]) -> PersistenceResult<()> {
        let data = ReferenceData {
            clubs: clubs.to_vec(),
            club_types: club_types.to_vec(),
        };
        let bytes = to_cbor(&data)?;
        self.write_atomic(REFERENCE_FILE, &bytes)
    }

    fn load_reference(&self) -> PersistenceResult<(Vec<Club>, Vec<ClubType>)> {
        match self.read_opt(REFERENCE_FILE)? {
            Some(bytes) => {
                let data: ReferenceData = from_cbor(&bytes)?;
                Ok((data.clubs, data.club_types))
            }
            None => Ok((Vec::new(), Vec::new())),
        }
    }
}
