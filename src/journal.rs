/*
 * Created on Tue Jul 28 2026
 *
 * This file is a part of JSONBLite
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! # Write-ahead journal & crash recovery
//!
//! A single CBOR-encoded record at `<db>.journal` describing one pending
//! transaction. Its presence means the previous mutating operation did not
//! reach its commit point; replaying it is idempotent because every field
//! it carries fully determines the bytes a positional overwrite will
//! produce (`spec.md` §4.4).

use crate::error::{Error, Result};
use crate::header::HEADER_SIZE;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Write,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Advisory, for debugging only; not relied upon by recovery.
    pub key: String,
    pub operation: Operation,
    pub data: Option<Vec<u8>>,
    pub index: Vec<u8>,
    pub header: Vec<u8>,
    pub data_offset: u64,
}

impl JournalEntry {
    pub fn journal_path(db_path: &Path) -> PathBuf {
        append_extension(db_path, "journal")
    }

    /// Step 1 of the write protocol: the commit point. If interrupted here,
    /// the next open sees either no journal (lost, but never durable) or a
    /// truncated one (treated as absent).
    pub fn begin(&self, db_path: &Path) -> Result<()> {
        let encoded = serde_cbor::to_vec(self)
            .map_err(|e| Error::corrupt(format!("failed to encode journal: {e}")))?;
        let journal_path = Self::journal_path(db_path);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(journal_path)?;
        file.write_all(&encoded)?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }

    /// Step 2: apply this entry's effects to the db file. Purely positional
    /// overwrites, safe to repeat.
    pub fn apply(&self, db_file: &mut File) -> Result<()> {
        if self.operation == Operation::Write {
            let data = self
                .data
                .as_ref()
                .ok_or_else(|| Error::corrupt("write journal entry missing data"))?;
            let value_offset = self.data_offset - data.len() as u64;
            db_file.seek(SeekFrom::Start(value_offset))?;
            db_file.write_all(data)?;
        }
        if self.header.len() as u64 != HEADER_SIZE {
            return Err(Error::corrupt("journal header is not 36 bytes"));
        }
        db_file.seek(SeekFrom::Start(0))?;
        db_file.write_all(&self.header)?;
        db_file.seek(SeekFrom::Start(self.data_offset))?;
        db_file.write_all(&self.index)?;
        // a delete (or any index shrink) can move the index region earlier
        // than the file's previous end; truncate so no stale tail remains.
        db_file.set_len(self.data_offset + self.index.len() as u64)?;
        db_file.flush()?;
        db_file.sync_all()?;
        Ok(())
    }

    /// Step 3: remove the journal, marking the transaction durably committed.
    pub fn commit(db_path: &Path) -> Result<()> {
        let journal_path = Self::journal_path(db_path);
        match fs::remove_file(journal_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Run the full write protocol against an already exclusively-locked db
    /// file handle.
    pub fn commit_transaction(&self, db_path: &Path, db_file: &mut File) -> Result<()> {
        self.begin(db_path)?;
        self.apply(db_file)?;
        Self::commit(db_path)
    }
}

/// If a journal file exists at `db_path`, replay it against `db_file` and
/// remove it. A journal that exists but fails to decode is treated as
/// absent (`JournalCorrupt`, logged, original file untouched). Returns
/// `true` if a journal was found (decodable or not).
pub fn recover(db_path: &Path, db_file: &mut File) -> Result<bool> {
    let journal_path = JournalEntry::journal_path(db_path);
    let bytes = match fs::read(&journal_path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let entry: JournalEntry = match serde_cbor::from_slice(&bytes) {
        Ok(e) => e,
        Err(e) => {
            let reason = format!("{e}");
            log::warn!("discarding unreadable journal at {journal_path:?}: {reason}");
            // best-effort: the journal never reached a consistent state, so the db
            // file was never touched for this transaction. Drop the stray file.
            let _ = fs::remove_file(&journal_path);
            return Err(Error::journal_corrupt(reason));
        }
    };
    entry.apply(db_file)?;
    JournalEntry::commit(db_path)?;
    Ok(true)
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

pub fn temp_path(db_path: &Path) -> PathBuf {
    append_extension(db_path, "temp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;
    use std::io::Read as _;

    fn open_rw(path: &Path) -> File {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .unwrap()
    }

    #[test]
    fn replay_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("a.db");
        let mut file = open_rw(&db_path);
        let header = Header::fresh(3).encode().to_vec();
        let entry = JournalEntry {
            key: "k".into(),
            operation: Operation::Write,
            data: Some(b"abc".to_vec()),
            index: vec![0xa0],
            header,
            data_offset: HEADER_SIZE + 3,
        };
        entry.apply(&mut file).unwrap();
        let mut first = Vec::new();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.read_to_end(&mut first).unwrap();

        entry.apply(&mut file).unwrap();
        let mut second = Vec::new();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.read_to_end(&mut second).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn recover_with_no_journal_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("a.db");
        let mut file = open_rw(&db_path);
        assert!(!recover(&db_path, &mut file).unwrap());
    }

    #[test]
    fn recover_replays_and_removes_journal() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("a.db");
        let mut file = open_rw(&db_path);
        let header = Header::fresh(1).encode().to_vec();
        let entry = JournalEntry {
            key: "k".into(),
            operation: Operation::Write,
            data: Some(b"x".to_vec()),
            index: vec![0xa0],
            header,
            data_offset: HEADER_SIZE + 1,
        };
        entry.begin(&db_path).unwrap();
        assert!(JournalEntry::journal_path(&db_path).exists());
        assert!(recover(&db_path, &mut file).unwrap());
        assert!(!JournalEntry::journal_path(&db_path).exists());
    }

    #[test]
    fn corrupt_journal_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("a.db");
        let mut file = open_rw(&db_path);
        fs::write(JournalEntry::journal_path(&db_path), b"not cbor \xff\xfe").unwrap();
        let result = recover(&db_path, &mut file);
        assert!(matches!(result, Err(Error::JournalCorrupt(_))));
    }
}
