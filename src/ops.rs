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

//! # Operation engine
//!
//! `read`, `write`, `delete`, `keys`, `dump` and `vacuum`, built on top of
//! the header/index codecs, the lock manager, the journal and the
//! coherence check, with the lock discipline from `spec.md` §5: shared for
//! reads, exclusive for everything that mutates.

use crate::engine::JsonbLite;
use crate::error::{Error, Result};
use crate::header::{Header, HEADER_SIZE, VERSION};
use crate::index::{self, Index};
use crate::journal::{JournalEntry, Operation};
use crate::lock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

impl JsonbLite {
    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            Err(Error::InvalidKey)
        } else {
            Ok(())
        }
    }

    /// `next_timestamp()`: wall-clock milliseconds, or `cached + 1` if that
    /// would not be strictly greater — guarantees `last_modified` advances
    /// even across writes issued faster than the clock's resolution
    /// (`spec.md` §4.6, scenario S5).
    fn next_timestamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        if now > self.header.last_modified {
            now
        } else {
            self.header.last_modified + 1
        }
    }

    /// Read a value by key. `None` if the key is absent.
    pub fn read<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        Self::validate_key(key)?;
        self.recover_before_shared()?;
        let _guard = lock::lock_shared(&self.file)?;
        self.reload_if_stale()?;

        let Some(&(offset, size)) = self.index.get(key) else {
            return Ok(None);
        };
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; size as usize];
        self.file.read_exact(&mut buf)?;
        let value = serde_cbor::from_slice(&buf)
            .map_err(|e| Error::corrupt(format!("stored value for {key:?} failed to decode: {e}")))?;
        Ok(Some(value))
    }

    /// `true` if `key` is present, without decoding its value.
    pub fn contains_key(&mut self, key: &str) -> Result<bool> {
        Self::validate_key(key)?;
        self.recover_before_shared()?;
        let _guard = lock::lock_shared(&self.file)?;
        self.reload_if_stale()?;
        Ok(self.index.contains_key(key))
    }

    /// Write `value` under `key`, overwriting any prior value. The bytes
    /// backing a prior value, if any, become dead and are only reclaimed
    /// by [`vacuum`](Self::vacuum).
    pub fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        Self::validate_key(key)?;
        let _guard = lock::lock_exclusive(&self.file)?;
        self.sync_exclusive()?;

        let v_bytes = serde_cbor::to_vec(value)
            .map_err(|e| Error::corrupt(format!("failed to encode value: {e}")))?;

        let mut new_index = self.index.clone();
        let new_offset = self.header.data_tail();
        new_index.insert(key.to_string(), (new_offset, v_bytes.len() as u64));
        let data_tail = new_offset + v_bytes.len() as u64;

        let encoded_index = index::encode(&new_index)?;
        let new_header = Header {
            version: VERSION,
            index_size: encoded_index.len() as u32,
            data_size: data_tail - HEADER_SIZE,
            last_modified: self.next_timestamp(),
            last_vacuum: self.header.last_vacuum,
        };

        let entry = JournalEntry {
            key: key.to_string(),
            operation: Operation::Write,
            data: Some(v_bytes),
            index: encoded_index,
            header: new_header.encode().to_vec(),
            data_offset: data_tail,
        };
        entry.commit_transaction(&self.path, &mut self.file)?;

        self.index = new_index;
        self.header = new_header;
        if self.verbose {
            log::info!("wrote key {key:?} to {:?}", self.path);
        }
        Ok(())
    }

    /// Remove `key`. Idempotent: deleting an absent key still advances
    /// `last_modified` and writes a journal entry (open question #2,
    /// `spec.md` §9 — the safer choice for cross-handle coherence). The
    /// value's bytes remain on disk until [`vacuum`](Self::vacuum).
    pub fn delete(&mut self, key: &str) -> Result<()> {
        Self::validate_key(key)?;
        let _guard = lock::lock_exclusive(&self.file)?;
        self.sync_exclusive()?;

        let mut new_index = self.index.clone();
        new_index.shift_remove(key);

        let encoded_index = index::encode(&new_index)?;
        let new_header = Header {
            version: VERSION,
            index_size: encoded_index.len() as u32,
            data_size: self.header.data_size,
            last_modified: self.next_timestamp(),
            last_vacuum: self.header.last_vacuum,
        };

        let entry = JournalEntry {
            key: key.to_string(),
            operation: Operation::Delete,
            data: None,
            index: encoded_index,
            header: new_header.encode().to_vec(),
            data_offset: self.header.data_tail(),
        };
        entry.commit_transaction(&self.path, &mut self.file)?;

        self.index = new_index;
        self.header = new_header;
        if self.verbose {
            log::info!("deleted key {key:?} from {:?}", self.path);
        }
        Ok(())
    }

    /// Keys in insertion order, as a snapshot.
    pub fn keys(&mut self) -> Result<Vec<String>> {
        self.recover_before_shared()?;
        let _guard = lock::lock_shared(&self.file)?;
        self.reload_if_stale()?;
        Ok(self.index.keys().cloned().collect())
    }

    /// Number of live keys.
    pub fn len(&mut self) -> Result<usize> {
        self.recover_before_shared()?;
        let _guard = lock::lock_shared(&self.file)?;
        self.reload_if_stale()?;
        Ok(self.index.len())
    }

    /// `true` if the store currently has no keys.
    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The path this handle was opened against.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the store as the JSON document described in `spec.md` §4.6:
    /// `{"meta": {...}, "data": {...}}`, keys in index insertion order.
    pub fn dump(&mut self) -> Result<serde_json::Value> {
        self.recover_before_shared()?;
        let _guard = lock::lock_shared(&self.file)?;
        self.reload_if_stale()?;

        let mut data = serde_json::Map::new();
        for (key, &(offset, size)) in self.index.iter() {
            self.file.seek(SeekFrom::Start(offset))?;
            let mut buf = vec![0u8; size as usize];
            self.file.read_exact(&mut buf)?;
            let value: serde_cbor::Value = serde_cbor::from_slice(&buf).map_err(|e| {
                Error::corrupt(format!("stored value for {key:?} failed to decode: {e}"))
            })?;
            data.insert(key.clone(), crate::cbor_json::cbor_to_json(value));
        }

        let meta = serde_json::json!({
            "version": self.header.version,
            "data_size": self.header.data_size,
            "index_size": self.header.index_size,
            "last_vacuum": self.header.last_vacuum.to_string(),
        });

        Ok(serde_json::json!({ "meta": meta, "data": data }))
    }

    /// Write [`dump`](Self::dump)'s JSON document to `path` as UTF-8.
    pub fn dump_to_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let doc = self.dump()?;
        let text = serde_json::to_string_pretty(&doc)
            .map_err(|e| Error::corrupt(format!("failed to render dump as JSON: {e}")))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Compact: rewrite live values densely into a fresh file and replace
    /// the current one atomically (`spec.md` §4.6). If any step fails the
    /// temp file is removed and the original file is untouched.
    pub fn vacuum(&mut self) -> Result<()> {
        let _guard = lock::lock_exclusive(&self.file)?;
        self.sync_exclusive()?;

        match self.vacuum_inner() {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = std::fs::remove_file(crate::journal::temp_path(&self.path));
                Err(e)
            }
        }
    }

    fn vacuum_inner(&mut self) -> Result<()> {
        let temp_path = crate::journal::temp_path(&self.path);
        let mut temp_file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;

        // placeholder header; overwritten once final sizes are known
        temp_file.write_all(&Header::fresh(0).encode())?;

        let mut new_index = Index::new();
        let mut cursor = HEADER_SIZE;
        for (key, &(offset, size)) in self.index.iter() {
            self.file.seek(SeekFrom::Start(offset))?;
            let mut buf = vec![0u8; size as usize];
            self.file.read_exact(&mut buf)?;
            temp_file.seek(SeekFrom::Start(cursor))?;
            temp_file.write_all(&buf)?;
            new_index.insert(key.clone(), (cursor, size));
            cursor += size;
        }

        let encoded_index = index::encode(&new_index)?;
        let now = self.next_timestamp();
        let new_header = Header {
            version: VERSION,
            index_size: encoded_index.len() as u32,
            data_size: cursor - HEADER_SIZE,
            last_modified: now,
            last_vacuum: now,
        };

        temp_file.seek(SeekFrom::Start(0))?;
        temp_file.write_all(&new_header.encode())?;
        temp_file.seek(SeekFrom::Start(cursor))?;
        temp_file.write_all(&encoded_index)?;
        temp_file.set_len(new_header.file_size())?;
        temp_file.flush()?;
        temp_file.sync_all()?;
        drop(temp_file);

        std::fs::rename(&temp_path, &self.path)?;

        // re-open our handle onto the renamed file: the old `File` object
        // still refers to the pre-rename inode on unix, which is no longer
        // reachable by path, so further offset-based I/O must go through a
        // fresh handle.
        self.file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)?;
        self.index = new_index;
        self.header = new_header;
        if self.verbose {
            log::info!("vacuumed {:?}, data_size now {}", self.path, self.header.data_size);
        }
        Ok(())
    }
}
