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

//! # Initialization
//!
//! Creates a fresh file with a valid empty image when none exists; opens
//! and validates an existing file, running crash recovery first if a
//! journal is present (`spec.md` §4.7).

use crate::error::{Error, Result};
use crate::header::{Header, HEADER_SIZE};
use crate::index::{self, Index};
use crate::journal;
use crate::lock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// An open handle onto a JSONBLite file.
///
/// A handle caches `header` and `index` in memory; they are kept coherent
/// with the on-disk image by a sync pass (see the `sync` module) before
/// every operation. Handles are not `Send`/`Sync` by design: `spec.md` §5 forbids
/// concurrent writers sharing a handle, and the caller must not reenter an
/// operation on the same handle.
pub struct JsonbLite {
    pub(crate) path: PathBuf,
    pub(crate) file: File,
    pub(crate) header: Header,
    pub(crate) index: Index,
    pub(crate) verbose: bool,
}

impl std::fmt::Debug for JsonbLite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonbLite")
            .field("path", &self.path)
            .field("keys", &self.index.len())
            .field("last_modified", &self.header.last_modified)
            .field("last_vacuum", &self.header.last_vacuum)
            .finish()
    }
}

impl JsonbLite {
    pub fn open(path: impl AsRef<Path>, verbose: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            Self::open_existing(path, verbose)
        } else {
            Self::open_fresh(path, verbose)
        }
    }

    fn open_fresh(path: PathBuf, verbose: bool) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        let _guard = lock::lock_exclusive(&file)?;

        let index = Index::new();
        let encoded_index = index::encode(&index)?;
        let header = Header::fresh(encoded_index.len() as u32);

        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header.encode())?;
        debug_assert_eq!(header.data_size, 0, "a fresh store has an empty data region");
        file.write_all(&encoded_index)?;
        file.flush()?;
        file.sync_all()?;

        if verbose {
            log::info!("initialized new jsonblite store at {path:?}");
        }

        Ok(Self {
            path,
            file,
            header,
            index,
            verbose,
        })
    }

    fn open_existing(path: PathBuf, verbose: bool) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let _guard = lock::lock_exclusive(&file)?;

        match journal::recover(&path, &mut file) {
            Ok(_) => {}
            Err(Error::JournalCorrupt(reason)) => {
                log::warn!("ignoring corrupt journal for {path:?}: {reason}");
            }
            Err(e) => return Err(e),
        }

        let (header, index) = Self::read_image(&mut file)?;

        if verbose {
            log::info!("opened existing jsonblite store at {path:?} ({} keys)", index.len());
        }

        Ok(Self {
            path,
            file,
            header,
            index,
            verbose,
        })
    }

    /// Read header + index off `file` from the current (trusted) on-disk
    /// state, validating file size and index bounds.
    pub(crate) fn read_image(file: &mut File) -> Result<(Header, Index)> {
        file.seek(SeekFrom::Start(0))?;
        let mut header_buf = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header_buf)
            .map_err(|_| Error::corrupt("file shorter than the 36-byte header"))?;
        let header = Header::decode(&header_buf)?;

        let actual_len = file.metadata()?.len();
        if actual_len != header.file_size() {
            return Err(Error::corrupt(format!(
                "file length {actual_len} does not match header-declared size {}",
                header.file_size()
            )));
        }

        let mut index_buf = vec![0u8; header.index_size as usize];
        file.seek(SeekFrom::Start(header.data_tail()))?;
        file.read_exact(&mut index_buf)
            .map_err(|_| Error::corrupt("index region extends beyond file end"))?;
        let index = index::decode(&index_buf, header.data_size)?;

        Ok((header, index))
    }
}
