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

//! # Coherence
//!
//! Detects that another process (or another handle in this process) has
//! mutated the file since this handle last looked, via the `last_modified`
//! stamp in the header, and rebuilds in-memory state from disk when it has
//! (`spec.md` §4.5).

use crate::engine::JsonbLite;
use crate::error::{Error, Result};
use crate::journal;
use std::io::{Read, Seek, SeekFrom};

impl JsonbLite {
    /// Run recovery if a journal is present, swallowing a corrupt journal
    /// as "no journal" (it is logged, not surfaced, per `spec.md` §7).
    /// Must be called while holding the exclusive lock: recovery writes.
    pub(crate) fn recover_if_needed(&mut self) -> Result<()> {
        match journal::recover(&self.path, &mut self.file) {
            Ok(found) => {
                if found {
                    let (header, index) = Self::read_image(&mut self.file)?;
                    self.header = header;
                    self.index = index;
                }
                Ok(())
            }
            Err(Error::JournalCorrupt(reason)) => {
                log::warn!("ignoring corrupt journal for {:?}: {reason}", self.path);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Compare the on-disk `last_modified` stamp against the cached value;
    /// reload header + index from disk if they differ.
    pub(crate) fn reload_if_stale(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(20))?;
        let mut buf = [0u8; 8];
        self.file.read_exact(&mut buf)?;
        let on_disk_last_modified = i64::from_le_bytes(buf);
        if on_disk_last_modified != self.header.last_modified {
            let (header, index) = Self::read_image(&mut self.file)?;
            self.header = header;
            self.index = index;
        }
        Ok(())
    }

    /// Full sync under an already-held exclusive lock: recover, then
    /// reload if stale. Used by every mutating operation.
    pub(crate) fn sync_exclusive(&mut self) -> Result<()> {
        self.recover_if_needed()?;
        self.reload_if_stale()
    }

    /// Open question #1 (`spec.md` §9): recovery is run under a transient
    /// exclusive lock taken only when a journal file is actually present,
    /// *before* the shared lock used for the rest of the read path is
    /// acquired and held by the caller. Recovery needs an exclusive lock
    /// because it writes; the shared lock that follows is acquired by the
    /// caller so it can stay held for the whole read, not just the sync.
    pub(crate) fn recover_before_shared(&mut self) -> Result<()> {
        if crate::journal::JournalEntry::journal_path(&self.path).exists() {
            let _guard = crate::lock::lock_exclusive(&self.file)?;
            self.recover_if_needed()?;
        }
        Ok(())
    }
}
