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

use core::fmt;
use std::io::Error as IoError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The supplied key was empty (or, at the API boundary, not a string at all)
    InvalidKey,
    /// The header, index or data region failed validation
    CorruptFile(String),
    /// Acquiring or releasing an advisory file lock failed
    LockFailure(IoError),
    /// Any other I/O failure
    Io(IoError),
    /// The journal exists but failed to decode; treated as absent on recovery
    JournalCorrupt(String),
}

impl Error {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptFile(reason.into())
    }
    pub fn journal_corrupt(reason: impl Into<String>) -> Self {
        Self::JournalCorrupt(reason.into())
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Self::Io(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "key must be a non-empty string"),
            Self::CorruptFile(reason) => write!(f, "corrupt file: {reason}"),
            Self::LockFailure(e) => write!(f, "failed to acquire/release file lock: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::JournalCorrupt(reason) => write!(f, "journal corrupt, ignoring: {reason}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LockFailure(e) | Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
