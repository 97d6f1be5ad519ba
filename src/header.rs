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

//! # File header
//!
//! ```text
//! +--------+------+----------------+--------------------------------+
//! | Offset | Size | Field          | Meaning                        |
//! +--------+------+----------------+--------------------------------+
//! |      0 |    9 | magic          | ASCII `jsonblite`               |
//! |      9 |    1 | version        | format version, currently 1     |
//! |     10 |    4 | index_size     | byte length of the index region |
//! |     14 |    6 | data_size      | byte length of the data region  |
//! |     20 |    8 | last_modified  | ms since epoch, last commit     |
//! |     28 |    8 | last_vacuum    | ms since epoch, last vacuum     |
//! +--------+------+----------------+--------------------------------+
//! ```
//! All integers are little-endian. This module is a pure codec: it knows
//! nothing about locks, journals or the data/index regions themselves.

use crate::error::{Error, Result};

pub const MAGIC: &[u8; 9] = b"jsonblite";
pub const VERSION: u8 = 1;
pub const HEADER_SIZE: u64 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub index_size: u32,
    pub data_size: u64,
    pub last_modified: i64,
    pub last_vacuum: i64,
}

impl Header {
    /// A fresh header for an empty store: zero-length data, an empty encoded index.
    pub fn fresh(empty_index_size: u32) -> Self {
        Self {
            version: VERSION,
            index_size: empty_index_size,
            data_size: 0,
            last_modified: 0,
            last_vacuum: 0,
        }
    }

    /// The offset one past the data region; where the index region begins and where the
    /// next appended value would start.
    pub fn data_tail(&self) -> u64 {
        HEADER_SIZE + self.data_size
    }

    /// Total file size implied by this header, assuming no trailing garbage.
    pub fn file_size(&self) -> u64 {
        HEADER_SIZE + self.data_size + self.index_size as u64
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[0..9].copy_from_slice(MAGIC);
        buf[9] = self.version;
        buf[10..14].copy_from_slice(&self.index_size.to_le_bytes());
        write_u48(&mut buf[14..20], self.data_size);
        buf[20..28].copy_from_slice(&self.last_modified.to_le_bytes());
        buf[28..36].copy_from_slice(&self.last_vacuum.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE as usize {
            return Err(Error::corrupt("file shorter than the 36-byte header"));
        }
        if &buf[0..9] != MAGIC.as_slice() {
            return Err(Error::corrupt("bad magic"));
        }
        let version = buf[9];
        if version != VERSION {
            return Err(Error::corrupt(format!("unsupported version {version}")));
        }
        let index_size = u32::from_le_bytes(buf[10..14].try_into().unwrap());
        let data_size = read_u48(&buf[14..20]);
        let last_modified = i64::from_le_bytes(buf[20..28].try_into().unwrap());
        let last_vacuum = i64::from_le_bytes(buf[28..36].try_into().unwrap());
        Ok(Self {
            version,
            index_size,
            data_size,
            last_modified,
            last_vacuum,
        })
    }
}

fn write_u48(dst: &mut [u8], value: u64) {
    debug_assert!(value < (1u64 << 48), "data_size exceeds 48 bits");
    let bytes = value.to_le_bytes();
    dst.copy_from_slice(&bytes[0..6]);
}

fn read_u48(src: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes[0..6].copy_from_slice(src);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let h = Header {
            version: 1,
            index_size: 42,
            data_size: 123_456_789,
            last_modified: -7,
            last_vacuum: 99,
        };
        let encoded = h.encode();
        assert_eq!(encoded.len(), HEADER_SIZE as usize);
        let decoded = Header::decode(&encoded).unwrap();
        assert_eq!(h, decoded);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = [0u8; 36];
        buf[0..9].copy_from_slice(b"notitatll");
        assert!(matches!(Header::decode(&buf), Err(Error::CorruptFile(_))));
    }

    #[test]
    fn rejects_bad_version() {
        let mut h = Header::fresh(1);
        h.version = 2;
        let encoded = h.encode();
        assert!(matches!(Header::decode(&encoded), Err(Error::CorruptFile(_))));
    }

    #[test]
    fn rejects_short_buffer() {
        assert!(matches!(Header::decode(&[0u8; 10]), Err(Error::CorruptFile(_))));
    }

    #[test]
    fn data_tail_and_file_size() {
        let h = Header {
            version: 1,
            index_size: 10,
            data_size: 20,
            last_modified: 0,
            last_vacuum: 0,
        };
        assert_eq!(h.data_tail(), 56);
        assert_eq!(h.file_size(), 66);
    }
}
