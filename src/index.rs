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

//! # Index codec
//!
//! The index is a CBOR map of `key -> [offset, size]`, encoded/decoded with
//! `serde_cbor`. Insertion order must round-trip, so the in-memory
//! representation is an [`indexmap::IndexMap`] rather than a `HashMap`:
//! both `keys()` and `dump()` depend on iterating entries in the order
//! they were first written.

use crate::error::{Error, Result};
use indexmap::IndexMap;

/// `(offset, size)` of a value in the data region.
pub type Entry = (u64, u64);

/// The in-memory index: insertion-ordered key -> (offset, size).
pub type Index = IndexMap<String, Entry>;

pub fn encode(index: &Index) -> Result<Vec<u8>> {
    serde_cbor::to_vec(index).map_err(|e| Error::corrupt(format!("failed to encode index: {e}")))
}

/// Decode a CBOR-encoded index, validating that every entry stays within
/// `[36, 36 + data_size]` (spec.md invariant 2 / open question 3).
pub fn decode(bytes: &[u8], data_size: u64) -> Result<Index> {
    let index: Index = serde_cbor::from_slice(bytes)
        .map_err(|e| Error::corrupt(format!("index region is not a valid CBOR map: {e}")))?;
    let data_end = crate::header::HEADER_SIZE + data_size;
    for (key, &(offset, size)) in index.iter() {
        if key.is_empty() {
            return Err(Error::corrupt("index contains an empty key"));
        }
        if offset < crate::header::HEADER_SIZE || offset + size > data_end {
            return Err(Error::corrupt(format!(
                "index entry for {key:?} ({offset}, {size}) falls outside the data region"
            )));
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_order() {
        let mut index = Index::new();
        index.insert("c".to_string(), (36, 1));
        index.insert("a".to_string(), (37, 1));
        index.insert("b".to_string(), (38, 1));
        let encoded = encode(&index).unwrap();
        let decoded = decode(&encoded, 3).unwrap();
        let keys: Vec<&str> = decoded.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }

    #[test]
    fn rejects_out_of_bounds_entry() {
        let mut index = Index::new();
        index.insert("k".to_string(), (36, 100));
        let encoded = encode(&index).unwrap();
        assert!(decode(&encoded, 3).is_err());
    }

    #[test]
    fn rejects_non_map_cbor() {
        let encoded = serde_cbor::to_vec(&42u64).unwrap();
        assert!(decode(&encoded, 0).is_err());
    }

    #[test]
    fn empty_index_roundtrips() {
        let index = Index::new();
        let encoded = encode(&index).unwrap();
        let decoded = decode(&encoded, 0).unwrap();
        assert!(decoded.is_empty());
    }
}
