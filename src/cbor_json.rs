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

//! Best-effort CBOR -> JSON conversion for `dump()` (`spec.md` §4.6).
//!
//! CBOR can represent things JSON cannot: non-finite floats, byte strings,
//! non-text map keys, the "undefined" simple value. Values that aren't
//! representable degrade to JSON's nearest convention, or are omitted from
//! their containing object/array, rather than failing the whole dump.

use serde_cbor::Value as Cbor;
use serde_json::Value as Json;

pub fn cbor_to_json(value: Cbor) -> Json {
    match value {
        Cbor::Null => Json::Null,
        Cbor::Bool(b) => Json::Bool(b),
        Cbor::Integer(i) => Json::Number(serde_json::Number::from(i as i64)),
        Cbor::Float(f) => {
            // NaN/Infinity have no JSON representation; degrade to null.
            serde_json::Number::from_f64(f).map(Json::Number).unwrap_or(Json::Null)
        }
        Cbor::Bytes(b) => Json::String(base64_like(&b)),
        Cbor::Text(s) => Json::String(s),
        Cbor::Array(items) => Json::Array(items.into_iter().map(cbor_to_json).collect()),
        Cbor::Map(entries) => {
            let mut map = serde_json::Map::with_capacity(entries.len());
            for (k, v) in entries {
                // JSON object keys must be strings; non-text CBOR keys are omitted.
                if let Cbor::Text(key) = k {
                    map.insert(key, cbor_to_json(v));
                }
            }
            Json::Object(map)
        }
        Cbor::Tag(_, inner) => cbor_to_json(*inner),
        // `undefined` and any future simple values: no JSON equivalent.
        _ => Json::Null,
    }
}

/// A dependency-free, stable textual encoding for raw byte strings. Not
/// meant to be literal base64 — just deterministic and printable.
fn base64_like(bytes: &[u8]) -> String {
    const ALPHABET: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(ALPHABET[(b >> 4) as usize] as char);
        out.push(ALPHABET[(b & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_and_infinity_degrade_to_null() {
        assert_eq!(cbor_to_json(Cbor::Float(f64::NAN)), Json::Null);
        assert_eq!(cbor_to_json(Cbor::Float(f64::INFINITY)), Json::Null);
    }

    #[test]
    fn non_text_map_keys_are_omitted() {
        let map = Cbor::Map(
            vec![
                (Cbor::Integer(1), Cbor::Text("one".into())),
                (Cbor::Text("two".into()), Cbor::Integer(2)),
            ]
            .into_iter()
            .collect(),
        );
        let json = cbor_to_json(map);
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj.get("two"), Some(&Json::Number(2.into())));
    }

    #[test]
    fn nested_structures_roundtrip_shape() {
        let value = Cbor::Array(vec![Cbor::Integer(1), Cbor::Text("x".into()), Cbor::Bool(true)]);
        let json = cbor_to_json(value);
        assert_eq!(json, serde_json::json!([1, "x", true]));
    }
}
