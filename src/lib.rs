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

//! # JSONBLite
//!
//! An embeddable, single-file, crash-safe key-value store for structured
//! values. Keys are non-empty strings; values are anything `serde` can
//! encode and decode through CBOR. A handle is a single file: a fixed
//! 36-byte header, an append-only data region, and a CBOR-encoded index —
//! see [`header`] for the exact layout.
//!
//! Durability is provided by a write-ahead journal (see [`journal`]) that
//! makes every mutating operation atomic with respect to process crashes:
//! a killed process leaves the file either unchanged or fully recoverable
//! on the next [`JsonbLite::open`]. Coordination across processes (or
//! separate handles within one process) is via OS advisory whole-file
//! locks (see [`lock`]) plus a `last_modified` coherence check (see
//! [`sync`]) — there is no in-process synchronization, because a single
//! handle is not meant to be shared by concurrent writers (see the crate's
//! design notes for why).
//!
//! ```no_run
//! # fn main() -> jsonblite::Result<()> {
//! let mut db = jsonblite::OpenOptions::new().open("my.db")?;
//! db.write("greeting", &"hello")?;
//! let value: Option<String> = db.read("greeting")?;
//! assert_eq!(value.as_deref(), Some("hello"));
//! db.delete("greeting")?;
//! # Ok(())
//! # }
//! ```

mod cbor_json;
mod engine;
mod error;
mod header;
mod index;
mod journal;
mod lock;
mod ops;
mod sync;

pub use engine::JsonbLite;
pub use error::{Error, Result};

/// Builder for [`JsonbLite::open`]. The only knob the engine itself has:
/// whether to log informational messages about completed operations
/// (`spec.md` §6 — "the `verbose` option merely enables informational
/// logging").
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    verbose: bool,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Open `path`, creating a fresh, valid, empty store if it does not
    /// exist (`spec.md` §4.7).
    pub fn open(self, path: impl AsRef<std::path::Path>) -> Result<JsonbLite> {
        JsonbLite::open(path, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_options_default_is_quiet() {
        assert!(!OpenOptions::new().verbose);
    }
}
