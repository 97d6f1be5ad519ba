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

//! # Advisory file locking
//!
//! Whole-file OS advisory locks over an already-open file handle. Shared
//! locks may coexist; an exclusive lock excludes all others. Acquisition
//! blocks until granted — there is no timeout at this layer (`spec.md` §5).
//!
//! Every acquisition in this crate is paired with a release on every exit
//! path, including error paths in the operation body, via [`LockGuard`].

use crate::error::{Error, Result};
use std::fs::File;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Shared,
    Exclusive,
}

/// Acquires a lock on `file` and releases it when dropped, regardless of
/// how the enclosing scope is exited.
///
/// Holds a `try_clone()` of the file rather than borrowing it, so that a
/// guard can be held across calls that need `&mut` access to the owning
/// handle for other fields (header/index) — flock-style advisory locks are
/// associated with the underlying open file description, so locking a
/// duplicated descriptor and unlocking it later is equivalent to locking
/// and unlocking the original.
pub struct LockGuard {
    file: File,
}

impl LockGuard {
    pub fn acquire(file: &File, kind: LockKind) -> Result<Self> {
        let file = file.try_clone().map_err(Error::LockFailure)?;
        sys::lock(&file, kind).map_err(Error::LockFailure)?;
        Ok(Self { file })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = sys::unlock(&self.file) {
            log::warn!("failed to release file lock: {e}");
        }
    }
}

pub fn lock_exclusive(file: &File) -> Result<LockGuard> {
    LockGuard::acquire(file, LockKind::Exclusive)
}

pub fn lock_shared(file: &File) -> Result<LockGuard> {
    LockGuard::acquire(file, LockKind::Shared)
}

#[cfg(unix)]
mod sys {
    use super::LockKind;
    use libc::{flock, LOCK_EX, LOCK_SH, LOCK_UN};
    use std::fs::File;
    use std::io::{Error, Result};
    use std::os::unix::io::AsRawFd;

    pub fn lock(file: &File, kind: LockKind) -> Result<()> {
        let op = match kind {
            LockKind::Shared => LOCK_SH,
            LockKind::Exclusive => LOCK_EX,
        };
        let ret = unsafe { flock(file.as_raw_fd(), op) };
        if ret == 0 {
            Ok(())
        } else {
            Err(Error::last_os_error())
        }
    }

    pub fn unlock(file: &File) -> Result<()> {
        let ret = unsafe { flock(file.as_raw_fd(), LOCK_UN) };
        if ret == 0 {
            Ok(())
        } else {
            Err(Error::last_os_error())
        }
    }
}

#[cfg(windows)]
mod sys {
    use super::LockKind;
    use std::fs::File;
    use std::io::{Error, Result};
    use std::mem;
    use std::os::windows::io::AsRawHandle;
    use winapi::shared::minwindef::DWORD;
    use winapi::um::fileapi::{LockFileEx, UnlockFile};
    use winapi::um::minwinbase::LOCKFILE_EXCLUSIVE_LOCK;

    pub fn lock(file: &File, kind: LockKind) -> Result<()> {
        let flags: DWORD = match kind {
            LockKind::Shared => 0,
            LockKind::Exclusive => LOCKFILE_EXCLUSIVE_LOCK,
        };
        unsafe {
            let mut overlapped = mem::zeroed();
            let ret = LockFileEx(file.as_raw_handle(), flags, 0, !0, !0, &mut overlapped);
            if ret == 0 {
                Err(Error::last_os_error())
            } else {
                Ok(())
            }
        }
    }

    pub fn unlock(file: &File) -> Result<()> {
        unsafe {
            let ret = UnlockFile(file.as_raw_handle(), 0, 0, !0, !0);
            if ret == 0 {
                Err(Error::last_os_error())
            } else {
                Ok(())
            }
        }
    }
}
