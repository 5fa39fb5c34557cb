//! Owning-process identity
//!
//! Names are resolved by walking the OS process list rather than opening the
//! process directly: the walk works for processes the caller has no
//! permission to open.

use crate::platform::NativeResolver;
use crate::Result;

/// Resolves a process id to its executable image name
#[cfg_attr(test, mockall::automock)]
pub trait ProcessLookup {
    /// Name of the process with id `pid`
    ///
    /// # Errors
    /// `ProcessNotFound` if no such process exists (it may have exited since the
    /// connection table was read), `SnapshotUnavailable` if the process list
    /// cannot be enumerated.
    fn process_name(&self, pid: u32) -> Result<String>;
}

/// Resolve `pid` with the build target's resolver
///
/// # Errors
/// See [`ProcessLookup::process_name`].
pub fn process_name(pid: u32) -> Result<String> {
    NativeResolver::default().process_name(pid)
}

/// Decode a NUL-terminated UTF-16 image name (Windows `szExeFile`).
///
/// Stops at the first NUL; unpaired surrogates become U+FFFD.
#[must_use]
pub fn image_name_from_wide(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}
