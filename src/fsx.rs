//! Cross-platform filesystem wrapper.
//!
//! On Unix the POSIX permission bits are read from and applied to files
//! directly. Elsewhere mode is reported as `0o644` and never applied, so an
//! archive created on Unix still extracts, just without permissions.

use std::fs::{File, Metadata};
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Mode recorded for files on platforms without POSIX permissions.
pub const FALLBACK_MODE: u32 = 0o644;

#[cfg(unix)]
/// Permission bits (`st_mode & 0o7777`) of a file.
pub fn unix_mode(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
pub fn unix_mode(_meta: &Metadata) -> u32 {
    FALLBACK_MODE
}

#[cfg(unix)]
/// Set POSIX permission bits on Unix.
pub fn set_unix_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
/// No-op off Unix: POSIX permission bits are not preserved.
pub fn set_unix_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Modification time in whole seconds since the Unix epoch.
/// Times before the epoch, or platforms that cannot report one, yield 0.
pub fn mtime_secs(meta: &Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs())
}

/// Set the modification time of an open file.
pub fn set_mtime(file: &File, secs: u64) -> io::Result<()> {
    let when = system_time(secs)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "mtime out of range"))?;
    file.set_modified(when)
}

/// `secs` since the Unix epoch as a `SystemTime`, if representable.
pub fn system_time(secs: u64) -> Option<SystemTime> {
    UNIX_EPOCH.checked_add(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mtime_round_trips_through_open_file() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::NamedTempFile::new()?;
        set_mtime(tmp.as_file(), 1_600_000_000)?;
        let meta = std::fs::metadata(tmp.path())?;
        assert_eq!(mtime_secs(&meta), 1_600_000_000);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn permissions_are_masked_and_applied() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::NamedTempFile::new()?;
        set_unix_permissions(tmp.path(), 0o100640)?;
        assert_eq!(unix_mode(&std::fs::metadata(tmp.path())?), 0o640);
        Ok(())
    }
}
