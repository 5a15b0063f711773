//! Filesystem Providers
//!
//! One capability provider per platform, selected at build time by
//! [`default_provider`]. Providers speak in native strings and return
//! structured [`FsError`]s; collapsing them into host results happens in
//! [`crate::paths`].
//!
//! | Platform | Provider | Behaviour |
//! |----------|----------|-----------|
//! | unix | [`PosixFs`] | direct `libc` calls |
//! | other | [`UnsupportedFs`] | every filesystem call reports `Unsupported` |

#[cfg(unix)]
pub mod posix;
pub mod unsupported;

use std::ffi::{CStr, CString};

use crate::config::FsConfig;
use crate::error::FsResult;

#[cfg(unix)]
pub use posix::PosixFs;
pub use unsupported::UnsupportedFs;

/// Type of a filesystem object as reported by `stat`/`lstat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// Static facts about the platform's path syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub separator: u8,
    pub has_drive_letters: bool,
}

impl Platform {
    pub const POSIX: Platform = Platform {
        separator: b'/',
        has_drive_letters: false,
    };

    pub const WINDOWS: Platform = Platform {
        separator: b'\\',
        has_drive_letters: true,
    };

    /// The platform this crate is compiled for
    pub const fn host() -> Platform {
        if cfg!(windows) {
            Platform::WINDOWS
        } else {
            Platform::POSIX
        }
    }
}

/// The OS call surface consumed by the path builtins.
///
/// Two-path operations take `(link, target)` / `(from, to)` in the order of the
/// underlying system call.
pub trait FsProvider: Send + Sync {
    fn platform(&self) -> Platform;

    /// `$HOME`, falling back to the password database
    fn home_dir(&self) -> FsResult<CString>;

    /// Raw `getcwd` buffer: over-allocated, NUL-terminated somewhere inside
    fn current_dir(&self) -> FsResult<Vec<u8>>;

    fn real_path(&self, path: &CStr) -> FsResult<CString>;

    fn read_link(&self, path: &CStr) -> FsResult<CString>;

    /// `stat` when `follow` is set, `lstat` otherwise
    fn file_kind(&self, path: &CStr, follow: bool) -> FsResult<FileKind>;

    /// Entry names in iteration order, including `.` and `..`
    fn read_dir(&self, path: &CStr) -> FsResult<Vec<CString>>;

    fn create_file(&self, path: &CStr, mode: u32) -> FsResult<()>;

    fn create_dir(&self, path: &CStr, mode: u32) -> FsResult<()>;

    /// Create `link` pointing at `target`
    fn symlink(&self, target: &CStr, link: &CStr) -> FsResult<()>;

    /// Create `link` as a new name for the existing `target`
    fn hard_link(&self, target: &CStr, link: &CStr) -> FsResult<()>;

    fn rename(&self, from: &CStr, to: &CStr) -> FsResult<()>;

    fn unlink(&self, path: &CStr) -> FsResult<()>;

    fn remove_dir(&self, path: &CStr) -> FsResult<()>;

    fn change_dir(&self, path: &CStr) -> FsResult<()>;
}

/// Provider for the compilation target
#[cfg(unix)]
pub fn default_provider(config: &FsConfig) -> Box<dyn FsProvider> {
    Box::new(PosixFs::new(config.cwd_initial_capacity))
}

/// Provider for the compilation target
#[cfg(not(unix))]
pub fn default_provider(_config: &FsConfig) -> Box<dyn FsProvider> {
    Box::new(UnsupportedFs::new(Platform::host()))
}
