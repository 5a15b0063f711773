//! Provider for platforms without the POSIX call surface.
//!
//! Only the path syntax queries work. Every filesystem call reports
//! [`FsError::Unsupported`], which the builtin layer turns into a hard abort.

use std::ffi::{CStr, CString};

use super::{FileKind, FsProvider, Platform};
use crate::error::{FsError, FsResult};

#[derive(Debug, Clone, Copy)]
pub struct UnsupportedFs {
    platform: Platform,
}

impl UnsupportedFs {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

fn unsupported<T>(op: &'static str) -> FsResult<T> {
    Err(FsError::Unsupported { op })
}

impl FsProvider for UnsupportedFs {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn home_dir(&self) -> FsResult<CString> {
        unsupported("get_home_path")
    }

    fn current_dir(&self) -> FsResult<Vec<u8>> {
        unsupported("get_cwd")
    }

    fn real_path(&self, _path: &CStr) -> FsResult<CString> {
        unsupported("resolve_real_path")
    }

    fn read_link(&self, _path: &CStr) -> FsResult<CString> {
        unsupported("read_symlink")
    }

    /// Shared by the four predicates; the builtin layer reports which one was called.
    fn file_kind(&self, _path: &CStr, _follow: bool) -> FsResult<FileKind> {
        unsupported("file_kind")
    }

    fn read_dir(&self, _path: &CStr) -> FsResult<Vec<CString>> {
        unsupported("read_directory_contents")
    }

    fn create_file(&self, _path: &CStr, _mode: u32) -> FsResult<()> {
        unsupported("make_file")
    }

    fn create_dir(&self, _path: &CStr, _mode: u32) -> FsResult<()> {
        unsupported("make_directory")
    }

    fn symlink(&self, _target: &CStr, _link: &CStr) -> FsResult<()> {
        unsupported("make_symlink")
    }

    fn hard_link(&self, _target: &CStr, _link: &CStr) -> FsResult<()> {
        unsupported("make_hardlink")
    }

    fn rename(&self, _from: &CStr, _to: &CStr) -> FsResult<()> {
        unsupported("rename_file")
    }

    fn unlink(&self, _path: &CStr) -> FsResult<()> {
        unsupported("unlink_file")
    }

    fn remove_dir(&self, _path: &CStr) -> FsResult<()> {
        unsupported("rmdir")
    }

    fn change_dir(&self, _path: &CStr) -> FsResult<()> {
        unsupported("chdir")
    }
}
