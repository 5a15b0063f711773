//! POSIX provider
//!
//! Direct `libc` calls. Every function is a thin wrapper over one system call;
//! `errno` is captured into [`FsError::Os`] immediately after a failing call.

use std::ffi::{CStr, CString};
use std::io;
use std::os::unix::ffi::OsStringExt;
use std::ptr::{self, NonNull};
use std::{env, mem};

use super::{FileKind, FsProvider, Platform};
use crate::error::{FsError, FsResult};

/// Upper bound for retry buffers (`getcwd`, `readlink`, `getpwuid_r`)
const MAX_NATIVE_BUFFER: usize = 1 << 20;

/// Fallback size when `lstat` reports a zero-length link (procfs)
const LINK_FALLBACK_LEN: usize = libc::PATH_MAX as usize;

fn check(op: &'static str, ret: libc::c_int) -> FsResult<()> {
    if ret < 0 {
        Err(FsError::last_os_error(op))
    } else {
        Ok(())
    }
}

fn owned_c_string(bytes: Vec<u8>) -> FsResult<CString> {
    CString::new(bytes).map_err(|e| FsError::InteriorNul {
        offset: e.nul_position(),
    })
}

#[cfg(any(target_os = "linux", target_os = "emscripten"))]
unsafe fn errno_location() -> *mut libc::c_int {
    libc::__errno_location()
}

#[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))]
unsafe fn errno_location() -> *mut libc::c_int {
    libc::__errno()
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
unsafe fn errno_location() -> *mut libc::c_int {
    libc::__error()
}

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
unsafe fn errno_location() -> *mut libc::c_int {
    libc::___errno()
}

/// Overwrite the calling thread's `errno`
fn set_errno(value: libc::c_int) {
    unsafe { *errno_location() = value };
}

/// Open directory stream, closed on drop
struct DirStream(NonNull<libc::DIR>);

impl DirStream {
    fn open(path: &CStr) -> FsResult<Self> {
        let dir = unsafe { libc::opendir(path.as_ptr()) };
        NonNull::new(dir)
            .map(DirStream)
            .ok_or_else(|| FsError::last_os_error("opendir"))
    }

    /// Next entry name, `Ok(None)` at the end of the stream.
    ///
    /// `readdir` returns NULL both at the end and on error; only a non-zero
    /// `errno` tells them apart, so it is cleared before each call.
    fn next_name(&mut self) -> FsResult<Option<CString>> {
        set_errno(0);
        let entry = unsafe { libc::readdir(self.0.as_ptr()) };
        if entry.is_null() {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(code) if code != 0 => Err(FsError::Os {
                    op: "readdir",
                    source: err,
                }),
                _ => Ok(None),
            };
        }
        let name = unsafe { CStr::from_ptr((*entry).d_name.as_ptr()) };
        Ok(Some(name.to_owned()))
    }
}

impl Drop for DirStream {
    fn drop(&mut self) {
        unsafe { libc::closedir(self.0.as_ptr()) };
    }
}

/// Filesystem provider backed by POSIX system calls
#[derive(Debug, Clone)]
pub struct PosixFs {
    cwd_initial_capacity: usize,
}

impl PosixFs {
    pub fn new(cwd_initial_capacity: usize) -> Self {
        Self {
            cwd_initial_capacity: cwd_initial_capacity.max(2),
        }
    }

    fn passwd_home() -> FsResult<CString> {
        let uid = unsafe { libc::getuid() };
        let mut buf_len = 1024usize;

        loop {
            let mut buf: Vec<libc::c_char> = vec![0; buf_len];
            let mut pwd: libc::passwd = unsafe { mem::zeroed() };
            let mut result: *mut libc::passwd = ptr::null_mut();

            let rc = unsafe {
                libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
            };

            if rc == libc::ERANGE && buf_len < MAX_NATIVE_BUFFER {
                buf_len *= 2;
                continue;
            }
            if rc != 0 {
                return Err(FsError::from_raw("getpwuid_r", rc));
            }
            if result.is_null() || pwd.pw_dir.is_null() {
                return Err(FsError::from_raw("getpwuid_r", libc::ENOENT));
            }

            let dir = unsafe { CStr::from_ptr(pwd.pw_dir) };
            return Ok(dir.to_owned());
        }
    }
}

impl Default for PosixFs {
    fn default() -> Self {
        Self::new(256)
    }
}

impl FsProvider for PosixFs {
    fn platform(&self) -> Platform {
        Platform::POSIX
    }

    fn home_dir(&self) -> FsResult<CString> {
        match env::var_os("HOME") {
            Some(home) => owned_c_string(home.into_vec()),
            None => Self::passwd_home(),
        }
    }

    fn current_dir(&self) -> FsResult<Vec<u8>> {
        let mut capacity = self.cwd_initial_capacity;

        loop {
            let mut buf = vec![0u8; capacity];
            let ret = unsafe { libc::getcwd(buf.as_mut_ptr().cast(), buf.len()) };
            if !ret.is_null() {
                return Ok(buf);
            }

            let err = FsError::last_os_error("getcwd");
            let range = matches!(&err, FsError::Os { source, .. } if source.raw_os_error() == Some(libc::ERANGE));
            if !range || capacity >= MAX_NATIVE_BUFFER {
                return Err(err);
            }
            capacity *= 2;
        }
    }

    fn real_path(&self, path: &CStr) -> FsResult<CString> {
        let resolved = unsafe { libc::realpath(path.as_ptr(), ptr::null_mut()) };
        if resolved.is_null() {
            return Err(FsError::last_os_error("realpath"));
        }
        let owned = unsafe { CStr::from_ptr(resolved) }.to_owned();
        unsafe { libc::free(resolved.cast()) };
        Ok(owned)
    }

    fn read_link(&self, path: &CStr) -> FsResult<CString> {
        let mut st: libc::stat = unsafe { mem::zeroed() };
        check("lstat", unsafe { libc::lstat(path.as_ptr(), &mut st) })?;

        let mut buf_len = match st.st_size as usize {
            0 => LINK_FALLBACK_LEN,
            size => size + 1,
        };

        loop {
            let mut buf = vec![0u8; buf_len];
            let n = unsafe { libc::readlink(path.as_ptr(), buf.as_mut_ptr().cast(), buf.len()) };
            if n < 0 {
                return Err(FsError::last_os_error("readlink"));
            }

            let n = n as usize;
            if n < buf_len {
                buf.truncate(n);
                return owned_c_string(buf);
            }
            // Filled completely: the target may have been truncated.
            if buf_len >= MAX_NATIVE_BUFFER {
                return Err(FsError::from_raw("readlink", libc::ENAMETOOLONG));
            }
            buf_len *= 2;
        }
    }

    fn file_kind(&self, path: &CStr, follow: bool) -> FsResult<FileKind> {
        let mut st: libc::stat = unsafe { mem::zeroed() };
        if follow {
            check("stat", unsafe { libc::stat(path.as_ptr(), &mut st) })?;
        } else {
            check("lstat", unsafe { libc::lstat(path.as_ptr(), &mut st) })?;
        }

        Ok(match st.st_mode & libc::S_IFMT {
            libc::S_IFREG => FileKind::File,
            libc::S_IFDIR => FileKind::Directory,
            libc::S_IFLNK => FileKind::Symlink,
            _ => FileKind::Other,
        })
    }

    fn read_dir(&self, path: &CStr) -> FsResult<Vec<CString>> {
        let mut stream = DirStream::open(path)?;
        let mut names = Vec::new();
        while let Some(name) = stream.next_name()? {
            names.push(name);
        }
        Ok(names)
    }

    fn create_file(&self, path: &CStr, mode: u32) -> FsResult<()> {
        let fd = unsafe { libc::creat(path.as_ptr(), mode as libc::mode_t) };
        if fd < 0 {
            return Err(FsError::last_os_error("creat"));
        }
        unsafe { libc::close(fd) };
        Ok(())
    }

    fn create_dir(&self, path: &CStr, mode: u32) -> FsResult<()> {
        check("mkdir", unsafe {
            libc::mkdir(path.as_ptr(), mode as libc::mode_t)
        })
    }

    fn symlink(&self, target: &CStr, link: &CStr) -> FsResult<()> {
        check("symlink", unsafe {
            libc::symlink(target.as_ptr(), link.as_ptr())
        })
    }

    fn hard_link(&self, target: &CStr, link: &CStr) -> FsResult<()> {
        check("link", unsafe { libc::link(target.as_ptr(), link.as_ptr()) })
    }

    fn rename(&self, from: &CStr, to: &CStr) -> FsResult<()> {
        check("rename", unsafe { libc::rename(from.as_ptr(), to.as_ptr()) })
    }

    fn unlink(&self, path: &CStr) -> FsResult<()> {
        check("unlink", unsafe { libc::unlink(path.as_ptr()) })
    }

    fn remove_dir(&self, path: &CStr) -> FsResult<()> {
        check("rmdir", unsafe { libc::rmdir(path.as_ptr()) })
    }

    fn change_dir(&self, path: &CStr) -> FsResult<()> {
        check("chdir", unsafe { libc::chdir(path.as_ptr()) })
    }
}
