//! Path Builtins
//!
//! Typed surface of every filesystem builtin exposed to the host. Each function
//! converts its managed-buffer arguments with ToNative, forwards to a single
//! provider call, and wraps native results back into managed buffers.
//!
//! # Failure policy
//!
//! - Filesystem errors collapse to `false` or absent (`None`); the cause is logged
//!   at `debug` level.
//! - Unsupported operations abort immediately (panic, which is a process abort in
//!   release builds).
//!
//! # Example
//!
//! ```rust,no_run
//! use hostpaths::paths::PathBuiltins;
//! use hostpaths::runtime::ManagedBuffer;
//!
//! let paths = PathBuiltins::with_defaults();
//! let mut dir = ManagedBuffer::from_str(0, "/tmp");
//! assert!(paths.check_path_is_dir(&mut dir));
//! ```

use std::ffi::CStr;

use tracing::{debug, error};

use crate::config::{ListingConfig, PathsConfig};
use crate::error::{FsError, FsResult};
use crate::platform::{default_provider, FileKind, FsProvider, Platform};
use crate::runtime::buffer::{BufferList, ManagedBuffer, Nullable};

/// Reference count given to each directory listing entry
const LISTING_ENTRY_REF_COUNT: u64 = 1;

/// Hard abort for an operation the platform does not provide
fn abort_unsupported(op: &'static str) -> ! {
    error!(op, "unsupported operation on this platform");
    panic!("unsupported operation on this platform: {op}");
}

/// Filesystem builtins bound to a provider and configuration
pub struct PathBuiltins {
    fs: Box<dyn FsProvider>,
    config: PathsConfig,
}

impl PathBuiltins {
    pub fn new(fs: Box<dyn FsProvider>, config: PathsConfig) -> Self {
        Self { fs, config }
    }

    /// Builtins over the platform's default provider
    pub fn from_config(config: PathsConfig) -> Self {
        let fs = default_provider(&config.fs);
        Self::new(fs, config)
    }

    pub fn with_defaults() -> Self {
        Self::from_config(PathsConfig::default())
    }

    pub fn config(&self) -> &PathsConfig {
        &self.config
    }

    pub fn platform(&self) -> Platform {
        self.fs.platform()
    }

    /// Collapse a provider result: errors become `None`, unsupported aborts
    /// naming the builtin `op`.
    fn settle<T>(&self, op: &'static str, paths: &[&[u8]], result: FsResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) if e.is_unsupported() => abort_unsupported(op),
            Err(e) => {
                debug!(
                    op,
                    path = %describe_paths(paths),
                    error = %e,
                    "filesystem call failed"
                );
                None
            }
        }
    }

    /// Run `f` on the native form of `path`; the native string is released on return.
    fn with_native<T>(
        &self,
        op: &'static str,
        path: &mut ManagedBuffer,
        f: impl FnOnce(&CStr) -> FsResult<T>,
    ) -> Option<T> {
        let result = match path.to_native() {
            Ok(native) => f(native.as_c_str()),
            Err(e) => Err(e.into()),
        };
        self.settle(op, &[path.as_slice()], result)
    }

    fn with_native_pair<T>(
        &self,
        op: &'static str,
        first: &mut ManagedBuffer,
        second: &mut ManagedBuffer,
        f: impl FnOnce(&CStr, &CStr) -> FsResult<T>,
    ) -> Option<T> {
        let result = match (first.to_native(), second.to_native()) {
            (Ok(a), Ok(b)) => f(a.as_c_str(), b.as_c_str()),
            (Err(e), _) | (_, Err(e)) => Err(e.into()),
        };
        self.settle(op, &[first.as_slice(), second.as_slice()], result)
    }

    fn kind(&self, op: &'static str, path: &mut ManagedBuffer, follow: bool) -> Option<FileKind> {
        self.with_native(op, path, |p| self.fs.file_kind(p, follow))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The separator as a one-byte buffer with no spare capacity
    pub fn path_sep_str(&self) -> ManagedBuffer {
        ManagedBuffer::from_slice(0, &[self.platform().separator])
    }

    pub fn path_sep_chr(&self) -> u8 {
        self.platform().separator
    }

    pub fn paths_have_drive(&self) -> bool {
        self.platform().has_drive_letters
    }

    pub fn get_home_path(&self) -> Nullable<ManagedBuffer> {
        self.settle("get_home_path", &[], self.fs.home_dir())
            .map(|home| ManagedBuffer::from_native(0, home))
    }

    /// Adopts the over-allocated `getcwd` buffer without copying
    pub fn get_cwd(&self) -> Nullable<ManagedBuffer> {
        let raw = self.settle("get_cwd", &[], self.fs.current_dir())?;
        let capacity = raw.len();
        self.settle(
            "get_cwd",
            &[],
            ManagedBuffer::from_native_with_capacity(0, raw, capacity).map_err(FsError::from),
        )
    }

    pub fn resolve_real_path(&self, path: &mut ManagedBuffer) -> Nullable<ManagedBuffer> {
        self.with_native("resolve_real_path", path, |p| self.fs.real_path(p))
            .map(|resolved| ManagedBuffer::from_native(0, resolved))
    }

    pub fn read_symlink(&self, path: &mut ManagedBuffer) -> Nullable<ManagedBuffer> {
        self.with_native("read_symlink", path, |p| self.fs.read_link(p))
            .map(|target| ManagedBuffer::from_native(0, target))
    }

    pub fn check_path_exists(&self, path: &mut ManagedBuffer) -> bool {
        self.kind("check_path_exists", path, true).is_some()
    }

    pub fn check_path_is_file(&self, path: &mut ManagedBuffer) -> bool {
        self.kind("check_path_is_file", path, true) == Some(FileKind::File)
    }

    pub fn check_path_is_dir(&self, path: &mut ManagedBuffer) -> bool {
        self.kind("check_path_is_dir", path, true) == Some(FileKind::Directory)
    }

    pub fn check_path_is_symlink(&self, path: &mut ManagedBuffer) -> bool {
        self.kind("check_path_is_symlink", path, false) == Some(FileKind::Symlink)
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Entry names in OS iteration order. An empty directory yields an empty
    /// list; an unreadable or missing one yields absent.
    pub fn read_directory_contents(&self, path: &mut ManagedBuffer) -> Nullable<BufferList> {
        let names = self.with_native("read_directory_contents", path, |p| self.fs.read_dir(p))?;
        Some(collect_listing(names, &self.config.listing))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn make_file(&self, path: &mut ManagedBuffer) -> bool {
        let mode = self.config.fs.file_mode;
        self.with_native("make_file", path, |p| self.fs.create_file(p, mode))
            .is_some()
    }

    pub fn make_directory(&self, path: &mut ManagedBuffer) -> bool {
        let mode = self.config.fs.dir_mode;
        self.with_native("make_directory", path, |p| self.fs.create_dir(p, mode))
            .is_some()
    }

    /// Create the link `from` pointing at `to`
    pub fn make_symlink(&self, from: &mut ManagedBuffer, to: &mut ManagedBuffer) -> bool {
        self.with_native_pair("make_symlink", from, to, |link, target| {
            self.fs.symlink(target, link)
        })
        .is_some()
    }

    /// Create `from` as a new name for the existing `to`
    pub fn make_hardlink(&self, from: &mut ManagedBuffer, to: &mut ManagedBuffer) -> bool {
        self.with_native_pair("make_hardlink", from, to, |link, target| {
            self.fs.hard_link(target, link)
        })
        .is_some()
    }

    /// Move `to` to `from`; the first argument names the path that exists afterwards
    pub fn rename_file(&self, from: &mut ManagedBuffer, to: &mut ManagedBuffer) -> bool {
        self.with_native_pair("rename_file", from, to, |dest, source| {
            self.fs.rename(source, dest)
        })
        .is_some()
    }

    pub fn unlink_file(&self, path: &mut ManagedBuffer) -> bool {
        self.with_native("unlink_file", path, |p| self.fs.unlink(p))
            .is_some()
    }

    pub fn rmdir(&self, path: &mut ManagedBuffer) -> bool {
        self.with_native("rmdir", path, |p| self.fs.remove_dir(p))
            .is_some()
    }

    pub fn chdir(&self, path: &mut ManagedBuffer) -> bool {
        self.with_native("chdir", path, |p| self.fs.change_dir(p))
            .is_some()
    }
}

impl Default for PathBuiltins {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Paths of a failed call for the log line, e.g. `"/a, /b"`
fn describe_paths(paths: &[&[u8]]) -> String {
    paths
        .iter()
        .map(|p| String::from_utf8_lossy(p))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Wrap native entry names into a listing, dropping `.`/`..` unless configured.
fn collect_listing(names: Vec<std::ffi::CString>, config: &ListingConfig) -> BufferList {
    let mut list = BufferList::with_capacity(0, config.initial_capacity);
    for name in names {
        let dot = matches!(name.as_bytes(), b"." | b"..");
        if dot && !config.include_dot_entries {
            continue;
        }
        list.append_collected(ManagedBuffer::from_native(LISTING_ENTRY_REF_COUNT, name));
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::UnsupportedFs;
    use std::ffi::CString;

    fn names(raw: &[&str]) -> Vec<CString> {
        raw.iter().map(|n| CString::new(*n).unwrap()).collect()
    }

    #[test]
    fn test_listing_skips_dot_entries_by_default() {
        let list = collect_listing(names(&[".", "b", "..", "a"]), &ListingConfig::default());
        let got: Vec<_> = list.iter().map(|b| b.as_str().unwrap()).collect();
        assert_eq!(got, ["b", "a"]);
        assert_eq!(list.ref_count(), 0);
        assert!(list.iter().all(|b| b.ref_count() == LISTING_ENTRY_REF_COUNT));
    }

    #[test]
    fn test_listing_keeps_dot_entries_when_configured() {
        let config = ListingConfig {
            initial_capacity: 1,
            include_dot_entries: true,
        };
        let list = collect_listing(names(&[".", ".."]), &config);
        assert_eq!(list.len(), 2);
        assert_eq!(list.capacity(), 2);
    }

    #[test]
    fn test_listing_of_only_dots_is_empty_not_absent() {
        let list = collect_listing(names(&[".", ".."]), &ListingConfig::default());
        assert!(list.is_empty());
    }

    #[test]
    fn test_separator_buffer_has_no_spare_capacity() {
        let paths = PathBuiltins::new(
            Box::new(UnsupportedFs::new(Platform::WINDOWS)),
            PathsConfig::default(),
        );
        let sep = paths.path_sep_str();
        assert_eq!(sep.as_slice(), b"\\");
        assert_eq!(sep.capacity(), sep.len());
        assert_eq!(paths.path_sep_chr(), b'\\');
        assert!(paths.paths_have_drive());
    }

    #[test]
    #[should_panic(expected = "unsupported operation on this platform: make_symlink")]
    fn test_unsupported_aborts() {
        let paths = PathBuiltins::new(
            Box::new(UnsupportedFs::new(Platform::WINDOWS)),
            PathsConfig::default(),
        );
        let mut from = ManagedBuffer::from_str(0, "a");
        let mut to = ManagedBuffer::from_str(0, "b");
        paths.make_symlink(&mut from, &mut to);
    }

    #[test]
    #[should_panic(expected = "unsupported operation on this platform: check_path_is_file")]
    fn test_unsupported_predicate_names_the_builtin() {
        let paths = PathBuiltins::new(
            Box::new(UnsupportedFs::new(Platform::WINDOWS)),
            PathsConfig::default(),
        );
        paths.check_path_is_file(&mut ManagedBuffer::from_str(0, "C:\\boot.ini"));
    }

    #[test]
    fn test_describe_paths_lists_every_argument() {
        assert_eq!(describe_paths(&[]), "");
        assert_eq!(describe_paths(&[b"/only".as_slice()]), "/only");
        assert_eq!(describe_paths(&[b"/dest".as_slice(), b"/source".as_slice()]), "/dest, /source");
    }

    #[test]
    fn test_interior_nul_collapses_to_false() {
        let paths = PathBuiltins::new(
            Box::new(UnsupportedFs::new(Platform::POSIX)),
            PathsConfig::default(),
        );
        // Marshalling fails before the provider is reached, so no abort.
        let mut bad = ManagedBuffer::from_slice(0, b"/tmp\0x");
        assert!(!paths.check_path_exists(&mut bad));
        assert!(paths.resolve_real_path(&mut bad).is_none());
    }
}
