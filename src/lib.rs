//! Hostpaths - Filesystem Path Builtins for Embedded Language Runtimes
//!
//! Bridges a runtime's reference-counted, capacity-tracked string buffers and the
//! NUL-terminated strings OS path calls expect, and exposes a set of filesystem
//! builtins (path queries, directory listing, mutations) on top of it.
//!
//! # Features
//!
//! - **Zero-copy marshalling**: a buffer with spare capacity is terminated in place
//! - **Adopting native results**: OS-allocated strings become managed buffers without a copy
//! - **Absent results**: a distinct sentinel, never confused with an empty buffer
//! - **Builtin registry**: stable ids, names and categories with a handle-based calling convention
//! - **Platform providers**: POSIX system calls, with a hard abort where the platform has none
//!
//! # Example
//!
//! ```rust,no_run
//! use hostpaths::{ManagedBuffer, PathBuiltins};
//!
//! let paths = PathBuiltins::with_defaults();
//! let mut dir = paths.get_cwd().expect("working directory");
//! for name in paths.read_directory_contents(&mut dir).into_iter().flatten() {
//!     println!("{}", String::from_utf8_lossy(name.as_slice()));
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Host program   │  calls builtins by id / name with u64 handles
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ BuiltinRegistry │  handles -> ManagedBuffer, results -> handles
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │  PathBuiltins   │  ToNative / FromNative, errors -> false / absent
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │   FsProvider    │  libc on POSIX, abort elsewhere
//! └─────────────────┘
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod paths;
pub mod platform;
pub mod runtime;

// Re-export commonly used types
pub use config::{ConfigError, FsConfig, ListingConfig, LoggingConfig, PathsConfig};
pub use error::{AdapterError, FsError, FsResult};
pub use paths::PathBuiltins;
pub use platform::{default_provider, FileKind, FsProvider, Platform};
pub use runtime::{
    builtin_ids, BufferHandle, BufferList, BuiltinCategory, BuiltinError, BuiltinRegistry,
    HandleManager, ManagedBuffer, NativeStr, Nullable, NULL_HANDLE,
};
