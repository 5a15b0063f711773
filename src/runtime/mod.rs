//! Runtime module
//!
//! Host-side value model and the builtin calling convention.
//!
//! # Buffers
//!
//! [`ManagedBuffer`] is the host's string representation. The buffer module
//! converts it to and from native strings for OS calls without copying when the
//! buffer's spare capacity allows.
//!
//! # Builtins
//!
//! The builtins module exposes the path operations to host programs under
//! stable ids. Values cross the boundary as handles into the global
//! [`HandleManager`] table.

pub mod buffer;
pub mod builtins;
pub mod handles;

pub use buffer::{BufferList, ManagedBuffer, NativeStr, Nullable, MIN_LIST_CAPACITY};
pub use builtins::{
    builtin_ids, BuiltinCategory, BuiltinEntry, BuiltinError, BuiltinFn, BuiltinRegistry,
    BuiltinSignature, ReturnKind,
};
pub use handles::{BufferHandle, HandleManager, HostValue, NULL_HANDLE};
