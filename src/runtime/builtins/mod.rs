//! Builtin Registry
//!
//! Host programs call filesystem builtins by stable id or by name. Arguments and
//! results cross the boundary as `u64` words: buffers and lists travel as
//! handles from [`HandleManager`](super::handles::HandleManager), booleans as
//! `1`/`0`, and the absent result as handle `0`.
//!
//! # Architecture
//!
//! ```text
//! Host calls:      builtin "check_path_is_dir", h_path
//!                          |
//!                          v
//! Registry:        "check_path_is_dir" -> ID 10
//!                          |
//!                          v
//! Runtime calls:   registry.call(10, args, outputs)
//! ```
//!
//! # Builtin Categories
//!
//! | Category | IDs | Description |
//! |----------|-----|-------------|
//! | Query | 1-11 | Separator, drive letters, home, cwd, real path, link target, predicates |
//! | Listing | 12 | Directory contents |
//! | Mutation | 13-20 | Create, link, rename, remove, change directory |

pub mod paths;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::trace;

use crate::config::PathsConfig;
use crate::paths::PathBuiltins;

use super::handles::BufferHandle;

// =============================================================================
// Error Types
// =============================================================================

/// Calling-convention failures at the handle boundary.
///
/// Filesystem failures are not errors here: they come back as `0` results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuiltinError {
    #[error("builtin {0} not found")]
    NotFound(u32),

    #[error("no builtin named {0:?}")]
    UnknownName(String),

    #[error("expected {expected} arguments, got {got}")]
    InvalidArgCount { expected: usize, got: usize },

    #[error("invalid handle {0}")]
    InvalidHandle(BufferHandle),

    #[error("handle {handle} does not refer to a {expected}")]
    WrongKind {
        handle: BufferHandle,
        expected: &'static str,
    },
}

// =============================================================================
// Builtin Category
// =============================================================================

/// Category of builtin for organization and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinCategory {
    Query,
    Listing,
    Mutation,
}

impl fmt::Display for BuiltinCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuiltinCategory::Query => write!(f, "query"),
            BuiltinCategory::Listing => write!(f, "listing"),
            BuiltinCategory::Mutation => write!(f, "mutation"),
        }
    }
}

/// How the `i64` return word of a builtin is to be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    /// `1` or `0`
    Bool,
    /// A single byte value
    Byte,
    /// Handle of a buffer, never `0`
    Buffer,
    /// Handle of a buffer, `0` when absent
    NullableBuffer,
    /// Handle of a buffer list, `0` when absent
    NullableList,
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnKind::Bool => write!(f, "bool"),
            ReturnKind::Byte => write!(f, "byte"),
            ReturnKind::Buffer => write!(f, "buffer"),
            ReturnKind::NullableBuffer => write!(f, "buffer?"),
            ReturnKind::NullableList => write!(f, "list?"),
        }
    }
}

// =============================================================================
// Builtin Function Types
// =============================================================================

/// Builtin function signature: (args, outputs) -> Result<return_value, error>
pub type BuiltinFn = Arc<dyn Fn(&[u64], &mut [u64]) -> Result<i64, BuiltinError> + Send + Sync>;

/// Builtin signature metadata
#[derive(Debug, Clone, Serialize)]
pub struct BuiltinSignature {
    pub name: String,
    pub description: String,
    pub arg_count: usize,
    pub returns: ReturnKind,
    pub category: BuiltinCategory,
}

/// A registered builtin entry
pub struct BuiltinEntry {
    pub id: u32,
    pub signature: BuiltinSignature,
    pub func: BuiltinFn,
}

impl fmt::Debug for BuiltinEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinEntry")
            .field("id", &self.id)
            .field("signature", &self.signature)
            .finish()
    }
}

// =============================================================================
// Builtin Registry
// =============================================================================

pub struct BuiltinRegistry {
    by_id: HashMap<u32, BuiltinEntry>,
    by_name: HashMap<String, u32>,
    paths: Arc<PathBuiltins>,
}

impl BuiltinRegistry {
    /// Create a registry with every path builtin registered
    pub fn new(builtins: Arc<PathBuiltins>) -> Self {
        let mut registry = Self {
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            paths: Arc::clone(&builtins),
        };
        paths::register_paths(&mut registry, builtins);
        registry
    }

    /// Create a registry over the platform provider with the given configuration
    pub fn with_config(config: PathsConfig) -> Self {
        Self::new(Arc::new(PathBuiltins::from_config(config)))
    }

    /// The typed builtins the registry dispatches to
    pub fn paths(&self) -> &Arc<PathBuiltins> {
        &self.paths
    }

    /// Register a builtin with a specific ID
    pub fn register_with_id(
        &mut self,
        id: u32,
        name: &str,
        description: &str,
        arg_count: usize,
        returns: ReturnKind,
        category: BuiltinCategory,
        func: BuiltinFn,
    ) {
        let signature = BuiltinSignature {
            name: name.to_string(),
            description: description.to_string(),
            arg_count,
            returns,
            category,
        };

        self.by_name.insert(name.to_string(), id);
        self.by_id.insert(
            id,
            BuiltinEntry {
                id,
                signature,
                func,
            },
        );
    }

    pub fn get(&self, id: u32) -> Option<&BuiltinEntry> {
        self.by_id.get(&id)
    }

    pub fn get_id(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&BuiltinEntry> {
        self.by_name.get(name).and_then(|id| self.by_id.get(id))
    }

    /// Call a builtin by ID
    pub fn call(&self, id: u32, args: &[u64], outputs: &mut [u64]) -> Result<i64, BuiltinError> {
        let entry = self.get(id).ok_or(BuiltinError::NotFound(id))?;

        if args.len() < entry.signature.arg_count {
            return Err(BuiltinError::InvalidArgCount {
                expected: entry.signature.arg_count,
                got: args.len(),
            });
        }

        trace!(id, name = %entry.signature.name, "builtin call");
        (entry.func)(args, outputs)
    }

    /// Call a builtin by name
    pub fn call_by_name(
        &self,
        name: &str,
        args: &[u64],
        outputs: &mut [u64],
    ) -> Result<i64, BuiltinError> {
        let id = self
            .get_id(name)
            .ok_or_else(|| BuiltinError::UnknownName(name.to_string()))?;
        self.call(id, args, outputs)
    }

    /// All builtins, ordered by ID
    pub fn list(&self) -> Vec<&BuiltinEntry> {
        let mut entries: Vec<_> = self.by_id.values().collect();
        entries.sort_by_key(|e| e.id);
        entries
    }

    pub fn list_by_category(&self, category: BuiltinCategory) -> Vec<&BuiltinEntry> {
        self.list()
            .into_iter()
            .filter(|e| e.signature.category == category)
            .collect()
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::with_config(PathsConfig::default())
    }
}

// =============================================================================
// Builtin IDs
// =============================================================================

/// Predefined builtin IDs (stable across releases)
pub mod builtin_ids {
    // Queries (1-11)
    pub const PATH_SEP_STR: u32 = 1;
    pub const PATH_SEP_CHR: u32 = 2;
    pub const PATHS_HAVE_DRIVE: u32 = 3;
    pub const GET_HOME_PATH: u32 = 4;
    pub const GET_CWD: u32 = 5;
    pub const RESOLVE_REAL_PATH: u32 = 6;
    pub const READ_SYMLINK: u32 = 7;
    pub const CHECK_PATH_EXISTS: u32 = 8;
    pub const CHECK_PATH_IS_FILE: u32 = 9;
    pub const CHECK_PATH_IS_DIR: u32 = 10;
    pub const CHECK_PATH_IS_SYMLINK: u32 = 11;

    // Listing (12)
    pub const READ_DIRECTORY_CONTENTS: u32 = 12;

    // Mutations (13-20)
    pub const MAKE_FILE: u32 = 13;
    pub const MAKE_DIRECTORY: u32 = 14;
    pub const MAKE_SYMLINK: u32 = 15;
    pub const MAKE_HARDLINK: u32 = 16;
    pub const RENAME_FILE: u32 = 17;
    pub const UNLINK_FILE: u32 = 18;
    pub const RMDIR: u32 = 19;
    pub const CHDIR: u32 = 20;
}
