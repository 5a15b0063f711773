//! Path Builtin Registration
//!
//! Binds every [`PathBuiltins`] function to its id. Each argument buffer is
//! locked for the duration of the call so ToNative has exclusive access to it;
//! no other handle is blocked.

use std::sync::Arc;

use super::{builtin_ids, BuiltinCategory, BuiltinError, BuiltinRegistry, ReturnKind};
use crate::paths::PathBuiltins;
use crate::runtime::buffer::ManagedBuffer;
use crate::runtime::handles::{BufferHandle, HandleManager};

// =============================================================================
// Argument and Result Helpers
// =============================================================================

fn missing_buffer(handle: BufferHandle) -> BuiltinError {
    if HandleManager::exists(handle) {
        BuiltinError::WrongKind {
            handle,
            expected: "buffer",
        }
    } else {
        BuiltinError::InvalidHandle(handle)
    }
}

/// Run `f` on the buffer behind `handle`
fn with_path<R>(
    handle: BufferHandle,
    f: impl FnOnce(&mut ManagedBuffer) -> R,
) -> Result<R, BuiltinError> {
    HandleManager::with_buffer_mut(handle, f).ok_or_else(|| missing_buffer(handle))
}

/// Run `f` on the two buffers behind `first` and `second`
fn with_path_pair<R>(
    first: BufferHandle,
    second: BufferHandle,
    f: impl FnOnce(&mut ManagedBuffer, &mut ManagedBuffer) -> R,
) -> Result<R, BuiltinError> {
    HandleManager::with_buffer_pair_mut(first, second, f).ok_or_else(|| {
        if HandleManager::is_buffer(first) {
            missing_buffer(second)
        } else {
            missing_buffer(first)
        }
    })
}

/// Write the result word to `outputs[0]` and return it
fn finish(outputs: &mut [u64], word: u64) -> Result<i64, BuiltinError> {
    if let Some(slot) = outputs.first_mut() {
        *slot = word;
    }
    Ok(word as i64)
}

fn finish_bool(outputs: &mut [u64], value: bool) -> Result<i64, BuiltinError> {
    finish(outputs, u64::from(value))
}

// =============================================================================
// Builtin Registration
// =============================================================================

pub fn register_paths(registry: &mut BuiltinRegistry, paths: Arc<PathBuiltins>) {
    // path_sep_str: separator as a fresh buffer
    let p = Arc::clone(&paths);
    registry.register_with_id(
        builtin_ids::PATH_SEP_STR,
        "path_sep_str",
        "Path separator as a one-byte buffer. Returns buffer_handle.",
        0,
        ReturnKind::Buffer,
        BuiltinCategory::Query,
        Arc::new(move |_args, outputs| {
            let handle = HandleManager::store_buffer(p.path_sep_str());
            finish(outputs, handle)
        }),
    );

    // path_sep_chr: separator byte
    let p = Arc::clone(&paths);
    registry.register_with_id(
        builtin_ids::PATH_SEP_CHR,
        "path_sep_chr",
        "Path separator byte.",
        0,
        ReturnKind::Byte,
        BuiltinCategory::Query,
        Arc::new(move |_args, outputs| finish(outputs, u64::from(p.path_sep_chr()))),
    );

    // paths_have_drive: drive-letter syntax flag
    let p = Arc::clone(&paths);
    registry.register_with_id(
        builtin_ids::PATHS_HAVE_DRIVE,
        "paths_have_drive",
        "Whether paths carry drive letters. Returns 1 or 0.",
        0,
        ReturnKind::Bool,
        BuiltinCategory::Query,
        Arc::new(move |_args, outputs| finish_bool(outputs, p.paths_have_drive())),
    );

    // get_home_path
    let p = Arc::clone(&paths);
    registry.register_with_id(
        builtin_ids::GET_HOME_PATH,
        "get_home_path",
        "Home directory of the current user. Returns buffer_handle or 0.",
        0,
        ReturnKind::NullableBuffer,
        BuiltinCategory::Query,
        Arc::new(move |_args, outputs| {
            let handle = HandleManager::store_nullable_buffer(p.get_home_path());
            finish(outputs, handle)
        }),
    );

    // get_cwd
    let p = Arc::clone(&paths);
    registry.register_with_id(
        builtin_ids::GET_CWD,
        "get_cwd",
        "Current working directory. Returns buffer_handle or 0.",
        0,
        ReturnKind::NullableBuffer,
        BuiltinCategory::Query,
        Arc::new(move |_args, outputs| {
            let handle = HandleManager::store_nullable_buffer(p.get_cwd());
            finish(outputs, handle)
        }),
    );

    // resolve_real_path
    let p = Arc::clone(&paths);
    registry.register_with_id(
        builtin_ids::RESOLVE_REAL_PATH,
        "resolve_real_path",
        "Canonical absolute path. Args: path_handle. Returns buffer_handle or 0.",
        1,
        ReturnKind::NullableBuffer,
        BuiltinCategory::Query,
        Arc::new(move |args, outputs| {
            let resolved = with_path(args[0], |path| p.resolve_real_path(path))?;
            finish(outputs, HandleManager::store_nullable_buffer(resolved))
        }),
    );

    // read_symlink
    let p = Arc::clone(&paths);
    registry.register_with_id(
        builtin_ids::READ_SYMLINK,
        "read_symlink",
        "Target of a symbolic link. Args: path_handle. Returns buffer_handle or 0.",
        1,
        ReturnKind::NullableBuffer,
        BuiltinCategory::Query,
        Arc::new(move |args, outputs| {
            let target = with_path(args[0], |path| p.read_symlink(path))?;
            finish(outputs, HandleManager::store_nullable_buffer(target))
        }),
    );

    // Predicates
    let predicates: [(u32, &str, &str, fn(&PathBuiltins, &mut ManagedBuffer) -> bool); 4] = [
        (
            builtin_ids::CHECK_PATH_EXISTS,
            "check_path_exists",
            "Whether the path exists (follows links). Args: path_handle. Returns 1 or 0.",
            PathBuiltins::check_path_exists,
        ),
        (
            builtin_ids::CHECK_PATH_IS_FILE,
            "check_path_is_file",
            "Whether the path is a regular file (follows links). Args: path_handle. Returns 1 or 0.",
            PathBuiltins::check_path_is_file,
        ),
        (
            builtin_ids::CHECK_PATH_IS_DIR,
            "check_path_is_dir",
            "Whether the path is a directory (follows links). Args: path_handle. Returns 1 or 0.",
            PathBuiltins::check_path_is_dir,
        ),
        (
            builtin_ids::CHECK_PATH_IS_SYMLINK,
            "check_path_is_symlink",
            "Whether the path itself is a symbolic link. Args: path_handle. Returns 1 or 0.",
            PathBuiltins::check_path_is_symlink,
        ),
    ];
    for (id, name, description, check) in predicates {
        let p = Arc::clone(&paths);
        registry.register_with_id(
            id,
            name,
            description,
            1,
            ReturnKind::Bool,
            BuiltinCategory::Query,
            Arc::new(move |args, outputs| {
                let ok = with_path(args[0], |path| check(&p, path))?;
                finish_bool(outputs, ok)
            }),
        );
    }

    // read_directory_contents
    let p = Arc::clone(&paths);
    registry.register_with_id(
        builtin_ids::READ_DIRECTORY_CONTENTS,
        "read_directory_contents",
        "Entry names of a directory. Args: path_handle. Returns list_handle or 0.",
        1,
        ReturnKind::NullableList,
        BuiltinCategory::Listing,
        Arc::new(move |args, outputs| {
            let listing = with_path(args[0], |path| p.read_directory_contents(path))?;
            finish(outputs, HandleManager::store_nullable_list(listing))
        }),
    );

    // Single-path mutations
    let mutations: [(u32, &str, &str, fn(&PathBuiltins, &mut ManagedBuffer) -> bool); 5] = [
        (
            builtin_ids::MAKE_FILE,
            "make_file",
            "Create or truncate a regular file. Args: path_handle. Returns 1 or 0.",
            PathBuiltins::make_file,
        ),
        (
            builtin_ids::MAKE_DIRECTORY,
            "make_directory",
            "Create a directory. Args: path_handle. Returns 1 or 0.",
            PathBuiltins::make_directory,
        ),
        (
            builtin_ids::UNLINK_FILE,
            "unlink_file",
            "Remove a directory entry. Args: path_handle. Returns 1 or 0.",
            PathBuiltins::unlink_file,
        ),
        (
            builtin_ids::RMDIR,
            "rmdir",
            "Remove an empty directory. Args: path_handle. Returns 1 or 0.",
            PathBuiltins::rmdir,
        ),
        (
            builtin_ids::CHDIR,
            "chdir",
            "Change the process working directory. Args: path_handle. Returns 1 or 0.",
            PathBuiltins::chdir,
        ),
    ];
    for (id, name, description, mutate) in mutations {
        let p = Arc::clone(&paths);
        registry.register_with_id(
            id,
            name,
            description,
            1,
            ReturnKind::Bool,
            BuiltinCategory::Mutation,
            Arc::new(move |args, outputs| {
                let ok = with_path(args[0], |path| mutate(&p, path))?;
                finish_bool(outputs, ok)
            }),
        );
    }

    // Two-path mutations: the first argument names the path that exists afterwards
    let links: [(
        u32,
        &str,
        &str,
        fn(&PathBuiltins, &mut ManagedBuffer, &mut ManagedBuffer) -> bool,
    ); 3] = [
        (
            builtin_ids::MAKE_SYMLINK,
            "make_symlink",
            "Create symbolic link `from` pointing at `to`. Args: from_handle, to_handle. Returns 1 or 0.",
            PathBuiltins::make_symlink,
        ),
        (
            builtin_ids::MAKE_HARDLINK,
            "make_hardlink",
            "Create `from` as a hard link to existing `to`. Args: from_handle, to_handle. Returns 1 or 0.",
            PathBuiltins::make_hardlink,
        ),
        (
            builtin_ids::RENAME_FILE,
            "rename_file",
            "Move `to` to `from`. Args: from_handle, to_handle. Returns 1 or 0.",
            PathBuiltins::rename_file,
        ),
    ];
    for (id, name, description, link) in links {
        let p = Arc::clone(&paths);
        registry.register_with_id(
            id,
            name,
            description,
            2,
            ReturnKind::Bool,
            BuiltinCategory::Mutation,
            Arc::new(move |args, outputs| {
                let ok = with_path_pair(args[0], args[1], |from, to| link(&p, from, to))?;
                finish_bool(outputs, ok)
            }),
        );
    }
}
