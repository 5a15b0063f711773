//! Working Directory Integration Tests
//!
//! `chdir` changes process-wide state, so these run in their own test binary
//! and in a single test function.

#![cfg(unix)]

use hostpaths::{BuiltinRegistry, HandleManager, ManagedBuffer, PathBuiltins, PathsConfig};
use std::env;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use tempfile::TempDir;

#[test]
fn test_chdir_and_get_cwd() {
    let original = env::current_dir().unwrap();
    let scratch = TempDir::new().unwrap();
    let canonical = fs::canonicalize(scratch.path()).unwrap();

    // A tiny first buffer forces the doubling path.
    let mut config = PathsConfig::default();
    config.fs.cwd_initial_capacity = 2;
    let paths = PathBuiltins::from_config(config);

    let mut target = ManagedBuffer::from_slice(0, canonical.as_os_str().as_bytes());
    assert!(paths.chdir(&mut target));

    let cwd = paths.get_cwd().expect("working directory");
    assert_eq!(cwd.as_slice(), canonical.as_os_str().as_bytes());
    assert!(cwd.capacity() > cwd.len());
    assert!(cwd.capacity().is_power_of_two());

    // The adopted buffer converts in place.
    let mut cwd = cwd;
    assert!(!cwd.to_native().unwrap().is_scratch());

    // Relative paths resolve against the new directory.
    let mut relative = ManagedBuffer::from_str(0, "child");
    assert!(paths.make_directory(&mut relative));
    assert!(canonical.join("child").is_dir());

    let missing = canonical.join("missing");
    assert!(!paths.chdir(&mut ManagedBuffer::from_slice(0, missing.as_os_str().as_bytes())));
    assert_eq!(env::current_dir().unwrap(), canonical);

    // Same flow through the handle boundary.
    let registry = BuiltinRegistry::default();
    let child = HandleManager::store_buffer(ManagedBuffer::from_str(0, "child"));
    let mut outputs = [0u64; 1];
    assert_eq!(registry.call_by_name("chdir", &[child], &mut outputs), Ok(1));

    registry.call_by_name("get_cwd", &[], &mut outputs).unwrap();
    let cwd = HandleManager::remove(outputs[0]).unwrap().into_buffer().unwrap();
    assert_eq!(cwd.as_slice(), canonical.join("child").as_os_str().as_bytes());
    HandleManager::remove(child);

    env::set_current_dir(&original).unwrap();
}
