//! Integration Tests for the Managed-Buffer Adapter
//!
//! Tests the conversion discipline between managed buffers and native strings:
//! - In-place termination vs scratch copies
//! - Adoption of native strings
//! - Absent results
//! - Listing growth

use hostpaths::{AdapterError, BufferList, ManagedBuffer};
use rstest::rstest;
use std::ffi::CString;

// =============================================================================
// ToNative
// =============================================================================

#[rstest]
#[case(b"".as_slice(), 1)]
#[case(b"a".as_slice(), 2)]
#[case(b"abcde".as_slice(), 6)]
#[case(b"/usr/local/lib".as_slice(), 64)]
fn test_spare_capacity_terminates_in_place(#[case] content: &[u8], #[case] capacity: usize) {
    let mut buf = ManagedBuffer::from_slice_with_capacity(0, content, capacity).unwrap();
    let storage = buf.as_ptr();

    let native = buf.to_native().unwrap();
    assert!(!native.is_scratch());
    assert_eq!(native.as_ptr() as *const u8, storage);
    assert_eq!(native.to_bytes(), content);
    assert!(!native.release());

    assert_eq!(buf.as_slice(), content);
    assert_eq!(buf.spare_bytes()[0], 0);
}

#[rstest]
#[case(b"".as_slice())]
#[case(b"a".as_slice())]
#[case(b"abcde".as_slice())]
#[case(b"/home/user/with space".as_slice())]
fn test_full_buffer_is_copied(#[case] content: &[u8]) {
    let mut buf = ManagedBuffer::from_slice(0, content);
    assert_eq!(buf.capacity(), buf.len());

    let native = buf.to_native().unwrap();
    assert!(native.is_scratch());
    assert_eq!(native.to_bytes_with_nul().len(), content.len() + 1);
    assert_eq!(native.to_bytes(), content);
    assert!(native.release());

    assert_eq!(buf.as_slice(), content);
    assert_eq!(buf.capacity(), content.len());
}

#[test]
fn test_scenario_cap5_len5_copies() {
    let mut buf = ManagedBuffer::from_slice_with_capacity(0, b"abcde", 5).unwrap();
    let native = buf.to_native().unwrap();
    assert!(native.is_scratch());
    assert_eq!(native.to_bytes_with_nul(), b"abcde\0");
    drop(native);
    assert_eq!(buf.as_slice(), b"abcde");
}

#[test]
fn test_scenario_cap6_len5_in_place() {
    let mut buf = ManagedBuffer::from_slice_with_capacity(0, b"abcde", 6).unwrap();
    let storage = buf.as_ptr();

    let native = buf.to_native().unwrap();
    assert!(!native.is_scratch());
    assert_eq!(native.as_ptr() as *const u8, storage);
    assert_eq!(native.to_bytes_with_nul(), b"abcde\0");
    drop(native);
    assert_eq!(buf.as_slice(), b"abcde");
    assert_eq!(buf.spare_bytes(), &[0]);
}

#[test]
fn test_interior_nul_has_no_native_form() {
    let mut buf = ManagedBuffer::from_slice(0, b"ab\0cd");
    assert_eq!(
        buf.to_native().unwrap_err(),
        AdapterError::InteriorNul { offset: 2 }
    );
}

// =============================================================================
// FromNative
// =============================================================================

#[rstest]
#[case(b"".as_slice(), 0)]
#[case(b"x".as_slice(), 5)]
#[case(b"/etc/hosts".as_slice(), 10)]
fn test_round_trip_reproduces_content(#[case] content: &[u8], #[case] spare: usize) {
    let mut original =
        ManagedBuffer::from_slice_with_capacity(0, content, content.len() + spare).unwrap();
    let native = original.to_native().unwrap().into_c_string();

    let adopted = ManagedBuffer::from_native(1, native);
    assert_eq!(adopted.len(), original.len());
    assert_eq!(adopted.as_slice(), original.as_slice());
    assert_eq!(adopted.capacity(), content.len() + 1);
    assert_eq!(adopted.ref_count(), 1);
}

#[test]
fn test_adopted_buffer_converts_without_copy() {
    let mut buf = ManagedBuffer::from_native(0, CString::new("/var/tmp").unwrap());
    let storage = buf.as_ptr();
    let native = buf.to_native().unwrap();
    assert!(!native.is_scratch());
    assert_eq!(native.as_ptr() as *const u8, storage);
}

#[rstest]
#[case(4, 5, true)]
#[case(4, 64, true)]
#[case(4, 4, false)]
#[case(4, 0, false)]
fn test_explicit_capacity_must_cover_terminator(
    #[case] len: usize,
    #[case] capacity: usize,
    #[case] accepted: bool,
) {
    let mut raw = vec![b'p'; len];
    raw.push(0);
    raw.resize(capacity.max(len + 1), 0);

    let result = ManagedBuffer::from_native_with_capacity(0, raw, capacity);
    if accepted {
        let buf = result.unwrap();
        assert_eq!(buf.len(), len);
        assert_eq!(buf.capacity(), capacity);
    } else {
        assert_eq!(
            result.unwrap_err(),
            AdapterError::InvalidCapacity {
                capacity,
                required: len + 1
            }
        );
    }
}

// =============================================================================
// AbsentResult
// =============================================================================

#[test]
fn test_absent_is_not_empty() {
    let absent = ManagedBuffer::absent();
    let empty = Some(ManagedBuffer::new(0));
    assert!(absent.is_none());
    assert!(empty.as_ref().is_some_and(|b| b.is_empty()));
    assert_ne!(absent, empty);
}

// =============================================================================
// AppendCollected
// =============================================================================

#[test]
fn test_append_collected_preserves_order_and_counts() {
    let mut list = BufferList::with_capacity(0, 1);
    let names: Vec<String> = (0..33).map(|i| format!("entry{i}")).collect();
    let mut capacities = Vec::new();

    for name in &names {
        list.append_collected(ManagedBuffer::from_str(1, name));
        capacities.push(list.capacity());
    }

    assert_eq!(list.len(), names.len());
    assert!(list.capacity() >= list.len());
    assert_eq!(list.capacity(), 64);
    capacities.dedup();
    assert_eq!(capacities, [1, 2, 4, 8, 16, 32, 64]);

    let collected: Vec<_> = list.iter().map(|b| b.as_str().unwrap()).collect();
    assert_eq!(collected, names);
    assert!(list.iter().all(|b| b.ref_count() == 1));
}
