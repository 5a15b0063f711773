//! Handle Management
//!
//! Values crossing the host boundary live in a process-wide table and are passed
//! as `u64` handles. Handle `0` is never allocated and stands for an absent
//! value.
//!
//! The table lock is held only to look a handle up. Each value has its own
//! mutex, so a builtin blocked in a system call holds nothing but its own
//! argument buffers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::buffer::{BufferList, ManagedBuffer};

/// A handle to a value stored in the global handle manager
pub type BufferHandle = u64;

/// The absent handle
pub const NULL_HANDLE: BufferHandle = 0;

/// A value held on behalf of the host
#[derive(Clone, Debug)]
pub enum HostValue {
    Buffer(ManagedBuffer),
    List(BufferList),
}

impl HostValue {
    pub fn as_buffer(&self) -> Option<&ManagedBuffer> {
        match self {
            HostValue::Buffer(buf) => Some(buf),
            HostValue::List(_) => None,
        }
    }

    pub fn as_buffer_mut(&mut self) -> Option<&mut ManagedBuffer> {
        match self {
            HostValue::Buffer(buf) => Some(buf),
            HostValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&BufferList> {
        match self {
            HostValue::List(list) => Some(list),
            HostValue::Buffer(_) => None,
        }
    }

    pub fn into_buffer(self) -> Option<ManagedBuffer> {
        match self {
            HostValue::Buffer(buf) => Some(buf),
            HostValue::List(_) => None,
        }
    }

    pub fn into_list(self) -> Option<BufferList> {
        match self {
            HostValue::List(list) => Some(list),
            HostValue::Buffer(_) => None,
        }
    }
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

fn next_handle() -> BufferHandle {
    NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
}

/// One stored value. Each slot has its own lock; the table lock only guards
/// the handle map and is never held while a slot is in use.
type Slot = Arc<Mutex<HostValue>>;

lazy_static::lazy_static! {
    static ref HANDLE_STORAGE: RwLock<HashMap<BufferHandle, Slot>> = RwLock::new(HashMap::new());
}

/// Manager for host value handles
pub struct HandleManager;

impl HandleManager {
    /// Store a buffer and return its handle
    pub fn store_buffer(buffer: ManagedBuffer) -> BufferHandle {
        Self::store(HostValue::Buffer(buffer))
    }

    /// Store a list and return its handle
    pub fn store_list(list: BufferList) -> BufferHandle {
        Self::store(HostValue::List(list))
    }

    /// Store an optional buffer; absent maps to [`NULL_HANDLE`]
    pub fn store_nullable_buffer(buffer: Option<ManagedBuffer>) -> BufferHandle {
        buffer.map_or(NULL_HANDLE, Self::store_buffer)
    }

    /// Store an optional list; absent maps to [`NULL_HANDLE`]
    pub fn store_nullable_list(list: Option<BufferList>) -> BufferHandle {
        list.map_or(NULL_HANDLE, Self::store_list)
    }

    fn store(value: HostValue) -> BufferHandle {
        let handle = next_handle();
        HANDLE_STORAGE
            .write()
            .insert(handle, Arc::new(Mutex::new(value)));
        handle
    }

    /// Look up a slot; the table read lock is released before returning.
    fn slot(handle: BufferHandle) -> Option<Slot> {
        HANDLE_STORAGE.read().get(&handle).cloned()
    }

    /// Get a buffer by handle (clones the data)
    pub fn get_buffer(handle: BufferHandle) -> Option<ManagedBuffer> {
        let slot = Self::slot(handle)?;
        let value = slot.lock();
        value.as_buffer().cloned()
    }

    /// Get a list by handle (clones the data)
    pub fn get_list(handle: BufferHandle) -> Option<BufferList> {
        let slot = Self::slot(handle)?;
        let value = slot.lock();
        value.as_list().cloned()
    }

    /// Mutate a buffer by handle.
    ///
    /// Only this buffer's lock is held for the duration of `f`; calls on other
    /// handles proceed concurrently.
    pub fn with_buffer_mut<F, R>(handle: BufferHandle, f: F) -> Option<R>
    where
        F: FnOnce(&mut ManagedBuffer) -> R,
    {
        let slot = Self::slot(handle)?;
        let mut value = slot.lock();
        value.as_buffer_mut().map(f)
    }

    /// Mutate two buffers at once.
    ///
    /// Distinct handles are locked in ascending handle order. When both handles
    /// are the same, the second argument is a private copy of the first.
    pub fn with_buffer_pair_mut<F, R>(first: BufferHandle, second: BufferHandle, f: F) -> Option<R>
    where
        F: FnOnce(&mut ManagedBuffer, &mut ManagedBuffer) -> R,
    {
        if first == second {
            let slot = Self::slot(first)?;
            let mut value = slot.lock();
            let a = value.as_buffer_mut()?;
            let mut b = a.clone();
            return Some(f(a, &mut b));
        }

        let first_slot = Self::slot(first)?;
        let second_slot = Self::slot(second)?;
        let (mut a, mut b) = if first < second {
            let a = first_slot.lock();
            (a, second_slot.lock())
        } else {
            let b = second_slot.lock();
            (first_slot.lock(), b)
        };

        match (a.as_buffer_mut(), b.as_buffer_mut()) {
            (Some(a), Some(b)) => Some(f(a, b)),
            _ => None,
        }
    }

    /// Remove a value by handle and return it.
    ///
    /// A call still using the value finishes first; its result is what is returned.
    pub fn remove(handle: BufferHandle) -> Option<HostValue> {
        let slot = HANDLE_STORAGE.write().remove(&handle)?;
        let value = match Arc::try_unwrap(slot) {
            Ok(value) => value.into_inner(),
            Err(shared) => shared.lock().clone(),
        };
        Some(value)
    }

    /// Check if a handle exists
    pub fn exists(handle: BufferHandle) -> bool {
        HANDLE_STORAGE.read().contains_key(&handle)
    }

    /// Check if a handle refers to a buffer
    pub fn is_buffer(handle: BufferHandle) -> bool {
        Self::slot(handle).is_some_and(|slot| matches!(*slot.lock(), HostValue::Buffer(_)))
    }

    /// Get the number of stored values
    pub fn count() -> usize {
        HANDLE_STORAGE.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_manager() {
        let handle = HandleManager::store_buffer(ManagedBuffer::from_str(0, "test data"));
        assert_ne!(handle, NULL_HANDLE);

        let retrieved = HandleManager::get_buffer(handle).unwrap();
        assert_eq!(retrieved.as_slice(), b"test data");
        assert!(HandleManager::exists(handle));
        assert!(HandleManager::is_buffer(handle));
        assert!(HandleManager::get_list(handle).is_none());

        let removed = HandleManager::remove(handle).unwrap();
        assert_eq!(removed.into_buffer().unwrap().as_slice(), b"test data");
        assert!(!HandleManager::exists(handle));
    }

    #[test]
    fn test_nullable_maps_to_null_handle() {
        assert_eq!(HandleManager::store_nullable_buffer(None), NULL_HANDLE);
        assert_eq!(HandleManager::store_nullable_list(None), NULL_HANDLE);
        assert!(!HandleManager::exists(NULL_HANDLE));

        let h = HandleManager::store_nullable_buffer(Some(ManagedBuffer::new(0)));
        assert_ne!(h, NULL_HANDLE);
        assert!(HandleManager::get_buffer(h).unwrap().is_empty());
        HandleManager::remove(h);
    }

    #[test]
    fn test_with_buffer_mut_converts_in_place() {
        let buf = ManagedBuffer::from_slice_with_capacity(0, b"abc", 4).unwrap();
        let handle = HandleManager::store_buffer(buf);

        let scratch = HandleManager::with_buffer_mut(handle, |b| {
            b.to_native().map(|n| n.is_scratch())
        })
        .unwrap()
        .unwrap();
        assert!(!scratch);

        let stored = HandleManager::get_buffer(handle).unwrap();
        assert_eq!(stored.spare_bytes(), &[0]);
        HandleManager::remove(handle);
    }

    #[test]
    fn test_pair_with_same_handle() {
        let handle = HandleManager::store_buffer(ManagedBuffer::from_str(0, "same"));
        let equal = HandleManager::with_buffer_pair_mut(handle, handle, |a, b| {
            a.as_slice() == b.as_slice()
        });
        assert_eq!(equal, Some(true));
        HandleManager::remove(handle);
    }

    #[test]
    fn test_pair_with_missing_handle_is_none() {
        let handle = HandleManager::store_buffer(ManagedBuffer::from_str(0, "kept"));
        let missing = HandleManager::store_buffer(ManagedBuffer::new(0));
        HandleManager::remove(missing);

        assert!(HandleManager::with_buffer_pair_mut(handle, missing, |_, _| ()).is_none());
        assert!(HandleManager::with_buffer_pair_mut(missing, handle, |_, _| ()).is_none());
        assert!(HandleManager::exists(handle));
        HandleManager::remove(handle);
    }

    #[test]
    fn test_pair_arguments_keep_call_order() {
        let low = HandleManager::store_buffer(ManagedBuffer::from_str(0, "low"));
        let high = HandleManager::store_buffer(ManagedBuffer::from_str(0, "high"));

        let seen = HandleManager::with_buffer_pair_mut(high, low, |a, b| {
            (a.as_str().unwrap().to_string(), b.as_str().unwrap().to_string())
        });
        assert_eq!(seen, Some(("high".to_string(), "low".to_string())));

        HandleManager::remove(low);
        HandleManager::remove(high);
    }

    #[test]
    fn test_table_usable_while_a_buffer_is_held() {
        let held = HandleManager::store_buffer(ManagedBuffer::from_str(0, "held"));
        let other = HandleManager::store_buffer(ManagedBuffer::from_str(0, "other"));

        let seen = HandleManager::with_buffer_mut(held, |_| {
            // Table operations on other handles must not wait for this closure.
            let fresh = HandleManager::store_buffer(ManagedBuffer::new(0));
            let read = HandleManager::get_buffer(other).map(|b| b.as_slice().to_vec());
            HandleManager::remove(fresh);
            read
        });
        assert_eq!(seen, Some(Some(b"other".to_vec())));

        HandleManager::remove(held);
        HandleManager::remove(other);
    }

    #[test]
    fn test_remove_while_shared_returns_value() {
        let handle = HandleManager::store_buffer(ManagedBuffer::from_str(0, "shared"));
        let slot = HandleManager::slot(handle).unwrap();

        let removed = HandleManager::remove(handle).unwrap();
        assert_eq!(removed.into_buffer().unwrap().as_slice(), b"shared");
        assert!(!HandleManager::exists(handle));
        assert!(slot.lock().as_buffer().is_some());
    }
}
