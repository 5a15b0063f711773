//! Managed Buffer Type
//!
//! The host runtime's string representation: a reference-counted byte buffer that
//! tracks its capacity separately from its logical length. This module converts
//! such buffers to NUL-terminated native strings and adopts native strings back
//! into managed buffers.
//!
//! # Conversion rules
//!
//! ```text
//! capacity > len   ToNative writes '\0' at storage[len], borrows the storage
//! capacity == len  ToNative copies len bytes into a fresh len+1 region
//! ```
//!
//! The returned [`NativeStr`] releases its scratch copy (if any) when dropped, so
//! every exit path of a caller frees it.
//!
//! # Example
//!
//! ```rust
//! use hostpaths::runtime::ManagedBuffer;
//!
//! let mut buf = ManagedBuffer::from_slice_with_capacity(0, b"/tmp", 5).unwrap();
//! let native = buf.to_native().unwrap();
//! assert!(!native.is_scratch());
//! assert_eq!(native.to_bytes(), b"/tmp");
//! ```

use std::borrow::Cow;
use std::ffi::{CStr, CString};
use std::fmt;

use crate::error::AdapterError;

/// A buffer that may be absent. `None` is the AbsentResult sentinel; it is never
/// represented by an empty buffer.
pub type Nullable<T> = Option<T>;

/// Host-owned, reference-counted, capacity-tracked byte buffer.
///
/// `storage.len()` is the capacity. Bytes past `len` are spare room the adapter
/// may overwrite with a terminator.
#[derive(Clone)]
pub struct ManagedBuffer {
    ref_count: u64,
    storage: Box<[u8]>,
    len: usize,
}

impl ManagedBuffer {
    /// Create an empty buffer with no capacity
    pub fn new(ref_count: u64) -> Self {
        Self {
            ref_count,
            storage: Box::default(),
            len: 0,
        }
    }

    /// Create an empty buffer with a specific capacity
    pub fn with_capacity(ref_count: u64, capacity: usize) -> Self {
        Self {
            ref_count,
            storage: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Copy `data` into a buffer whose capacity equals its length
    pub fn from_slice(ref_count: u64, data: &[u8]) -> Self {
        Self {
            ref_count,
            storage: data.into(),
            len: data.len(),
        }
    }

    /// Copy `data` into a buffer with room up to `capacity`
    pub fn from_slice_with_capacity(
        ref_count: u64,
        data: &[u8],
        capacity: usize,
    ) -> Result<Self, AdapterError> {
        if capacity < data.len() {
            return Err(AdapterError::InvalidCapacity {
                capacity,
                required: data.len(),
            });
        }
        let mut storage = vec![0u8; capacity];
        storage[..data.len()].copy_from_slice(data);
        Ok(Self {
            ref_count,
            storage: storage.into_boxed_slice(),
            len: data.len(),
        })
    }

    /// Create a buffer from a string (copies data)
    pub fn from_str(ref_count: u64, s: &str) -> Self {
        Self::from_slice(ref_count, s.as_bytes())
    }

    /// Adopt a native string without copying.
    ///
    /// The terminator stays in the storage and counts toward the capacity, so
    /// `capacity == len + 1` and a later [`to_native`](Self::to_native) reuses it.
    pub fn from_native(ref_count: u64, native: CString) -> Self {
        let storage = native.into_bytes_with_nul().into_boxed_slice();
        let len = storage.len() - 1;
        Self {
            ref_count,
            storage,
            len,
        }
    }

    /// Adopt an over-allocated native buffer (e.g. a `getcwd` buffer).
    ///
    /// The logical length is the offset of the first NUL in `raw`. `raw` must be
    /// exactly `capacity` bytes long, and `capacity` must cover the content and
    /// its terminator; the allocation is taken over as is, never resized.
    pub fn from_native_with_capacity(
        ref_count: u64,
        raw: Vec<u8>,
        capacity: usize,
    ) -> Result<Self, AdapterError> {
        let len = raw
            .iter()
            .position(|&b| b == 0)
            .ok_or(AdapterError::MissingTerminator)?;
        if capacity < len + 1 {
            tracing::error!(capacity, len, "native buffer adopted with too small a capacity");
            return Err(AdapterError::InvalidCapacity {
                capacity,
                required: len + 1,
            });
        }
        if raw.len() != capacity {
            tracing::error!(
                capacity,
                allocated = raw.len(),
                "native buffer length differs from its capacity"
            );
            return Err(AdapterError::CapacityMismatch {
                capacity,
                allocated: raw.len(),
            });
        }
        Ok(Self {
            ref_count,
            storage: raw.into_boxed_slice(),
            len,
        })
    }

    /// The AbsentResult sentinel
    pub fn absent() -> Nullable<Self> {
        None
    }

    /// Get the logical length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the allocated capacity
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes available past the logical content
    pub fn spare_capacity(&self) -> usize {
        self.storage.len() - self.len
    }

    /// Get the logical content
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    /// Get the spare bytes past the logical content
    pub fn spare_bytes(&self) -> &[u8] {
        &self.storage[self.len..]
    }

    /// Pointer to the start of the storage
    pub fn as_ptr(&self) -> *const u8 {
        self.storage.as_ptr()
    }

    /// Try to view the content as UTF-8
    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.as_slice())
    }

    pub fn ref_count(&self) -> u64 {
        self.ref_count
    }

    pub fn set_ref_count(&mut self, ref_count: u64) {
        self.ref_count = ref_count;
    }

    /// Add a reference, returning the new count
    pub fn retain(&mut self) -> u64 {
        self.ref_count += 1;
        self.ref_count
    }

    /// Drop a reference, returning the new count (saturates at zero)
    pub fn release(&mut self) -> u64 {
        self.ref_count = self.ref_count.saturating_sub(1);
        self.ref_count
    }

    /// ToNative: produce a NUL-terminated view of the content.
    ///
    /// With spare capacity the terminator is written in place at offset `len` and
    /// the storage is borrowed. Otherwise the content is copied into a `len + 1`
    /// scratch region. Bytes before `len` are never modified. The `&mut` receiver
    /// is the exclusivity the in-place write needs.
    pub fn to_native(&mut self) -> Result<NativeStr<'_>, AdapterError> {
        if let Some(offset) = self.as_slice().iter().position(|&b| b == 0) {
            return Err(AdapterError::InteriorNul { offset });
        }

        if self.storage.len() > self.len {
            self.storage[self.len] = 0;
            let cstr = CStr::from_bytes_with_nul(&self.storage[..=self.len])
                .map_err(|_| AdapterError::InteriorNul { offset: self.len })?;
            return Ok(NativeStr {
                inner: Cow::Borrowed(cstr),
            });
        }

        let mut scratch = Vec::with_capacity(self.len + 1);
        scratch.extend_from_slice(self.as_slice());
        let owned = CString::new(scratch).map_err(|e| AdapterError::InteriorNul {
            offset: e.nul_position(),
        })?;
        Ok(NativeStr {
            inner: Cow::Owned(owned),
        })
    }
}

impl Default for ManagedBuffer {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for ManagedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedBuffer")
            .field("ref_count", &self.ref_count)
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .field("content", &String::from_utf8_lossy(self.as_slice()))
            .finish()
    }
}

impl AsRef<[u8]> for ManagedBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Content equality; reference count and capacity are bookkeeping.
impl PartialEq for ManagedBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ManagedBuffer {}

// =============================================================================
// Native Strings
// =============================================================================

/// A transient NUL-terminated string produced by [`ManagedBuffer::to_native`].
///
/// Dropping it is ReleaseNative: a scratch copy is freed, a borrowed view
/// releases the buffer.
pub struct NativeStr<'a> {
    inner: Cow<'a, CStr>,
}

impl<'a> NativeStr<'a> {
    /// Whether the adapter allocated a scratch copy for this string
    pub fn is_scratch(&self) -> bool {
        matches!(self.inner, Cow::Owned(_))
    }

    pub fn as_c_str(&self) -> &CStr {
        &self.inner
    }

    pub fn as_ptr(&self) -> *const libc::c_char {
        self.inner.as_ptr()
    }

    /// Content without the terminator
    pub fn to_bytes(&self) -> &[u8] {
        self.inner.to_bytes()
    }

    /// Detach into an owned native string (copies when borrowed)
    pub fn into_c_string(self) -> CString {
        self.inner.into_owned()
    }

    /// ReleaseNative. Returns whether a scratch region was freed.
    pub fn release(self) -> bool {
        self.is_scratch()
    }
}

impl std::ops::Deref for NativeStr<'_> {
    type Target = CStr;

    fn deref(&self) -> &CStr {
        &self.inner
    }
}

impl fmt::Debug for NativeStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeStr")
            .field("value", &self.inner)
            .field("scratch", &self.is_scratch())
            .finish()
    }
}

// =============================================================================
// Buffer Lists
// =============================================================================

/// First capacity of a list that grows from zero
pub const MIN_LIST_CAPACITY: usize = 4;

/// Growable, reference-counted sequence of managed buffers (a directory listing).
#[derive(Clone, Debug)]
pub struct BufferList {
    ref_count: u64,
    items: Vec<ManagedBuffer>,
    capacity: usize,
}

impl BufferList {
    pub fn new(ref_count: u64) -> Self {
        Self::with_capacity(ref_count, 0)
    }

    pub fn with_capacity(ref_count: u64, capacity: usize) -> Self {
        Self {
            ref_count,
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// AppendCollected: take ownership of `item`, doubling capacity when full.
    ///
    /// `item` keeps the reference count its creator gave it.
    pub fn append_collected(&mut self, item: ManagedBuffer) {
        if self.items.len() == self.capacity {
            let new_capacity = if self.capacity == 0 {
                MIN_LIST_CAPACITY
            } else {
                self.capacity * 2
            };
            self.items.reserve_exact(new_capacity - self.items.len());
            self.capacity = new_capacity;
        }
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&ManagedBuffer> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManagedBuffer> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[ManagedBuffer] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<ManagedBuffer> {
        self.items
    }

    pub fn ref_count(&self) -> u64 {
        self.ref_count
    }

    pub fn set_ref_count(&mut self, ref_count: u64) {
        self.ref_count = ref_count;
    }
}

impl IntoIterator for BufferList {
    type Item = ManagedBuffer;
    type IntoIter = std::vec::IntoIter<ManagedBuffer>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a BufferList {
    type Item = &'a ManagedBuffer;
    type IntoIter = std::slice::Iter<'a, ManagedBuffer>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
