//! Sorted map from byte strings to one-word payload cells, built on the
//! simplified judy array layout: an adaptive radix trie mixing sorted
//! linear nodes, 16x16 radix fan-outs and path-compressed spans, backed by
//! a segment arena. One cursor is shared by lookup, insertion, deletion and
//! iteration, so stepping to a neighbor costs only the key tail.
#![forbid(unsafe_code)]

mod arena;
mod cursor;
mod delete;
mod insert;
mod key;
mod node;
mod search;

#[cfg(test)]
mod test;

use arena::Arena;
use cursor::Cursor;
use node::{NodeRef, SLOT_BYTES};

/// Failures the container reports; anything else is a caller contract
/// violation and stays unsignaled.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// the host refused another arena segment
    #[error("out of memory chaining a new arena segment")]
    OutOfMemory,
    /// auxiliary requests are bounded by the segment size
    #[error("data request of {0} bytes does not fit inside one arena segment")]
    DataTooLarge(usize),
}

/// Handle to auxiliary memory obtained from [`Judy::data`], resolved
/// through the array that allocated it.
#[derive(Debug, Clone, Copy)]
pub struct DataRef {
    addr: u64,
    len: usize,
}

/// A judy array: keys are byte strings up to the length declared at
/// [`Judy::open`], each mapped to one `u64` cell. The caller must keep
/// every cell non-zero; a zero cell reads as an empty slot.
///
/// All operations position the shared cursor, so `cell`/`slot`/`strt` can
/// be freely mixed with `nxt`/`prv`/`del` walks. Keys compare as raw bytes;
/// a key containing a zero byte is stored, but reads back truncated at the
/// zero.
pub struct Judy {
    pub(crate) arena: Arena,
    pub(crate) cursor: Cursor,
    /// arena address of the word holding the root reference
    pub(crate) root: u64,
}

impl Judy {
    /// Open an empty array accepting keys up to `max_key` bytes.
    pub fn open(max_key: usize) -> Result<Self, Error> {
        let mut arena = Arena::new()?;
        let root = arena.data(SLOT_BYTES)?;
        Ok(Judy {
            arena,
            cursor: Cursor::new(max_key),
            root,
        })
    }

    pub(crate) fn root(&self) -> Option<NodeRef> {
        NodeRef::from_raw(self.arena.word(self.root))
    }

    /// Insert `key` if absent and return its cell; an existing key returns
    /// the cell it already has. Store a non-zero value into a fresh cell.
    pub fn cell(&mut self, key: &[u8]) -> Result<&mut u64, Error> {
        let cell = insert::insert(&mut self.arena, &mut self.cursor, self.root, key)?;
        Ok(self.arena.word_mut(cell))
    }

    /// Point lookup.
    pub fn slot(&mut self, key: &[u8]) -> Option<&mut u64> {
        let root = self.root();
        let cell = search::locate(&self.arena, &mut self.cursor, root, key)?;
        if self.arena.word(cell) == 0 {
            return None;
        }
        Some(self.arena.word_mut(cell))
    }

    /// Cell of the smallest key greater than or equal to `key`; the empty
    /// key starts from the first entry.
    pub fn strt(&mut self, key: &[u8]) -> Option<&mut u64> {
        let root = self.root();
        let cell = search::ceil(&self.arena, &mut self.cursor, root, key)?;
        Some(self.arena.word_mut(cell))
    }

    /// Last entry of the array.
    pub fn end(&mut self) -> Option<&mut u64> {
        self.cursor.clear();
        let root = self.root();
        let cell = search::last(&self.arena, &mut self.cursor, root, 0)?;
        Some(self.arena.word_mut(cell))
    }

    /// Entry after the cursor; a fresh cursor starts at the first entry.
    pub fn nxt(&mut self) -> Option<&mut u64> {
        let root = self.root();
        let cell = search::next_entry(&self.arena, &mut self.cursor, root)?;
        Some(self.arena.word_mut(cell))
    }

    /// Entry before the cursor; a fresh cursor starts at the last entry.
    pub fn prv(&mut self) -> Option<&mut u64> {
        let root = self.root();
        let cell = search::prev_entry(&self.arena, &mut self.cursor, root)?;
        Some(self.arena.word_mut(cell))
    }

    /// Delete the entry under the cursor and return its predecessor's cell,
    /// or `None` once the array is empty (or the cursor was never set).
    pub fn del(&mut self) -> Option<&mut u64> {
        let cell = delete::delete(&mut self.arena, &mut self.cursor, self.root)?;
        Some(self.arena.word_mut(cell))
    }

    /// Reconstruct the key at the cursor into `buf`, zero-terminated;
    /// returns the length written, truncated to the buffer.
    pub fn key(&self, buf: &mut [u8]) -> usize {
        key::reconstruct(&self.arena, &self.cursor, buf)
    }

    /// Read-only clone: it shares this array's nodes and starts with a copy
    /// of the current cursor, but walks with a cursor of its own. The view
    /// borrows the array, so the array outlives it and cannot be mutated
    /// while it is alive.
    pub fn view(&self) -> JudyView<'_> {
        JudyView {
            arena: &self.arena,
            cursor: self.cursor.clone(),
            root: self.root,
        }
    }

    /// Zeroed scratch memory owned by the array's arena, 8-byte aligned.
    /// Lives until the array is dropped.
    pub fn data(&mut self, len: usize) -> Result<DataRef, Error> {
        let addr = self.arena.data(len)?;
        Ok(DataRef { addr, len })
    }

    pub fn data_bytes(&self, data: DataRef) -> &[u8] {
        self.arena.bytes(data.addr, data.len)
    }

    pub fn data_bytes_mut(&mut self, data: DataRef) -> &mut [u8] {
        self.arena.bytes_mut(data.addr, data.len)
    }

    /// Bytes of arena memory held, a multiple of the segment size.
    pub fn memory(&self) -> usize {
        self.arena.footprint()
    }
}

/// Read-only view over a [`Judy`] array, created by [`Judy::view`]. Lookup
/// and traversal mirror the owner's operations but yield cell values.
pub struct JudyView<'a> {
    arena: &'a Arena,
    cursor: Cursor,
    root: u64,
}

impl JudyView<'_> {
    fn root(&self) -> Option<NodeRef> {
        NodeRef::from_raw(self.arena.word(self.root))
    }

    pub fn slot(&mut self, key: &[u8]) -> Option<u64> {
        let root = self.root();
        let cell = search::locate(self.arena, &mut self.cursor, root, key)?;
        Some(self.arena.word(cell)).filter(|value| *value != 0)
    }

    pub fn strt(&mut self, key: &[u8]) -> Option<u64> {
        let root = self.root();
        let cell = search::ceil(self.arena, &mut self.cursor, root, key)?;
        Some(self.arena.word(cell))
    }

    pub fn end(&mut self) -> Option<u64> {
        self.cursor.clear();
        let root = self.root();
        let cell = search::last(self.arena, &mut self.cursor, root, 0)?;
        Some(self.arena.word(cell))
    }

    pub fn nxt(&mut self) -> Option<u64> {
        let root = self.root();
        let cell = search::next_entry(self.arena, &mut self.cursor, root)?;
        Some(self.arena.word(cell))
    }

    pub fn prv(&mut self) -> Option<u64> {
        let root = self.root();
        let cell = search::prev_entry(self.arena, &mut self.cursor, root)?;
        Some(self.arena.word(cell))
    }

    pub fn key(&self, buf: &mut [u8]) -> usize {
        key::reconstruct(self.arena, &self.cursor, buf)
    }
}
