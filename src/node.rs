use std::num::NonZeroU64;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::arena::Arena;

/// Width of the key field inside a linear node; a node stores the bytes
/// remaining in the current key word, not one byte per level.
pub(crate) const KEY_BYTES: usize = 8;
pub(crate) const KEY_MASK: usize = KEY_BYTES - 1;
/// Width of a child reference or payload cell.
pub(crate) const SLOT_BYTES: usize = 8;
/// Capacity of the byte buffer in a span node.
pub(crate) const SPAN_BYTES: usize = 3 * KEY_BYTES;

/// Node byte sizes indexed by type tag.
pub(crate) const NODE_SIZE: [usize; 8] = [
    16 * SLOT_BYTES,               // radix fan-out table
    SLOT_BYTES + KEY_BYTES,        // linear nodes of doubling capacity
    2 * (SLOT_BYTES + KEY_BYTES),
    4 * (SLOT_BYTES + KEY_BYTES),
    8 * (SLOT_BYTES + KEY_BYTES),
    16 * (SLOT_BYTES + KEY_BYTES),
    32 * (SLOT_BYTES + KEY_BYTES),
    SPAN_BYTES + SLOT_BYTES,       // span buffer plus one child
];

/// Key-field masks indexed by significant byte count.
pub(crate) const LOW_MASK: [u64; 9] = [
    0,
    0xff,
    0xffff,
    0xff_ffff,
    0xffff_ffff,
    0xff_ffff_ffff,
    0xffff_ffff_ffff,
    0xff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
];

/// The node type carried in the low 3 bits of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub(crate) enum NodeType {
    /// two-level 16x16 fan-out on one key byte
    Radix = 0,
    Lin1 = 1,
    Lin2 = 2,
    Lin4 = 3,
    Lin8 = 4,
    Lin16 = 5,
    Lin32 = 6,
    /// path-compressed run of up to [`SPAN_BYTES`] tail bytes
    Span = 7,
}

impl NodeType {
    pub(crate) fn size(self) -> usize {
        NODE_SIZE[usize::from(u8::from(self))]
    }

    /// Free-list class for this type; radix and span nodes recycle through
    /// the linear class of identical byte size.
    pub(crate) fn reuse_class(self) -> NodeType {
        match self {
            NodeType::Radix => NodeType::Lin8,
            NodeType::Span => NodeType::Lin2,
            linear => linear,
        }
    }

    /// The next larger linear class.
    pub(crate) fn grown(self) -> NodeType {
        match self {
            NodeType::Lin1 => NodeType::Lin2,
            NodeType::Lin2 => NodeType::Lin4,
            NodeType::Lin4 => NodeType::Lin8,
            NodeType::Lin8 => NodeType::Lin16,
            NodeType::Lin16 => NodeType::Lin32,
            other => other,
        }
    }
}

/// Tagged reference to a live node: an 8-byte aligned arena address with the
/// [`NodeType`] in the low 3 bits. A zero word is an empty slot, so the
/// reference itself is non-zero and empty slots read as `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeRef(NonZeroU64);

impl NodeRef {
    pub(crate) fn new(addr: u64, kind: NodeType) -> Self {
        debug_assert_eq!(addr & KEY_MASK as u64, 0);
        // arena addresses are never zero, the low bytes of every segment
        // stay reserved
        Self(NonZeroU64::new(addr | u64::from(u8::from(kind))).unwrap())
    }

    pub(crate) fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub(crate) fn into_raw(self) -> u64 {
        self.0.get()
    }

    pub(crate) fn addr(self) -> u64 {
        self.0.get() & !(KEY_MASK as u64)
    }

    pub(crate) fn kind(self) -> NodeType {
        NodeType::try_from((self.0.get() & KEY_MASK as u64) as u8).unwrap()
    }
}

/// Geometry of one linear node. The key cells grow up from the base address
/// and the child words grow down from the end, so the same block holds more
/// entries when fewer bytes of the current key word remain to be matched.
#[derive(Clone, Copy)]
pub(crate) struct Linear {
    base: u64,
    size: usize,
    /// significant key bytes per cell at this level
    pub(crate) stride: usize,
    /// entry capacity
    pub(crate) count: usize,
}

impl Linear {
    pub(crate) fn at(node: NodeRef, off: usize) -> Self {
        Self::with_stride(node.addr(), node.kind().size(), KEY_BYTES - (off & KEY_MASK))
    }

    pub(crate) fn with_stride(base: u64, size: usize, stride: usize) -> Self {
        Linear {
            base,
            size,
            stride,
            count: size / (SLOT_BYTES + stride),
        }
    }

    pub(crate) fn key(&self, arena: &Arena, slot: usize) -> u64 {
        key_load(arena.bytes(self.base + (slot * self.stride) as u64, self.stride))
    }

    pub(crate) fn set_key(&self, arena: &mut Arena, slot: usize, value: u64) {
        key_store(
            arena.bytes_mut(self.base + (slot * self.stride) as u64, self.stride),
            value,
        );
    }

    pub(crate) fn child_addr(&self, slot: usize) -> u64 {
        self.base + (self.size - (slot + 1) * SLOT_BYTES) as u64
    }

    pub(crate) fn child(&self, arena: &Arena, slot: usize) -> u64 {
        arena.word(self.child_addr(slot))
    }
}

/// Load a key cell as the big-endian integer it represents, so that numeric
/// comparison equals lexicographic comparison of the key bytes. On a
/// little-endian host the cell bytes sit reversed in memory; on a big-endian
/// host they sit in natural order.
pub(crate) fn key_load(cell: &[u8]) -> u64 {
    let mut word = [0u8; KEY_BYTES];
    if cfg!(target_endian = "little") {
        word[..cell.len()].copy_from_slice(cell);
        u64::from_le_bytes(word)
    } else {
        word[KEY_BYTES - cell.len()..].copy_from_slice(cell);
        u64::from_be_bytes(word)
    }
}

/// Store counterpart of [`key_load`].
pub(crate) fn key_store(cell: &mut [u8], value: u64) {
    let len = cell.len();
    if cfg!(target_endian = "little") {
        cell.copy_from_slice(&value.to_le_bytes()[..len]);
    } else {
        cell.copy_from_slice(&value.to_be_bytes()[KEY_BYTES - len..]);
    }
}

/// Assemble the next key word from `key`, consuming bytes until the offset
/// reaches an 8-byte boundary; bytes past the end of the key read as zero.
/// A zero low byte in the result means the key terminates in this word.
pub(crate) fn key_chunk(key: &[u8], off: &mut usize) -> u64 {
    let mut value = 0u64;
    loop {
        value <<= 8;
        if *off < key.len() {
            value |= u64::from(key[*off]);
        }
        *off += 1;
        if *off & KEY_MASK == 0 {
            return value;
        }
    }
}

/// Most significant byte of a key field `stride` bytes wide.
pub(crate) fn leading_byte(value: u64, stride: usize) -> u8 {
    (value >> (8 * (stride - 1))) as u8
}

/// C-string style prefix equality used by span nodes: a matching zero byte
/// pair ends the comparison early.
pub(crate) fn span_eq(stored: &[u8], key: &[u8]) -> bool {
    for (a, b) in stored.iter().zip(key) {
        if a != b {
            return false;
        }
        if *a == 0 {
            return true;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn packed(bytes: &[u8]) -> u64 {
        bytes
            .iter()
            .fold(0u64, |value, byte| value << 8 | u64::from(*byte))
    }

    #[rstest]
    #[case(&[0x61])]
    #[case(&[0x61, 0x00])]
    #[case(&[0xff, 0x01, 0x7f])]
    #[case(&[0x00, 0x00, 0x00, 0x01])]
    #[case(&[1, 2, 3, 4, 5, 6, 7])]
    #[case(&[1, 2, 3, 4, 5, 6, 7, 8])]
    fn key_cells_round_trip(#[case] bytes: &[u8]) {
        let value = packed(bytes);
        let mut cell = vec![0u8; bytes.len()];
        key_store(&mut cell, value);
        assert_eq!(key_load(&cell), value);
    }

    #[test]
    fn numeric_order_matches_byte_order() {
        let keys: [&[u8]; 6] = [
            &[0, 0, 0],
            &[0, 0, 1],
            &[0, 1, 0],
            &[1, 0, 0],
            &[1, 0, 1],
            &[0xff, 0, 0],
        ];
        for pair in keys.windows(2) {
            assert!(packed(pair[0]) < packed(pair[1]));
            assert!(pair[0] < pair[1]);
        }
        // and the stored form reloads in the same order
        let mut cells = [[0u8; 3]; 6];
        for (cell, key) in cells.iter_mut().zip(keys) {
            key_store(cell, packed(key));
        }
        for pair in cells.windows(2) {
            assert!(key_load(&pair[0]) < key_load(&pair[1]));
        }
    }

    #[test]
    fn chunks_consume_to_the_word_boundary() {
        let key = b"abcdefghij";
        let mut off = 3;
        let chunk = key_chunk(key, &mut off);
        assert_eq!(off, 8);
        assert_eq!(chunk, packed(b"defgh"));
        // past the end of the key the word pads with zeros
        let chunk = key_chunk(key, &mut off);
        assert_eq!(off, 16);
        assert_eq!(chunk, packed(b"ij") << 48);
        assert_eq!(chunk & 0xff, 0);
    }

    #[rstest]
    #[case(1, 56)]
    #[case(2, 51)]
    #[case(3, 46)]
    #[case(4, 42)]
    #[case(5, 39)]
    #[case(6, 36)]
    #[case(7, 34)]
    #[case(8, 32)]
    fn max_node_capacity_per_stride(#[case] stride: usize, #[case] count: usize) {
        let lin = Linear::with_stride(0, NodeType::Lin32.size(), stride);
        assert_eq!(lin.count, count);
        // cells and child words never overlap
        assert!(lin.count * (stride + SLOT_BYTES) <= NodeType::Lin32.size());
    }

    #[test]
    fn references_round_trip_the_tag() {
        for kind in (0..8).map(|raw| NodeType::try_from(raw).unwrap()) {
            let node = NodeRef::new(0x1_fff8, kind);
            assert_eq!(node.kind(), kind);
            assert_eq!(node.addr(), 0x1_fff8);
            assert_eq!(NodeRef::from_raw(node.into_raw()), Some(node));
        }
        assert_eq!(NodeRef::from_raw(0), None);
    }

    #[test]
    fn span_prefix_stops_at_zero() {
        assert!(span_eq(b"abc", b"abc"));
        assert!(!span_eq(b"abc", b"abd"));
        // a matching zero terminates: the bytes past it do not count
        assert!(span_eq(b"ab\0xx", b"ab\0yy"));
        assert!(!span_eq(b"ab\0xx", b"abcyy"));
        assert!(span_eq(b"", b""));
    }
}
