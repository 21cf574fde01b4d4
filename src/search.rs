use crate::arena::Arena;
use crate::cursor::Cursor;
use crate::node::{key_chunk, span_eq, Linear, NodeRef, NodeType, KEY_MASK, SPAN_BYTES};

/// Walk from `root` toward `key`, recording the path in the cursor.
/// Returns the address of the payload word on an exact hit; on a miss the
/// cursor ends at the last node visited, ready for [`next_entry`].
pub(crate) fn locate(
    arena: &Arena,
    cur: &mut Cursor,
    root: Option<NodeRef>,
    key: &[u8],
) -> Option<u64> {
    cur.clear();
    let mut next = root;
    let mut off = 0usize;

    while let Some(node) = next {
        cur.push(node, off);
        match node.kind() {
            NodeType::Radix => {
                let table = node.addr();
                let slot = if off < key.len() { usize::from(key[off]) } else { 0 };
                cur.set_slot(slot as i32);
                let inner = NodeRef::from_raw(arena.word(table + (slot >> 4) as u64 * 8))?.addr();
                let cell = inner + (slot & 0xf) as u64 * 8;
                if slot == 0 {
                    return Some(cell);
                }
                next = NodeRef::from_raw(arena.word(cell));
                off += 1;
            }
            NodeType::Span => {
                let base = node.addr();
                let span = arena.bytes(base, SPAN_BYTES);
                let tst = SPAN_BYTES.min(key.len() - off);
                if !span_eq(&span[..tst], &key[off..off + tst]) {
                    return None;
                }
                if tst < SPAN_BYTES {
                    if span[tst] == 0 {
                        return Some(base + SPAN_BYTES as u64);
                    }
                    return None;
                }
                next = NodeRef::from_raw(arena.word(base + SPAN_BYTES as u64));
                off += SPAN_BYTES;
            }
            _ => {
                let lin = Linear::at(node, off);
                let value = key_chunk(key, &mut off);

                // highest slot holding a key not greater than the target;
                // empty slots sit at the low end and compare as zero
                let mut slot = lin.count as i32 - 1;
                let mut test = 0u64;
                while slot >= 0 {
                    test = lin.key(arena, slot as usize);
                    if test <= value {
                        break;
                    }
                    slot -= 1;
                }
                cur.set_slot(slot);

                if slot < 0 || test != value {
                    return None;
                }
                let cell = lin.child_addr(slot as usize);
                if value & 0xff == 0 {
                    return Some(cell);
                }
                next = NodeRef::from_raw(arena.word(cell));
            }
        }
    }
    None
}

/// Cell of the smallest key greater than or equal to `key`; the empty key
/// starts from the first entry. A located slot holding zero is an empty
/// terminator cell, not an entry.
pub(crate) fn ceil(
    arena: &Arena,
    cur: &mut Cursor,
    root: Option<NodeRef>,
    key: &[u8],
) -> Option<u64> {
    cur.clear();
    if key.is_empty() {
        return first(arena, cur, root, 0);
    }
    match locate(arena, cur, root, key) {
        Some(cell) if arena.word(cell) != 0 => Some(cell),
        _ => next_entry(arena, cur, root),
    }
}

/// Descend to the leftmost populated leaf under `from`, pushing frames.
pub(crate) fn first(
    arena: &Arena,
    cur: &mut Cursor,
    from: Option<NodeRef>,
    from_off: usize,
) -> Option<u64> {
    let mut next = from;
    let mut off = from_off;

    while let Some(node) = next {
        cur.push(node, off);
        match node.kind() {
            NodeType::Radix => {
                let table = node.addr();
                let mut slot = 0usize;
                let mut taken = None;
                while slot < 256 {
                    match NodeRef::from_raw(arena.word(table + (slot >> 4) as u64 * 8)) {
                        Some(inner) => {
                            let cell = inner.addr() + (slot & 0xf) as u64 * 8;
                            let raw = arena.word(cell);
                            if raw != 0 {
                                cur.set_slot(slot as i32);
                                if slot == 0 {
                                    return Some(cell);
                                }
                                taken = NodeRef::from_raw(raw);
                                break;
                            }
                            slot += 1;
                        }
                        None => slot = (slot | 0xf) + 1,
                    }
                }
                next = taken;
                off += 1;
            }
            NodeType::Span => {
                let base = node.addr();
                if arena.bytes(base, SPAN_BYTES)[SPAN_BYTES - 1] == 0 {
                    return Some(base + SPAN_BYTES as u64);
                }
                next = NodeRef::from_raw(arena.word(base + SPAN_BYTES as u64));
                off += SPAN_BYTES;
            }
            _ => {
                let lin = Linear::at(node, off);
                let mut slot = 0usize;
                while slot + 1 < lin.count && lin.child(arena, slot) == 0 {
                    slot += 1;
                }
                cur.set_slot(slot as i32);
                if lin.key(arena, slot) & 0xff == 0 {
                    return Some(lin.child_addr(slot));
                }
                next = NodeRef::from_raw(lin.child(arena, slot));
                off = (off | KEY_MASK) + 1;
            }
        }
    }
    None
}

/// Descend to the rightmost populated leaf under `from`, pushing frames.
pub(crate) fn last(
    arena: &Arena,
    cur: &mut Cursor,
    from: Option<NodeRef>,
    from_off: usize,
) -> Option<u64> {
    let mut next = from;
    let mut off = from_off;

    while let Some(node) = next {
        cur.push(node, off);
        match node.kind() {
            NodeType::Radix => {
                let table = node.addr();
                let mut slot = 256i32;
                let mut taken = None;
                loop {
                    slot -= 1;
                    if slot < 0 {
                        break;
                    }
                    cur.set_slot(slot);
                    match NodeRef::from_raw(arena.word(table + (slot as u64 >> 4) * 8)) {
                        Some(inner) => {
                            let cell = inner.addr() + (slot as u64 & 0xf) * 8;
                            let raw = arena.word(cell);
                            if raw != 0 {
                                if slot == 0 {
                                    return Some(cell);
                                }
                                taken = NodeRef::from_raw(raw);
                                break;
                            }
                        }
                        // skip the rest of this empty inner table
                        None => slot &= !0xf,
                    }
                }
                next = taken;
                off += 1;
            }
            NodeType::Span => {
                let base = node.addr();
                if arena.bytes(base, SPAN_BYTES)[SPAN_BYTES - 1] == 0 {
                    return Some(base + SPAN_BYTES as u64);
                }
                next = NodeRef::from_raw(arena.word(base + SPAN_BYTES as u64));
                off += SPAN_BYTES;
            }
            _ => {
                let lin = Linear::at(node, off);
                // the highest slot is always populated
                let slot = lin.count - 1;
                cur.set_slot(slot as i32);
                if lin.key(arena, slot) & 0xff == 0 {
                    return Some(lin.child_addr(slot));
                }
                next = NodeRef::from_raw(lin.child(arena, slot));
                off += lin.stride;
            }
        }
    }
    None
}

/// Successor of the cursor entry; an unpositioned cursor starts from the
/// first entry. Pops frames until one has an unexplored slot to the right,
/// then descends leftmost from there.
pub(crate) fn next_entry(arena: &Arena, cur: &mut Cursor, root: Option<NodeRef>) -> Option<u64> {
    if cur.is_empty() {
        return first(arena, cur, root, 0);
    }

    while let Some(frame) = cur.top().copied() {
        match frame.node.kind() {
            NodeType::Radix => {
                let table = frame.node.addr();
                let mut slot = frame.slot + 1;
                while slot < 256 {
                    match NodeRef::from_raw(arena.word(table + (slot as u64 >> 4) * 8)) {
                        Some(inner) => {
                            let raw = arena.word(inner.addr() + (slot as u64 & 0xf) * 8);
                            if let Some(child) = NodeRef::from_raw(raw) {
                                cur.set_slot(slot);
                                return first(arena, cur, Some(child), frame.off + 1);
                            }
                            slot += 1;
                        }
                        None => slot = (slot | 0xf) + 1,
                    }
                }
                cur.pop();
            }
            NodeType::Span => cur.pop(),
            _ => {
                let lin = Linear::at(frame.node, frame.off);
                let slot = frame.slot + 1;
                if (slot as usize) < lin.count {
                    cur.set_slot(slot);
                    let slot = slot as usize;
                    if lin.key(arena, slot) & 0xff == 0 {
                        return Some(lin.child_addr(slot));
                    }
                    return first(
                        arena,
                        cur,
                        NodeRef::from_raw(lin.child(arena, slot)),
                        (frame.off | KEY_MASK) + 1,
                    );
                }
                cur.pop();
            }
        }
    }
    None
}

/// Predecessor of the cursor entry; an unpositioned cursor starts from the
/// last entry.
pub(crate) fn prev_entry(arena: &Arena, cur: &mut Cursor, root: Option<NodeRef>) -> Option<u64> {
    if cur.is_empty() {
        return last(arena, cur, root, 0);
    }

    while let Some(frame) = cur.top().copied() {
        match frame.node.kind() {
            NodeType::Radix => {
                let table = frame.node.addr();
                let mut slot = frame.slot;
                while slot > 0 {
                    slot -= 1;
                    cur.set_slot(slot);
                    if let Some(inner) =
                        NodeRef::from_raw(arena.word(table + (slot as u64 >> 4) * 8))
                    {
                        let cell = inner.addr() + (slot as u64 & 0xf) * 8;
                        if let Some(child) = NodeRef::from_raw(arena.word(cell)) {
                            if slot == 0 {
                                return Some(cell);
                            }
                            return last(arena, cur, Some(child), frame.off + 1);
                        }
                    }
                }
                cur.pop();
            }
            NodeType::Span => cur.pop(),
            _ => {
                let lin = Linear::at(frame.node, frame.off);
                if frame.slot <= 0 || lin.child(arena, frame.slot as usize - 1) == 0 {
                    cur.pop();
                    continue;
                }
                let slot = frame.slot as usize - 1;
                cur.set_slot(slot as i32);
                if lin.key(arena, slot) & 0xff != 0 {
                    return last(
                        arena,
                        cur,
                        NodeRef::from_raw(lin.child(arena, slot)),
                        (frame.off | KEY_MASK) + 1,
                    );
                }
                return Some(lin.child_addr(slot));
            }
        }
    }
    None
}
