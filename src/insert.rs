use log::trace;

use crate::arena::Arena;
use crate::cursor::Cursor;
use crate::node::{
    key_chunk, key_store, leading_byte, span_eq, Linear, NodeRef, NodeType, KEY_BYTES, KEY_MASK,
    LOW_MASK, NODE_SIZE, SLOT_BYTES, SPAN_BYTES,
};
use crate::Error;

enum SpanMatch {
    Leaf,
    Through,
    Diverged,
}

/// Insert-or-locate: walk toward `key` like a lookup, reshaping nodes where
/// the walk cannot continue, and return the address of the payload cell.
/// The caller must store a non-zero value into a fresh cell.
///
/// `root` is the arena address of the word holding the root reference, so
/// rewriting the incoming reference works the same at every level.
pub(crate) fn insert(
    arena: &mut Arena,
    cur: &mut Cursor,
    root: u64,
    key: &[u8],
) -> Result<u64, Error> {
    cur.clear();
    // address of the word holding the reference under inspection
    let mut parent = root;
    let mut off = 0usize;

    loop {
        let Some(node) = NodeRef::from_raw(arena.word(parent)) else {
            break;
        };
        cur.push(node, off);
        match node.kind() {
            NodeType::Radix => {
                let table = node.addr();
                let slot = if off < key.len() {
                    let byte = usize::from(key[off]);
                    off += 1;
                    byte
                } else {
                    0
                };
                let high = table + (slot >> 4) as u64 * 8;
                let inner = match NodeRef::from_raw(arena.word(high)) {
                    Some(inner) => inner.addr(),
                    None => {
                        let addr = arena.alloc(NodeType::Radix)?;
                        arena.set_word(high, NodeRef::new(addr, NodeType::Radix).into_raw());
                        addr
                    }
                };
                cur.set_slot(slot as i32);
                parent = inner + (slot & 0xf) as u64 * 8;
                if slot == 0 {
                    return Ok(parent);
                }
            }
            NodeType::Span => {
                let base = node.addr();
                let tst = SPAN_BYTES.min(key.len() - off);
                let matched = {
                    let span = arena.bytes(base, SPAN_BYTES);
                    if !span_eq(&span[..tst], &key[off..off + tst]) {
                        SpanMatch::Diverged
                    } else if tst == SPAN_BYTES {
                        SpanMatch::Through
                    } else if span[tst] == 0 {
                        SpanMatch::Leaf
                    } else {
                        SpanMatch::Diverged
                    }
                };
                match matched {
                    SpanMatch::Leaf => return Ok(base + SPAN_BYTES as u64),
                    SpanMatch::Through => {
                        parent = base + SPAN_BYTES as u64;
                        off += SPAN_BYTES;
                    }
                    SpanMatch::Diverged => {
                        // bust the span into single-entry nodes, then
                        // reprocess this level
                        split_span(arena, parent, node)?;
                        cur.pop();
                    }
                }
            }
            _ => {
                let lin = Linear::at(node, off);
                let start = off;
                let value = key_chunk(key, &mut off);

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

                if slot >= 0 && test == value {
                    parent = lin.child_addr(slot as usize);
                    if value & 0xff == 0 {
                        return Ok(parent);
                    }
                    continue;
                }

                // a zeroed child in slot 0 means the node still has room:
                // shift the smaller keys down one cell and open the slot
                if lin.child(arena, 0) == 0 {
                    let slot = slot.max(0) as usize;
                    for s in 1..=slot {
                        let shifted = lin.key(arena, s);
                        lin.set_key(arena, s - 1, shifted);
                    }
                    lin.set_key(arena, slot, value);
                    for s in 0..slot {
                        let shifted = lin.child(arena, s + 1);
                        arena.set_word(lin.child_addr(s), shifted);
                    }
                    arena.set_word(lin.child_addr(slot), 0);
                    parent = lin.child_addr(slot);
                    if value & 0xff == 0 {
                        return Ok(parent);
                    }
                    continue;
                }

                if node.kind() != NodeType::Lin32 {
                    parent = promote(arena, cur, parent, node, start, slot + 1, value)?;
                    if value & 0xff == 0 {
                        return Ok(parent);
                    }
                    continue;
                }

                // maximal node: decompose into a radix fan-out and retry
                // this level from the same key offset
                split_node(arena, parent, node, start)?;
                cur.pop();
                off = start;
            }
        }
    }

    // the walk fell off the tree: build out the rest of the key, first a
    // single-entry node for the unaligned part of the current key word
    if off & KEY_MASK != 0 && off <= key.len() {
        let base = arena.alloc(NodeType::Lin1)?;
        let node = NodeRef::new(base, NodeType::Lin1);
        arena.set_word(parent, node.into_raw());
        let stride = KEY_BYTES - (off & KEY_MASK);
        let mut value = 0u64;
        for i in 0..stride {
            value <<= 8;
            if off + i < key.len() {
                value |= u64::from(key[off + i]);
            }
        }
        key_store(arena.bytes_mut(base, stride), value);
        cur.push(node, off);
        parent = base + (NODE_SIZE[NodeType::Lin1 as usize] - SLOT_BYTES) as u64;
        off = (off | KEY_MASK) + 1;
    }

    // then spans until the key and its terminator are consumed
    while off <= key.len() {
        let base = arena.alloc(NodeType::Span)?;
        let node = NodeRef::new(base, NodeType::Span);
        arena.set_word(parent, node.into_raw());
        let tst = SPAN_BYTES.min(key.len() - off);
        arena
            .bytes_mut(base, SPAN_BYTES)[..tst]
            .copy_from_slice(&key[off..off + tst]);
        cur.push(node, off);
        parent = base + SPAN_BYTES as u64;
        off += tst;
        if arena.bytes(base, SPAN_BYTES)[SPAN_BYTES - 1] == 0 {
            break;
        }
    }
    Ok(parent)
}

/// Grow a full linear node into the next class, opening the new key's slot
/// at position `idx`. Existing entries move to the high end of the larger
/// node so the fresh empty slots collect at the front. Returns the address
/// of the new entry's child word.
fn promote(
    arena: &mut Arena,
    cur: &mut Cursor,
    parent: u64,
    node: NodeRef,
    off: usize,
    idx: i32,
    value: u64,
) -> Result<u64, Error> {
    let idx = idx.max(0) as usize;
    let old = Linear::at(node, off);
    let kind = node.kind().grown();
    trace!("promoting {:?} to {:?}", node.kind(), kind);

    let base = arena.alloc(kind)?;
    let grown = NodeRef::new(base, kind);
    arena.set_word(parent, grown.into_raw());
    let new = Linear::at(grown, off);
    let gap = new.count - old.count;

    for s in 0..idx {
        let key = old.key(arena, s);
        new.set_key(arena, s + gap - 1, key);
        let child = old.child(arena, s);
        arena.set_word(new.child_addr(s + gap - 1), child);
    }
    new.set_key(arena, idx + gap - 1, value);
    let result = new.child_addr(idx + gap - 1);
    for s in idx..old.count {
        let key = old.key(arena, s);
        new.set_key(arena, s + gap, key);
        let child = old.child(arena, s);
        arena.set_word(new.child_addr(s + gap), child);
    }

    if let Some(top) = cur.top_mut() {
        top.node = grown;
        top.slot = (idx + gap - 1) as i32;
    }
    arena.free(node.addr(), node.kind());
    Ok(result)
}

/// Decompose a maximal linear node into a radix fan-out: entries group by
/// the first significant byte of their stored key, each group moving into a
/// smaller node with that byte stripped.
fn split_node(arena: &mut Arena, parent: u64, node: NodeRef, off: usize) -> Result<(), Error> {
    let old = Linear::at(node, off);
    trace!("splitting a maximal node at offset {off}");

    let radix = arena.alloc(NodeType::Radix)?;
    arena.set_word(parent, NodeRef::new(radix, NodeType::Radix).into_raw());

    let mut start = 0usize;
    let mut group = 0x100u32; // sentinel above any byte
    for slot in 0..old.count {
        let lead = u32::from(leading_byte(old.key(arena, slot), old.stride));
        if group > 0xff {
            group = lead;
        }
        if lead == group {
            continue;
        }
        radix_branch(arena, radix, &old, start, slot, group as u8)?;
        start = slot;
        group = lead;
    }
    radix_branch(arena, radix, &old, start, old.count, group as u8)?;

    arena.free(node.addr(), NodeType::Lin32);
    Ok(())
}

/// Build the radix entry for one group of a node being decomposed. A zero
/// lead byte (or exhausted key word) makes the group's child the leaf cell
/// stored directly in the inner table.
fn radix_branch(
    arena: &mut Arena,
    outer: u64,
    old: &Linear,
    start: usize,
    end: usize,
    lead: u8,
) -> Result<(), Error> {
    let high = outer + u64::from(lead >> 4) * 8;
    let inner = match NodeRef::from_raw(arena.word(high)) {
        Some(inner) => inner.addr(),
        None => {
            let addr = arena.alloc(NodeType::Radix)?;
            arena.set_word(high, NodeRef::new(addr, NodeType::Radix).into_raw());
            addr
        }
    };
    let entry = inner + u64::from(lead & 0xf) * 8;

    let stride = old.stride - 1;
    if lead == 0 || stride == 0 {
        let child = old.child(arena, start);
        arena.set_word(entry, child);
        return Ok(());
    }

    // smallest class able to hold the group one byte shorter
    let count = end - start;
    let mut kind = NodeType::Lin1;
    while count > NODE_SIZE[kind as usize] / (SLOT_BYTES + stride) && kind != NodeType::Lin32 {
        kind = kind.grown();
    }

    let base = arena.alloc(kind)?;
    let new = Linear::with_stride(base, kind.size(), stride);
    arena.set_word(entry, NodeRef::new(base, kind).into_raw());

    for idx in 0..count {
        let from = start + count - 1 - idx;
        let to = new.count - 1 - idx;
        let key = old.key(arena, from) & LOW_MASK[stride];
        new.set_key(arena, to, key);
        let child = old.child(arena, from);
        arena.set_word(new.child_addr(to), child);
    }
    Ok(())
}

/// Replace a span with a chain of single-entry nodes, one per key word of
/// the span buffer, rethreading the span's child onto the last of them.
fn split_span(arena: &mut Arena, parent: u64, node: NodeRef) -> Result<(), Error> {
    let base = node.addr();
    let tail = arena.word(base + SPAN_BYTES as u64);
    trace!("splitting a span node");

    let mut parent = parent;
    let mut off = 0usize;
    loop {
        let chunk: [u8; KEY_BYTES] = arena
            .bytes(base + off as u64, KEY_BYTES)
            .try_into()
            .unwrap();
        let new = arena.alloc(NodeType::Lin1)?;
        arena.set_word(parent, NodeRef::new(new, NodeType::Lin1).into_raw());
        key_store(
            arena.bytes_mut(new, KEY_BYTES),
            u64::from_be_bytes(chunk),
        );
        parent = new + (NODE_SIZE[NodeType::Lin1 as usize] - SLOT_BYTES) as u64;
        off += KEY_BYTES;
        if off >= SPAN_BYTES || arena.bytes(base, SPAN_BYTES)[off - 1] == 0 {
            break;
        }
    }

    arena.set_word(parent, tail);
    arena.free(base, NodeType::Span);
    Ok(())
}
