use crate::arena::Arena;
use crate::cursor::Cursor;
use crate::node::{Linear, NodeRef, NodeType};
use crate::search::prev_entry;

/// Remove the entry under the cursor, walking upward while nodes empty out,
/// and return the predecessor's cell. Linear nodes compact their remaining
/// entries toward the high end; they never shrink back to a smaller class.
pub(crate) fn delete(arena: &mut Arena, cur: &mut Cursor, root: u64) -> Option<u64> {
    cur.top()?;

    while let Some(frame) = cur.top().copied() {
        match frame.node.kind() {
            NodeType::Radix => {
                let table = frame.node.addr();
                let slot = frame.slot.max(0) as u64 & 0xff;
                let high = table + (slot >> 4) * 8;
                let Some(inner) = NodeRef::from_raw(arena.word(high)).map(NodeRef::addr) else {
                    cur.pop();
                    continue;
                };
                arena.set_word(inner + (slot & 0xf) * 8, 0);

                if (0..16).any(|idx| arena.word(inner + idx * 8) != 0) {
                    return finish(arena, cur, root);
                }
                arena.free(inner, NodeType::Radix);
                arena.set_word(high, 0);

                if (0..16).any(|idx| arena.word(table + idx * 8) != 0) {
                    return finish(arena, cur, root);
                }
                arena.free(table, NodeType::Radix);
                cur.pop();
            }
            NodeType::Span => {
                arena.free(frame.node.addr(), NodeType::Span);
                cur.pop();
            }
            _ => {
                let lin = Linear::at(frame.node, frame.off);
                let mut slot = frame.slot.max(0) as usize;

                // drop the entry by shifting everything below it up one
                // position, keeping the empty slots packed at the front
                while slot > 0 {
                    let key = lin.key(arena, slot - 1);
                    lin.set_key(arena, slot, key);
                    let child = lin.child(arena, slot - 1);
                    arena.set_word(lin.child_addr(slot), child);
                    slot -= 1;
                }
                lin.set_key(arena, 0, 0);
                arena.set_word(lin.child_addr(0), 0);

                if lin.child(arena, lin.count - 1) != 0 {
                    // the shift moved the predecessor into the deleted
                    // position, step past it so prev lands there
                    if let Some(top) = cur.top_mut() {
                        top.slot += 1;
                    }
                    return finish(arena, cur, root);
                }
                arena.free(frame.node.addr(), frame.node.kind());
                cur.pop();
            }
        }
    }

    // every node on the path emptied out
    arena.set_word(root, 0);
    None
}

fn finish(arena: &mut Arena, cur: &mut Cursor, root: u64) -> Option<u64> {
    let root = NodeRef::from_raw(arena.word(root));
    prev_entry(arena, cur, root)
}
