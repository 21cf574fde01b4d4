use crate::arena::Arena;
use crate::cursor::Cursor;
use crate::node::{Linear, NodeType, SPAN_BYTES};

/// Rebuild the key at the cursor into `buf`: each frame contributes the
/// bytes its slot choice implies. The result is zero-terminated and stops
/// at the first zero byte, so a key with an embedded zero reads back
/// truncated. Returns the length written, bounded by `buf.len() - 1`.
pub(crate) fn reconstruct(arena: &Arena, cur: &Cursor, buf: &mut [u8]) -> usize {
    let Some(cap) = buf.len().checked_sub(1) else {
        return 0;
    };
    let mut len = 0usize;

    for frame in cur.frames() {
        if len >= cap {
            break;
        }
        match frame.node.kind() {
            NodeType::Radix => {
                if frame.slot != 0 {
                    buf[len] = frame.slot as u8;
                    len += 1;
                }
            }
            NodeType::Span => {
                for &byte in arena.bytes(frame.node.addr(), SPAN_BYTES) {
                    if byte == 0 || len >= cap {
                        break;
                    }
                    buf[len] = byte;
                    len += 1;
                }
            }
            _ => {
                if frame.slot < 0 {
                    continue;
                }
                let lin = Linear::at(frame.node, frame.off);
                let value = lin.key(arena, frame.slot as usize);
                for shift in (0..lin.stride).rev() {
                    let byte = (value >> (8 * shift)) as u8;
                    if byte == 0 || len >= cap {
                        break;
                    }
                    buf[len] = byte;
                    len += 1;
                }
            }
        }
    }

    buf[len] = 0;
    len
}
