use crate::node::NodeRef;

/// One step of the path from the root to the current position.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    pub(crate) node: NodeRef,
    /// key offset consumed on entry to the node
    pub(crate) off: usize,
    /// slot chosen inside the node; -1 after a lookup that fell below every
    /// stored key
    pub(crate) slot: i32,
}

/// The cursor shared by every operation: lookup, insertion and deletion all
/// leave the path to the entry they touched here, so that the successor or
/// predecessor is reachable without descending from the root again. Any
/// mutating call invalidates an in-flight traversal.
#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    frames: Vec<Frame>,
    limit: usize,
}

impl Cursor {
    pub(crate) fn new(max_key: usize) -> Self {
        // deepest legal path: one radix frame per key byte plus the frame
        // consuming the terminator
        Cursor {
            frames: Vec::new(),
            limit: max_key + 1,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.frames.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Push a frame for a node entered at key offset `off`. Once the depth
    /// limit is reached the deepest frame is overwritten instead, which only
    /// happens for keys longer than the declared maximum.
    pub(crate) fn push(&mut self, node: NodeRef, off: usize) {
        let frame = Frame { node, off, slot: 0 };
        if self.frames.len() < self.limit {
            self.frames.push(frame);
        } else if let Some(top) = self.frames.last_mut() {
            *top = frame;
        }
    }

    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }

    pub(crate) fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub(crate) fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub(crate) fn set_slot(&mut self, slot: i32) {
        if let Some(top) = self.frames.last_mut() {
            top.slot = slot;
        }
    }

    pub(crate) fn frames(&self) -> &[Frame] {
        &self.frames
    }
}
