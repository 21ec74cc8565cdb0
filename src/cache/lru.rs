//! LRU Tracker Module
//!
//! Access-ordered doubly linked list for LRU eviction, stored in a slab so
//! that touch, removal and finding the oldest key are all O(1).

// == LRU Tracker ==
/// Tracks access order for LRU eviction.
///
/// Each tracked key lives in a slot; callers keep the slot index returned by
/// [`LruTracker::push_front`] and hand it back to touch or remove the key.
/// - Head = Most recently used
/// - Tail = Least recently used
#[derive(Debug, Default)]
pub struct LruTracker {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

#[derive(Debug)]
struct Node {
    key: String,
    prev: Option<usize>,
    next: Option<usize>,
}

impl LruTracker {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Push Front ==
    /// Tracks a new key as the most recently used and returns its slot.
    pub fn push_front(&mut self, key: String) -> usize {
        let node = Node {
            key,
            prev: None,
            next: self.head,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        if let Some(old_head) = self.head {
            self.node_mut(old_head).prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
        self.len += 1;
        slot
    }

    // == Touch ==
    /// Marks the key in `slot` as most recently used.
    pub fn touch(&mut self, slot: usize) {
        if self.head == Some(slot) || !self.is_live(slot) {
            return;
        }
        self.unlink(slot);
        let node = self.node_mut(slot);
        node.prev = None;
        node.next = None;
        self.link_front(slot);
    }

    // == Remove ==
    /// Stops tracking the key in `slot`, returning it.
    pub fn remove(&mut self, slot: usize) -> Option<String> {
        if !self.is_live(slot) {
            return None;
        }
        self.unlink(slot);
        let node = self.slots[slot].take()?;
        self.free.push(slot);
        self.len -= 1;
        Some(node.key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        let tail = self.tail?;
        self.slots[tail].as_ref().map(|node| node.key.as_str())
    }

    /// Keys from most to least recently used.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.slots[cursor?].as_ref()?;
            cursor = node.next;
            Some(node.key.as_str())
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forgets every key.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn is_live(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(Some(_)))
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node {
        match self.slots[slot].as_mut() {
            Some(node) => node,
            None => unreachable!("lru slot {slot} is vacant"),
        }
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let node = self.node_mut(slot);
            (node.prev, node.next)
        };
        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => self.tail = prev,
        }
    }

    fn link_front(&mut self, slot: usize) {
        let old_head = self.head;
        self.node_mut(slot).next = old_head;
        if let Some(old_head) = old_head {
            self.node_mut(old_head).prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }
}
