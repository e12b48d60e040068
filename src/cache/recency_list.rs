/// Stable handle to an occupied slot of a [`RecencyList`].
///
/// A handle stays valid until its element is removed or popped; moving the element to the back
/// keeps the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Bounded sequence ordered from least to most recently touched.
///
/// Elements live in an arena of slots and are threaded into a doubly linked list, so removing
/// from the middle and moving to the back are O(1) and never shift other handles.
#[derive(Debug)]
pub(crate) struct RecencyList<T> {
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    capacity: usize,
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
}

impl<T> RecencyList<T> {
    pub(crate) fn with_capacity(capacity: usize) -> RecencyList<T> {
        RecencyList {
            head: None,
            tail: None,
            len: 0,
            capacity,
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Adds an item to the back of the list, making it the most recently touched.
    ///
    /// Returns [None] when the list is full.
    pub(crate) fn push_back(&mut self, value: T) -> Option<SlotId> {
        if self.is_full() {
            return None;
        }

        let node = Node {
            value,
            prev: None,
            next: None,
        };

        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        self.attach_back(idx);
        self.len += 1;
        Some(SlotId(idx))
    }

    /// Pops the least recently touched element.
    ///
    /// If the list is empty, [None] is returned.
    pub(crate) fn pop_front(&mut self) -> Option<T> {
        let idx = self.head?;
        self.take(idx)
    }

    /// Removes the element behind `id`, wherever it sits in the order.
    pub(crate) fn remove(&mut self, id: SlotId) -> Option<T> {
        match self.slots.get(id.0) {
            Some(Some(_)) => self.take(id.0),
            _ => None,
        }
    }

    /// Moves the element behind `id` to the back. Returns `false` for a vacant handle.
    pub(crate) fn move_to_back(&mut self, id: SlotId) -> bool {
        if !matches!(self.slots.get(id.0), Some(Some(_))) {
            return false;
        }

        if self.tail != Some(id.0) {
            self.detach(id.0);
            self.attach_back(id.0);
        }

        true
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn take(&mut self, idx: usize) -> Option<T> {
        self.detach(idx);
        let node = self.slots[idx].take()?;
        self.free.push(idx);
        self.len -= 1;
        Some(node.value)
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<T> {
        self.slots[idx]
            .as_mut()
            .expect("a linked slot must be occupied")
    }

    fn attach_back(&mut self, idx: usize) {
        let tail = self.tail;

        let node = self.node_mut(idx);
        node.prev = tail;
        node.next = None;

        match tail {
            Some(tail) => self.node_mut(tail).next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = match self.slots[idx].as_ref() {
            Some(node) => (node.prev, node.next),
            None => return,
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
}

// Inspection helpers; the shard only drives the list through handles.
#[cfg(test)]
impl<T> RecencyList<T> {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn get(&self, id: SlotId) -> Option<&T> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .map(|node| &node.value)
    }

    /// Returns the least recently touched element.
    pub(crate) fn front(&self) -> Option<&T> {
        self.head.and_then(|idx| self.get(SlotId(idx)))
    }

    /// Iterates from least to most recently touched.
    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            next: self.head,
        }
    }
}

#[cfg(test)]
pub(crate) struct Iter<'a, T> {
    list: &'a RecencyList<T>,
    next: Option<usize>,
}

#[cfg(test)]
impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let node = self.list.slots[idx].as_ref()?;
        self.next = node.next;
        Some(&node.value)
    }
}
