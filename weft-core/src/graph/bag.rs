//! Linked Bag
//!
//! An unordered multiset with stable removal handles. New elements are
//! prepended, so iteration visits the most recently inserted element first.
//!
//! # Implementation
//!
//! Nodes live in a `Vec` and are threaded into a doubly linked list by index.
//! Removed slots go on a free list and are reused. Every slot carries a
//! generation counter that is bumped on removal, so a handle to a removed
//! element never aliases a later element that happens to reuse its slot.

/// Handle to an element of a [`Bag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BagHandle {
    index: usize,
    generation: u32,
}

#[derive(Debug)]
struct Node<T> {
    element: Option<T>,
    generation: u32,
    prev: Option<usize>,
    /// For vacant nodes this links the free list.
    next: Option<usize>,
}

/// Multiset with O(1) insert and O(1) removal by handle.
#[derive(Debug)]
pub struct Bag<T> {
    nodes: Vec<Node<T>>,
    head: Option<usize>,
    free: Option<usize>,
    len: usize,
}

impl<T> Default for Bag<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Bag<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            head: None,
            free: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `element` at the front and return its handle.
    pub fn insert(&mut self, element: T) -> BagHandle {
        let index = match self.free {
            Some(index) => {
                let node = &mut self.nodes[index];
                self.free = node.next;
                node.element = Some(element);
                node.prev = None;
                node.next = self.head;
                index
            }
            None => {
                self.nodes.push(Node {
                    element: Some(element),
                    generation: 0,
                    prev: None,
                    next: self.head,
                });
                self.nodes.len() - 1
            }
        };

        if let Some(old_head) = self.head {
            self.nodes[old_head].prev = Some(index);
        }
        self.head = Some(index);
        self.len += 1;

        BagHandle {
            index,
            generation: self.nodes[index].generation,
        }
    }

    /// Whether `handle` still refers to an element of this bag.
    pub fn contains(&self, handle: BagHandle) -> bool {
        self.nodes
            .get(handle.index)
            .map_or(false, |node| node.generation == handle.generation && node.element.is_some())
    }

    pub fn get(&self, handle: BagHandle) -> Option<&T> {
        if self.contains(handle) {
            self.nodes[handle.index].element.as_ref()
        } else {
            None
        }
    }

    /// Remove the element behind `handle`, or return `None` if it is gone.
    pub fn try_remove(&mut self, handle: BagHandle) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }

        let (prev, next) = {
            let node = &self.nodes[handle.index];
            (node.prev, node.next)
        };

        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        if let Some(next) = next {
            self.nodes[next].prev = prev;
        }

        let node = &mut self.nodes[handle.index];
        let element = node.element.take();
        node.generation = node.generation.wrapping_add(1);
        node.prev = None;
        node.next = self.free;
        self.free = Some(handle.index);
        self.len -= 1;

        element
    }

    /// Remove the element behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the element was already removed.
    pub fn remove(&mut self, handle: BagHandle) -> T {
        match self.try_remove(handle) {
            Some(element) => element,
            None => panic!("bag element {handle:?} has already been removed"),
        }
    }

    /// Remove every element, front to back.
    pub fn drain(&mut self) -> Vec<T> {
        let handles: Vec<BagHandle> = self.iter().map(|(handle, _)| handle).collect();
        handles
            .into_iter()
            .filter_map(|handle| self.try_remove(handle))
            .collect()
    }

    /// Iterate front to back (newest first).
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            bag: self,
            cursor: self.head,
        }
    }
}

pub struct Iter<'a, T> {
    bag: &'a Bag<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (BagHandle, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let node = &self.bag.nodes[index];
        self.cursor = node.next;
        let handle = BagHandle {
            index,
            generation: node.generation,
        };
        node.element.as_ref().map(|element| (handle, element))
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(bag: &Bag<i32>) -> Vec<i32> {
        bag.iter().map(|(_, element)| *element).collect()
    }

    #[test]
    fn iterates_newest_first() {
        let mut bag = Bag::new();
        bag.insert(1);
        bag.insert(2);
        bag.insert(3);

        assert_eq!(contents(&bag), vec![3, 2, 1]);
        assert_eq!(bag.len(), 3);
    }

    #[test]
    fn removes_from_head_middle_and_tail() {
        let mut bag = Bag::new();
        let a = bag.insert(1);
        let b = bag.insert(2);
        let c = bag.insert(3);
        bag.insert(4);

        assert_eq!(bag.remove(b), 2);
        assert_eq!(contents(&bag), vec![4, 3, 1]);

        assert_eq!(bag.remove(a), 1);
        assert_eq!(contents(&bag), vec![4, 3]);

        assert_eq!(bag.remove(c), 3);
        assert_eq!(contents(&bag), vec![4]);
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn duplicates_are_distinct_elements() {
        let mut bag = Bag::new();
        let first = bag.insert(7);
        bag.insert(7);

        bag.remove(first);

        assert_eq!(contents(&bag), vec![7]);
    }

    #[test]
    fn stale_handle_does_not_alias_reused_slot() {
        let mut bag = Bag::new();
        let old = bag.insert(1);
        bag.remove(old);

        let new = bag.insert(2);

        assert_eq!(old.index, new.index);
        assert!(!bag.contains(old));
        assert!(bag.contains(new));
        assert_eq!(bag.try_remove(old), None);
        assert_eq!(bag.get(new), Some(&2));
    }

    #[test]
    #[should_panic(expected = "has already been removed")]
    fn removing_twice_panics() {
        let mut bag = Bag::new();
        let handle = bag.insert(1);
        bag.remove(handle);
        bag.remove(handle);
    }

    #[test]
    fn drain_empties_the_bag() {
        let mut bag = Bag::new();
        bag.insert(1);
        bag.insert(2);

        assert_eq!(bag.drain(), vec![2, 1]);
        assert!(bag.is_empty());
        assert_eq!(bag.iter().count(), 0);
    }
}
