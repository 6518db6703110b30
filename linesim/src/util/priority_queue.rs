//! Priority queue with FIFO ordering of equal keys.

use std::mem;

/// A min-priority queue which pulls same-key values in insertion order.
///
/// This is a conventional array-based binary heap in which each item carries,
/// on top of the user-provided key, a unique epoch incremented at each
/// insertion. Items are sorted lexicographically by key, then by epoch, which
/// makes the order of extraction fully deterministic: the value with the
/// lowest key is always pulled first and, among several equal lowest keys, the
/// value which was inserted first is pulled first.
pub(crate) struct PriorityQueue<K, V>
where
    K: Copy + Ord,
{
    heap: Vec<Item<K, V>>,
    next_epoch: u64,
}

impl<K: Copy + Ord, V> PriorityQueue<K, V> {
    /// Creates an empty `PriorityQueue`.
    pub(crate) fn new() -> Self {
        Self {
            heap: Vec::new(),
            next_epoch: 0,
        }
    }

    /// Returns the number of key-value pairs in the priority queue.
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if the priority queue contains no key-value pair.
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Inserts a new key-value pair.
    ///
    /// This operation has *O*(log(*N*)) amortized worse-case theoretical
    /// complexity and *O*(1) amortized theoretical complexity for a
    /// sufficiently random heap.
    pub(crate) fn insert(&mut self, key: K, value: V) {
        // Build a unique key from the user-provided key and a unique epoch.
        let epoch = self.next_epoch;
        assert_ne!(epoch, u64::MAX);
        self.next_epoch += 1;

        self.heap.push(Item {
            key: UniqueKey { key, epoch },
            value,
        });
        self.sift_up(self.heap.len() - 1);
    }

    /// Pulls the value with the lowest key.
    ///
    /// If there are several equal lowest keys, the value which was inserted
    /// first is returned.
    ///
    /// This operation has *O*(log(N)) non-amortized theoretical complexity.
    pub(crate) fn pull(&mut self) -> Option<(K, V)> {
        let last_item = self.heap.pop()?;

        // If the heap had a single item, this was the top item.
        let top_item = if self.heap.is_empty() {
            last_item
        } else {
            // Move the last item to the top and sift it down.
            let top_item = mem::replace(&mut self.heap[0], last_item);
            self.sift_down(0);

            top_item
        };

        Some((top_item.key.key, top_item.value))
    }

    /// Peeks a reference to the lowest key, leaving it in the queue.
    ///
    /// If there are several equal lowest keys, a reference to the key which was
    /// inserted first is returned.
    ///
    /// This operation has *O*(1) non-amortized theoretical complexity.
    pub(crate) fn peek_key(&self) -> Option<&K> {
        self.heap.first().map(|item| &item.key.key)
    }

    /// Moves the item at `heap_idx` up the heap while its parent has a larger
    /// key.
    #[inline]
    fn sift_up(&mut self, heap_idx: usize) {
        let mut child_heap_idx = heap_idx;

        while child_heap_idx != 0 {
            let parent_heap_idx = (child_heap_idx - 1) / 2;

            // Stop when the key is larger or equal to the parent's.
            if self.heap[child_heap_idx].key >= self.heap[parent_heap_idx].key {
                break;
            }

            // Move the parent down one level and make it the new child.
            self.heap.swap(child_heap_idx, parent_heap_idx);
            child_heap_idx = parent_heap_idx;
        }
    }

    /// Moves the item at `heap_idx` down the heap while a child has a smaller
    /// key.
    #[inline]
    fn sift_down(&mut self, heap_idx: usize) {
        let mut parent_heap_idx = heap_idx;
        let mut child_heap_idx = 2 * parent_heap_idx + 1;

        while child_heap_idx < self.heap.len() {
            // If the sibling exists and has a smaller key, make it the
            // candidate for swapping.
            if let Some(other_child) = self.heap.get(child_heap_idx + 1) {
                child_heap_idx += (self.heap[child_heap_idx].key > other_child.key) as usize;
            }

            // Stop when the key is smaller or equal to the child with the
            // smallest key.
            if self.heap[parent_heap_idx].key <= self.heap[child_heap_idx].key {
                break;
            }

            // Move the child up one level and make it the new parent.
            self.heap.swap(parent_heap_idx, child_heap_idx);
            parent_heap_idx = child_heap_idx;
            child_heap_idx = 2 * parent_heap_idx + 1;
        }
    }
}

/// A key-value pair stored in the heap.
struct Item<K: Copy, V> {
    // A unique key by which the heap is sorted.
    key: UniqueKey<K>,
    // The value associated to the key.
    value: V,
}

/// A unique key made of the user-provided key complemented by a unique epoch.
///
/// Implementation note: `UniqueKey` automatically derives `PartialOrd`, which
/// implies that lexicographic order between `key` and `epoch` must be preserved
/// to make sure that `key` has a higher sorting priority than `epoch`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct UniqueKey<K: Copy> {
    /// The user-provided key.
    key: K,
    /// A unique epoch that indicates the insertion date.
    epoch: u64,
}
