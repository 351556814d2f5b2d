//! Bounded sample history
//!
//! Fixed-capacity ring with O(1) push. Once full, each push overwrites the
//! oldest entry instead of shifting the whole buffer.

/// Ring of the most recent `capacity` items, oldest first on read
#[derive(Debug, Clone)]
pub struct History<T> {
    data: Vec<T>,
    head: usize, // Next slot to overwrite once full
    capacity: usize,
}

impl<T: Clone> History<T> {
    /// Create an empty history. A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Append an item, returning the evicted oldest item when full
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.data.len() < self.capacity {
            self.data.push(item);
            return None;
        }
        let evicted = std::mem::replace(&mut self.data[self.head], item);
        self.head = (self.head + 1) % self.capacity;
        Some(evicted)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently pushed item
    pub fn newest(&self) -> Option<&T> {
        if self.data.is_empty() {
            return None;
        }
        let idx = (self.head + self.data.len() - 1) % self.data.len();
        self.data.get(idx)
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.data.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// Snapshot, oldest to newest
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
    }
}
