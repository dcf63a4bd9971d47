/// A simple slab allocator.
///
/// A `Slab` stores values of type `T` in a contiguous array and returns
/// small indices that are reused after removal. The event loop keys its local
/// tasks by these indices, so a waker only needs to carry a `usize`.
///
/// Unlike a plain `Vec<Option<T>>` scan, insertion is O(1): freed indices are
/// kept on a stack and handed out again before the storage grows.
pub(crate) struct Slab<T> {
    /// Storage for items; `None` marks a free slot.
    items: Vec<Option<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates an empty slab with room for `size` items.
    pub(crate) fn new(size: usize) -> Self {
        let items = (0..size).map(|_| None).collect();
        let free = (0..size).rev().collect();

        Self {
            items,
            free,
            len: 0,
        }
    }

    /// Inserts the value built by `f`, which receives the index it will
    /// occupy.
    ///
    /// If a free slot is available, it is reused. Otherwise, the slab grows
    /// exponentially.
    pub(crate) fn insert_with(&mut self, f: impl FnOnce(usize) -> T) -> usize {
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                let len = self.items.len();
                let new_len = if len == 0 { 1 } else { 2 * len };

                self.items.extend((len..new_len).map(|_| None));
                self.free.extend(((len + 1)..new_len).rev());

                len
            }
        };

        self.items[index] = Some(f(index));
        self.len += 1;

        index
    }

    /// Removes and returns the value stored at `index`.
    ///
    /// Returns `None` if the slot is out of range or already free; the index
    /// becomes available to future insertions otherwise.
    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        let item = self.items.get_mut(index)?.take()?;

        self.free.push(index);
        self.len -= 1;

        Some(item)
    }

    /// Returns a mutable reference to the value at `index`, if occupied.
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)?.as_mut()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new(0)
    }
}
