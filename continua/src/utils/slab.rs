/// A simple slab allocator.
///
/// A `Slab` stores values of type `T` in a contiguous array and returns
/// stable keys that can be reused after removal. The synchronization
/// primitives use it to park waiters: the key stays valid while the waiter
/// sits in a queue, so a cancelled waiter can find and remove its own
/// entry in constant time.
pub(crate) struct Slab<T> {
    /// Storage for items. `None` marks a free slot.
    items: Vec<Option<T>>,
    /// Stack of free keys that can be reused.
    free: Vec<usize>,
}

impl<T> Slab<T> {
    /// Creates a new `Slab` with room for `size` items.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let slab = Slab::<i32>::new(16);
    /// ```
    pub(crate) fn new(size: usize) -> Self {
        let items = (0..size).map(|_| None).collect();
        let free = (0..size).rev().collect();

        Self { items, free }
    }

    /// Inserts a value into the slab and returns its key.
    ///
    /// If a free slot is available, it is reused. Otherwise, the slab
    /// grows exponentially.
    pub(crate) fn insert(&mut self, item: T) -> usize {
        let key = match self.free.pop() {
            Some(key) => key,
            None => {
                let len = self.items.len();
                let new_len = if len == 0 { 1 } else { 2 * len };

                self.items.resize_with(new_len, || None);
                self.free.extend(((len + 1)..new_len).rev());

                len
            }
        };

        self.items[key] = Some(item);

        key
    }

    /// Removes and returns the value stored at `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is out of bounds or the slot is not in use.
    pub(crate) fn remove(&mut self, key: usize) -> T {
        let item = self
            .items
            .get_mut(key)
            .and_then(Option::take)
            .unwrap_or_else(|| panic!("slab key {key} is not in use"));

        self.free.push(key);

        item
    }

    /// Returns a mutable reference to the value at `key`, if occupied.
    pub(crate) fn get_mut(&mut self, key: usize) -> Option<&mut T> {
        self.items.get_mut(key)?.as_mut()
    }

}

#[cfg(test)]
impl<T> Slab<T> {
    fn contains(&self, key: usize) -> bool {
        matches!(self.items.get(key), Some(Some(_)))
    }

    fn len(&self) -> usize {
        self.items.iter().filter(|item| item.is_some()).count()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
