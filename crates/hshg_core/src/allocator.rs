//! # Id Allocator
//!
//! Free-list table mapping small integer ids to host-owned values.
//!
//! Vacant slots store the id of the next vacant slot, so the free list costs
//! no memory beyond the table itself. A released id is the first one handed
//! out again. Id `0` is reserved and never allocated.

/// One table slot.
#[derive(Debug, Clone)]
enum Slot<T> {
    /// Free; links to the next free slot (`0` = end of list).
    Vacant { next_free: u32 },
    /// Holds a live value.
    Occupied(T),
}

/// Free-list id table.
///
/// # Example
///
/// ```rust,ignore
/// let mut table = IdAllocator::with_capacity(16);
/// let id = table.alloc("ball");      // O(1)
/// assert_eq!(table.free(id), Some("ball"));
/// assert_eq!(table.alloc("cube"), id); // freed id comes back first
/// ```
#[derive(Debug, Clone)]
pub struct IdAllocator<T> {
    slots: Vec<Slot<T>>,
    free_head: u32,
    len: usize,
}

impl<T> IdAllocator<T> {
    /// Creates an empty table with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity + 1);
        slots.push(Slot::Vacant { next_free: 0 });
        Self {
            slots,
            free_head: 0,
            len: 0,
        }
    }

    /// Number of live values.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no value is live.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Highest id ever handed out (the table's high-water mark).
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len() - 1
    }

    /// Stores `value` and returns its id.
    ///
    /// This is a **O(1)** operation. Callers bound the table size, so ids
    /// always fit in `u32`.
    pub fn alloc(&mut self, value: T) -> u32 {
        self.len += 1;
        if self.free_head != 0 {
            let id = self.free_head;
            let slot = &mut self.slots[id as usize];
            if let Slot::Vacant { next_free } = *slot {
                self.free_head = next_free;
            }
            *slot = Slot::Occupied(value);
            return id;
        }
        #[allow(clippy::cast_possible_truncation)]
        let id = self.slots.len() as u32;
        self.slots.push(Slot::Occupied(value));
        id
    }

    /// Releases `id`, returning its value.
    ///
    /// Returns `None` for id `0`, unknown ids and ids already free.
    pub fn free(&mut self, id: u32) -> Option<T> {
        if id == 0 {
            return None;
        }
        let slot = self.slots.get_mut(id as usize)?;
        if matches!(slot, Slot::Vacant { .. }) {
            return None;
        }
        let previous = std::mem::replace(
            slot,
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        self.free_head = id;
        self.len -= 1;
        match previous {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    /// Value behind `id`.
    #[inline]
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&T> {
        match self.slots.get(id as usize)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    /// Value behind `id`, mutably.
    #[inline]
    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        match self.slots.get_mut(id as usize)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    /// Two distinct live values, mutably.
    ///
    /// Returns `None` if `a == b` or either id is not live.
    pub fn pair_mut(&mut self, a: u32, b: u32) -> Option<(&mut T, &mut T)> {
        if a == b {
            return None;
        }
        let (low, high) = (a.min(b) as usize, a.max(b) as usize);
        if high >= self.slots.len() {
            return None;
        }
        let (head, tail) = self.slots.split_at_mut(high);
        let (Slot::Occupied(first), Slot::Occupied(second)) = (&mut head[low], &mut tail[0]) else {
            return None;
        };
        if a < b {
            Some((first, second))
        } else {
            Some((second, first))
        }
    }

    /// Live `(id, value)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots.iter().enumerate().filter_map(|(id, slot)| match slot {
            #[allow(clippy::cast_possible_truncation)]
            Slot::Occupied(value) => Some((id as u32, value)),
            Slot::Vacant { .. } => None,
        })
    }
}
