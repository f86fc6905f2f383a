//! # Handle pool
//!
//! A fixed array of records plus an intrusive stack of free indices. Handing
//! out and taking back an index is O(1) and never touches the allocator.
//!
//! Indices double as hardware slot numbers where that makes sense (affine
//! matrix `n` lives in pool slot `n`), so the pool never moves a record.

use core::fmt::{Debug, Formatter};

/// The pool has no free slot left.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoolExhausted;

enum Slot<T> {
    Free { next: Option<u16> },
    Used(T),
}

pub struct HandlePool<T, const N: usize> {
    slots: [Slot<T>; N],
    free_head: Option<u16>,
    used: usize,
}

impl<T, const N: usize> HandlePool<T, N> {
    pub fn new() -> Self {
        assert!(N > 0 && N <= u16::MAX as usize, "invalid pool capacity: {}", N);

        Self {
            slots: core::array::from_fn(|index| Slot::Free {
                next: if index + 1 < N { Some(index as u16 + 1) } else { None },
            }),
            free_head: Some(0),
            used: 0,
        }
    }

    pub fn allocate(&mut self, value: T) -> Result<u16, PoolExhausted> {
        let index = self.free_head.ok_or(PoolExhausted)?;
        let slot = &mut self.slots[index as usize];

        match slot {
            Slot::Free { next } => {
                self.free_head = *next;
            }
            Slot::Used(_) => {
                panic!("pool free list points at used slot {}", index);
            }
        }

        *slot = Slot::Used(value);
        self.used += 1;
        Ok(index)
    }

    pub fn release(&mut self, index: u16) -> T {
        let slot = core::mem::replace(&mut self.slots[index as usize], Slot::Free { next: self.free_head });

        match slot {
            Slot::Used(value) => {
                self.free_head = Some(index);
                self.used -= 1;
                value
            }
            Slot::Free { next } => {
                // undo, the free list must stay intact before we die
                self.slots[index as usize] = Slot::Free { next };
                panic!("release of free slot {}", index);
            }
        }
    }

    #[inline]
    pub fn get(&self, index: u16) -> &T {
        match self.slots.get(index as usize) {
            Some(Slot::Used(value)) => value,
            _ => panic!("invalid handle: {}", index),
        }
    }

    #[inline]
    pub fn get_mut(&mut self, index: u16) -> &mut T {
        match self.slots.get_mut(index as usize) {
            Some(Slot::Used(value)) => value,
            _ => panic!("invalid handle: {}", index),
        }
    }

    pub fn contains(&self, index: u16) -> bool {
        matches!(self.slots.get(index as usize), Some(Slot::Used(_)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| match slot {
            Slot::Used(value) => Some((index as u16, value)),
            Slot::Free { .. } => None,
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u16, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| match slot {
            Slot::Used(value) => Some((index as u16, value)),
            Slot::Free { .. } => None,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn available(&self) -> usize {
        N - self.used
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_head.is_none()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn usage(&self) -> PoolUsage {
        PoolUsage {
            used: self.used as u16,
            capacity: N as u16,
        }
    }
}

impl<T, const N: usize> Default for HandlePool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug, const N: usize> Debug for HandlePool<T, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Usage snapshot of a fixed capacity pool.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoolUsage {
    pub used: u16,
    pub capacity: u16,
}

impl PoolUsage {
    pub fn used_count(&self) -> u16 {
        self.used
    }

    pub fn available_count(&self) -> u16 {
        self.capacity - self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_in_index_order() {
        let mut pool: HandlePool<u32, 4> = HandlePool::new();
        assert_eq!(pool.allocate(10), Ok(0));
        assert_eq!(pool.allocate(11), Ok(1));
        assert_eq!(*pool.get(1), 11);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn released_slot_is_reused_first() {
        let mut pool: HandlePool<u32, 4> = HandlePool::new();
        let a = pool.allocate(1).unwrap();
        let b = pool.allocate(2).unwrap();
        assert_eq!(pool.release(a), 1);
        assert_eq!(pool.allocate(3), Ok(a));
        assert!(pool.contains(b));
    }

    #[test]
    fn exhaustion_is_reported() {
        let mut pool: HandlePool<u8, 2> = HandlePool::new();
        pool.allocate(0).unwrap();
        pool.allocate(1).unwrap();
        assert!(pool.is_full());
        assert_eq!(pool.allocate(2), Err(PoolExhausted));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn iteration_skips_free_slots() {
        let mut pool: HandlePool<char, 4> = HandlePool::new();
        pool.allocate('a').unwrap();
        let b = pool.allocate('b').unwrap();
        pool.allocate('c').unwrap();
        pool.release(b);

        let values: heapless::Vec<(u16, char), 4> = pool.iter().map(|(id, value)| (id, *value)).collect();
        assert_eq!(&values[..], &[(0, 'a'), (2, 'c')]);
    }

    #[test]
    #[should_panic(expected = "invalid handle")]
    fn stale_handle_is_fatal() {
        let mut pool: HandlePool<u8, 2> = HandlePool::new();
        let id = pool.allocate(7).unwrap();
        pool.release(id);
        pool.get(id);
    }

    #[test]
    #[should_panic(expected = "release of free slot")]
    fn double_release_is_fatal() {
        let mut pool: HandlePool<u8, 2> = HandlePool::new();
        let id = pool.allocate(7).unwrap();
        pool.release(id);
        pool.release(id);
    }
}
