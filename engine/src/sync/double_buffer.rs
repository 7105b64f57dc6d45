//! Two-slot swap buffer for handing snapshots from a producer to readers.
//!
//! # Model
//!
//! The buffer holds two owned values and an index naming the front slot:
//! - **Front**: the last published snapshot, read through [`DoubleBuffer::front`]
//! - **Back**: the slot the producer fills through [`DoubleBuffer::mutate_back`]
//!
//! [`DoubleBuffer::swap`] flips the index, so the freshly written back becomes the
//! new front. The old front is *not* cleared; it becomes the back with its stale
//! contents, and the producer overwrites what it needs.
//!
//! ```rust,ignore
//! let buffer = DoubleBuffer::new(RaceSnapshot::default());
//!
//! // simulation thread
//! buffer.mutate_back(|snap| snap.lap = 2);
//! buffer.swap();
//!
//! // render thread
//! let lap = buffer.front().lap;
//! ```
//!
//! # Thread Safety
//!
//! `front`, `mutate_back` and `swap` are mutually atomic: a reader holding a front
//! guard sees a consistent snapshot and a swap waits for it to be released.
//! Serializing several producers against each other is the caller's job.

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};

struct Slots<T> {
    buffers: [T; 2],
    front_index: usize,
}

pub struct DoubleBuffer<T> {
    slots: RwLock<Slots<T>>,
}

/// Borrowed read view of the front slot.
pub type FrontGuard<'a, T> = MappedRwLockReadGuard<'a, T>;

impl<T> DoubleBuffer<T> {
    /// Build a buffer from explicit front and back values.
    pub fn from_parts(front: T, back: T) -> Self {
        Self {
            slots: RwLock::new(Slots {
                buffers: [front, back],
                front_index: 0,
            }),
        }
    }

    /// Read the current front snapshot.
    pub fn front(&self) -> FrontGuard<'_, T> {
        RwLockReadGuard::map(self.slots.read(), |slots| {
            &slots.buffers[slots.front_index]
        })
    }

    /// Run `f` with exclusive access to the back slot and return its result.
    pub fn mutate_back<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut slots = self.slots.write();
        let back = 1 - slots.front_index;
        f(&mut slots.buffers[back])
    }

    /// Exchange front and back.
    pub fn swap(&self) {
        let mut slots = self.slots.write();
        slots.front_index = 1 - slots.front_index;
    }

    /// Write the back slot and make it the front in one call.
    pub fn publish<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut slots = self.slots.write();
        let back = 1 - slots.front_index;
        let result = f(&mut slots.buffers[back]);
        slots.front_index = back;
        result
    }
}

impl<T: Clone> DoubleBuffer<T> {
    /// Both slots start as copies of `initial`.
    pub fn new(initial: T) -> Self {
        Self::from_parts(initial.clone(), initial)
    }
}

impl<T: Default> Default for DoubleBuffer<T> {
    fn default() -> Self {
        Self::from_parts(T::default(), T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Snapshot {
        frame: u64,
        // Always `frame * 2`; a torn read would break the relation.
        checksum: u64,
    }

    #[test]
    fn writes_are_invisible_until_swap() {
        let buffer = DoubleBuffer::new(Snapshot::default());
        buffer.mutate_back(|s| s.frame = 3);
        assert_eq!(buffer.front().frame, 0);

        buffer.swap();
        assert_eq!(buffer.front().frame, 3);
    }

    #[test]
    fn swap_exposes_old_front_as_back() {
        let buffer = DoubleBuffer::from_parts(1, 2);
        assert_eq!(*buffer.front(), 1);
        buffer.swap();
        assert_eq!(*buffer.front(), 2);
        assert_eq!(buffer.mutate_back(|v| *v), 1);
    }

    #[test]
    fn publish_returns_closure_result() {
        let buffer = DoubleBuffer::new(0u32);
        let previous = buffer.publish(|v| {
            let old = *v;
            *v = 9;
            old
        });
        assert_eq!(previous, 0);
        assert_eq!(*buffer.front(), 9);
    }

    #[test]
    fn readers_never_see_torn_snapshots() {
        let buffer = Arc::new(DoubleBuffer::new(Snapshot::default()));
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut last = 0;
                    while !done.load(Ordering::Acquire) {
                        let front = buffer.front();
                        assert_eq!(front.checksum, front.frame * 2);
                        assert!(front.frame >= last);
                        last = front.frame;
                    }
                })
            })
            .collect();

        for frame in 1..=2_000 {
            buffer.publish(|s| {
                s.frame = frame;
                s.checksum = frame * 2;
            });
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(buffer.front().frame, 2_000);
    }
}
