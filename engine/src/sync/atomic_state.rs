//! Lock-free holder for a small enumerated state value.
//!
//! [`AtomicState`] wraps an `AtomicU8` and converts to and from the enum through
//! the [`StateValue`] trait. Writers publish with release ordering and readers load
//! with acquire ordering, so any write made before a `set` is visible to a reader
//! that observes the new value.
//!
//! ```rust,ignore
//! let cell = AtomicState::new(EngineState::Loading);
//! if cell.cas(EngineState::Loading, EngineState::MainMenu) {
//!     // this thread won the transition
//! }
//! ```

use std::{
    fmt,
    marker::PhantomData,
    sync::atomic::{AtomicU8, Ordering},
};

/// An enumeration that can be stored in an [`AtomicState`].
///
/// `from_raw` must be the inverse of `to_raw` for every value `to_raw` produces.
pub trait StateValue: Copy + Eq {
    fn to_raw(self) -> u8;
    fn from_raw(raw: u8) -> Self;
}

/// Atomic cell holding one value of `S`.
pub struct AtomicState<S: StateValue> {
    raw: AtomicU8,
    _marker: PhantomData<S>,
}

impl<S: StateValue> AtomicState<S> {
    pub fn new(initial: S) -> Self {
        Self {
            raw: AtomicU8::new(initial.to_raw()),
            _marker: PhantomData,
        }
    }

    /// Publish a new value.
    pub fn set(&self, value: S) {
        self.raw.store(value.to_raw(), Ordering::Release);
    }

    /// Read the current value.
    pub fn get(&self) -> S {
        S::from_raw(self.raw.load(Ordering::Acquire))
    }

    /// Replace `expected` with `desired` if the cell currently holds `expected`.
    /// Returns whether the swap happened.
    pub fn cas(&self, expected: S, desired: S) -> bool {
        self.raw
            .compare_exchange(
                expected.to_raw(),
                desired.to_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Unconditionally store `value`, returning the previous one.
    pub fn replace(&self, value: S) -> S {
        S::from_raw(self.raw.swap(value.to_raw(), Ordering::AcqRel))
    }

    pub fn equals(&self, value: S) -> bool {
        self.get() == value
    }
}

impl<S: StateValue + Default> Default for AtomicState<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: StateValue + fmt::Debug> fmt::Debug for AtomicState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicState").field(&self.get()).finish()
    }
}
