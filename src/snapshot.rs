// src/snapshot.rs

//! Single-producer/single-consumer snapshot cells shared between interrupt
//! handlers and the control tick.
//!
//! Both sides touch the cell only inside a short critical section, so a
//! reader never sees a half-written value and neither side ever blocks.

use core::cell::Cell;
use critical_section::Mutex;

/// A `Copy` value shared between an interrupt producer and the tick.
pub struct SnapshotCell<T: Copy> {
    inner: Mutex<Cell<T>>,
}

impl<T: Copy> SnapshotCell<T> {
    /// Creates a cell holding `value`. Usable in `static` initializers.
    pub const fn new(value: T) -> Self {
        SnapshotCell {
            inner: Mutex::new(Cell::new(value)),
        }
    }

    /// Replaces the stored value.
    pub fn publish(&self, value: T) {
        critical_section::with(|cs| self.inner.borrow(cs).set(value));
    }

    /// Returns a consistent copy of the stored value.
    pub fn snapshot(&self) -> T {
        critical_section::with(|cs| self.inner.borrow(cs).get())
    }

    /// Applies `f` to the stored value inside one critical section and
    /// returns what `f` returns.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| {
            let cell = self.inner.borrow(cs);
            let mut value = cell.get();
            let result = f(&mut value);
            cell.set(value);
            result
        })
    }
}

/// A value tagged with the microsecond timestamp of its capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamped<T> {
    /// The captured value.
    pub value: T,
    /// Capture time on the wrapping microsecond clock.
    pub at_us: u32,
}

/// Microseconds elapsed from `earlier` to `now` on a wrapping `u32` clock.
pub fn elapsed_us(now: u32, earlier: u32) -> u32 {
    now.wrapping_sub(earlier)
}

/// Age of a capture stamped `at` as seen at `now`.
///
/// A stamp up to half the clock range ahead of `now` was taken after `now`
/// was read and counts as age zero.
pub fn age_us(now: u32, at: u32) -> u32 {
    let elapsed = elapsed_us(now, at);
    if elapsed > u32::MAX / 2 {
        0
    } else {
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SHARED: SnapshotCell<Option<Stamped<u16>>> = SnapshotCell::new(None);

    #[test]
    fn test_snapshot_publish_and_read() {
        let cell = SnapshotCell::new(1_u32);
        assert_eq!(1, cell.snapshot());
        cell.publish(7);
        assert_eq!(7, cell.snapshot());
    }

    #[test]
    fn test_snapshot_update_in_place() {
        let cell = SnapshotCell::new([0_u16; 3]);
        let previous = cell.update(|v| {
            let old = v[1];
            v[1] = 1500;
            old
        });
        assert_eq!(0, previous);
        assert_eq!([0, 1500, 0], cell.snapshot());
    }

    #[test]
    fn test_snapshot_static_cell() {
        SHARED.publish(Some(Stamped {
            value: 1475,
            at_us: 20_000,
        }));
        let read = SHARED.snapshot();
        assert_eq!(Some(1475), read.map(|s| s.value));
        assert_eq!(Some(20_000), read.map(|s| s.at_us));
    }

    #[test]
    fn test_elapsed_wraps() {
        assert_eq!(100, elapsed_us(50, u32::MAX - 49));
        assert_eq!(4000, elapsed_us(8000, 4000));
    }

    #[test]
    fn test_age_of_stamp_after_now_is_zero() {
        assert_eq!(0, age_us(100_000, 100_010));
        assert_eq!(0, age_us(u32::MAX - 5, 3));
        assert_eq!(20, age_us(100_020, 100_000));
        assert_eq!(100, age_us(50, u32::MAX - 49));
    }
}
