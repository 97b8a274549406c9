use std::sync::{Mutex, MutexGuard};


/// Consolidates where a poisoned mutex turns into a panic.
pub trait LockOrPanic<T> {
    /// Lock the mutex, panicking if it is poisoned.
    fn lock_or_panic(&self) -> MutexGuard<'_, T>;
}

impl<T> LockOrPanic<T> for Mutex<T> {
    /// # Panics
    /// Panics if the mutex is poisoned.
    #[inline]
    fn lock_or_panic(&self) -> MutexGuard<'_, T> {
        match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => panic!("a mutex was poisoned: {poisoned}"),
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::LockOrPanic as _;

    #[test]
    fn locks_unpoisoned_mutex() {
        let results = Mutex::new(Vec::new());
        results.lock_or_panic().push(1_u8);
        results.lock_or_panic().push(2_u8);
        assert_eq!(*results.lock_or_panic(), [1, 2]);
    }
}
