//! Exclusive per-account locks scoped to a unit of work
//!
//! DuckDB detects conflicting writes optimistically but has no
//! `SELECT ... FOR UPDATE`, so row reservation lives here. A request for
//! several keys is granted all at once or not at all: a waiting unit of
//! work never holds part of its set, which rules out lock-order deadlocks
//! between opposite transfers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::domain::result::{Error, Result};
use crate::domain::AccountId;

/// Identifies the unit of work holding a lock
pub type LockOwner = u64;

#[derive(Debug, Default)]
pub struct RowLockTable {
    held: Mutex<HashMap<AccountId, LockOwner>>,
    released: Condvar,
    next_owner: AtomicU64,
}

impl RowLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an owner token for a new unit of work
    pub fn new_owner(&self) -> LockOwner {
        self.next_owner.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Reserve every key in `ids` for `owner` in one step
    ///
    /// Keys already held by `owner` are granted again without waiting.
    /// Blocks while any requested key belongs to another owner; gives up
    /// with `StorageConflict` once `timeout` elapses. Returns the keys that
    /// were newly granted, in ascending order.
    pub fn acquire(
        &self,
        owner: LockOwner,
        ids: &[AccountId],
        timeout: Duration,
    ) -> Result<Vec<AccountId>> {
        let mut wanted = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        let deadline = Instant::now() + timeout;
        let mut held = self.lock_held()?;

        loop {
            let blocked = wanted
                .iter()
                .any(|id| matches!(held.get(id), Some(other) if *other != owner));
            if !blocked {
                break;
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::conflict(format!(
                    "timed out after {}ms waiting for lock on accounts {:?}",
                    timeout.as_millis(),
                    wanted
                )));
            }

            let (guard, _) = self
                .released
                .wait_timeout(held, deadline - now)
                .map_err(|_| Error::database("row lock table poisoned"))?;
            held = guard;
        }

        let granted = wanted
            .into_iter()
            .filter(|id| held.insert(*id, owner).is_none())
            .collect();
        Ok(granted)
    }

    /// Release keys held by `owner` and wake every waiter
    ///
    /// Keys held by someone else are left alone.
    pub fn release(&self, owner: LockOwner, ids: &[AccountId]) {
        if ids.is_empty() {
            return;
        }
        // Called from Drop, so a poisoned table is recovered rather than reported
        let mut held = match self.held.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for id in ids {
            if held.get(id) == Some(&owner) {
                held.remove(id);
            }
        }
        drop(held);
        self.released.notify_all();
    }

    /// Number of keys currently reserved
    pub fn held_count(&self) -> usize {
        self.lock_held().map(|held| held.len()).unwrap_or(0)
    }

    fn lock_held(&self) -> Result<MutexGuard<'_, HashMap<AccountId, LockOwner>>> {
        self.held
            .lock()
            .map_err(|_| Error::database("row lock table poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const SHORT: Duration = Duration::from_millis(50);

    #[test]
    fn test_acquire_grants_sorted_unique_keys() {
        let table = RowLockTable::new();
        let owner = table.new_owner();

        let granted = table.acquire(owner, &[5, 2, 5, 9], SHORT).unwrap();
        assert_eq!(granted, vec![2, 5, 9]);
        assert_eq!(table.held_count(), 3);

        table.release(owner, &granted);
        assert_eq!(table.held_count(), 0);
    }

    #[test]
    fn test_same_owner_reacquires_without_waiting() {
        let table = RowLockTable::new();
        let owner = table.new_owner();

        table.acquire(owner, &[1], SHORT).unwrap();
        let granted = table.acquire(owner, &[1, 2], SHORT).unwrap();
        assert_eq!(granted, vec![2]);
    }

    #[test]
    fn test_contended_key_times_out_as_conflict() {
        let table = RowLockTable::new();
        let first = table.new_owner();
        let second = table.new_owner();

        table.acquire(first, &[1, 2], SHORT).unwrap();
        let err = table.acquire(second, &[2, 3], SHORT).unwrap_err();
        assert!(err.is_retryable());

        // nothing of the failed request was kept
        assert_eq!(table.held_count(), 2);
        assert!(table.acquire(second, &[3], SHORT).is_ok());
    }

    #[test]
    fn test_release_ignores_keys_of_other_owners() {
        let table = RowLockTable::new();
        let first = table.new_owner();
        let second = table.new_owner();

        table.acquire(first, &[1], SHORT).unwrap();
        table.release(second, &[1]);
        assert_eq!(table.held_count(), 1);
    }

    #[test]
    fn test_release_wakes_waiter() {
        let table = Arc::new(RowLockTable::new());
        let holder = table.new_owner();
        table.acquire(holder, &[1, 2], SHORT).unwrap();

        let waiter_table = Arc::clone(&table);
        let waiter = thread::spawn(move || {
            let owner = waiter_table.new_owner();
            waiter_table.acquire(owner, &[2, 1], Duration::from_secs(5))
        });

        thread::sleep(Duration::from_millis(50));
        table.release(holder, &[1, 2]);

        let granted = waiter.join().unwrap().unwrap();
        assert_eq!(granted, vec![1, 2]);
    }
}
