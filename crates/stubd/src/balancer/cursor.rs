//! Per-route round-robin cursor state.

use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A lock-free cursor that packs the candidate count it was advanced for and
/// the next index into a single AtomicU64.
///
/// When the candidate count of the route changes, the cursor restarts at 0 so
/// it can never point past the end of the new candidate list.
#[derive(Default)]
pub struct RouteCursor(AtomicU64);

fn split(v: u64) -> (u32, u32) {
    ((v >> 32) as u32, v as u32)
}

fn join(count: u32, index: u32) -> u64 {
    (u64::from(count) << 32) | u64::from(index)
}

/// Index to use for `count` candidates given the packed state.
fn effective_index((stored_count, index): (u32, u32), count: u32) -> u32 {
    if stored_count != count || index >= count {
        0
    } else {
        index
    }
}

impl RouteCursor {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Return the index for this selection and advance the cursor, as one
    /// atomic step.
    #[must_use]
    pub fn next_index(&self, count: u32) -> u32 {
        if count == 0 {
            return 0;
        }
        let old_value = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                let current = effective_index(split(v), count);
                Some(join(count, (current + 1) % count))
            })
            .unwrap_or_else(|e| {
                debug_assert!(false, "we never return None from fetch_update");
                e
            });
        effective_index(split(old_value), count)
    }

    #[must_use]
    pub fn peek_index(&self, count: u32) -> u32 {
        effective_index(split(self.0.load(Ordering::Acquire)), count)
    }
}

impl fmt::Debug for RouteCursor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (count, index) = split(self.0.load(Ordering::Relaxed));
        f.debug_struct("RouteCursor")
            .field("count", &count)
            .field("index", &index)
            .finish()
    }
}

/// Round-robin cursors keyed by route path.
///
/// Lives outside the route table so that replacing the configuration does not
/// rewind routes whose candidate list kept its length.
#[derive(Default)]
pub struct CursorTable {
    cursors: RwLock<HashMap<String, RouteCursor>>,
}

impl CursorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next round-robin index for `route` over `count` candidates.
    pub fn next_index(&self, route: &str, count: usize) -> usize {
        if count == 0 {
            return 0;
        }
        let count = u32::try_from(count).unwrap_or(u32::MAX);

        let mut cursors = self.cursors.read();
        // Opportunistically use just a read lock. If the route has no cursor yet,
        // lock for writing, insert, then downgrade.
        let cursor = if let Some(cursor) = cursors.get(route) {
            cursor
        } else {
            drop(cursors);
            let mut write = self.cursors.write();
            write.entry(route.to_string()).or_default();
            cursors = RwLockWriteGuard::downgrade(write);
            match cursors.get(route) {
                Some(cursor) => cursor,
                None => return 0,
            }
        };
        cursor.next_index(count) as usize
    }

    /// Peek at the next index without advancing.
    pub fn peek_index(&self, route: &str, count: usize) -> usize {
        if count == 0 {
            return 0;
        }
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        self.cursors
            .read()
            .get(route)
            .map_or(0, |c| c.peek_index(count) as usize)
    }

    /// Drop cursors of routes that no longer exist.
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) {
        self.cursors.write().retain(|route, _| keep(route));
    }

    pub fn len(&self) -> usize {
        self.cursors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
