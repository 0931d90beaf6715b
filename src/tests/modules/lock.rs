use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Serializes tests that change the process-wide [`Registry`](crate::Registry) against the tests
/// that read it.
pub struct TestLock {
    lock: RwLock<()>,
}

impl TestLock {
    pub fn new() -> Self {
        Self {
            lock: RwLock::new(()),
        }
    }

    pub fn run_concurrently(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read()
    }

    pub fn run_exclusively(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write()
    }
}
