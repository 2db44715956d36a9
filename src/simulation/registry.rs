//! Shared set of live filenames
//!
//! A name in the registry is a file that exists on disk and that no actor is
//! working on. Claiming a name removes it, which is what gives the claiming
//! actor exclusive use of that file until it releases or retires it.
//!
//! Each operation takes the lock exactly once; callers never hold it across
//! filesystem I/O.

use rand::Rng;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

#[derive(Debug, Default)]
pub struct Registry {
    names: Mutex<Vec<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves the vector consistent, so a panic in
    // another holder does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes and returns a uniformly chosen name, or `None` when empty
    pub fn claim_random(&self) -> Option<String> {
        let mut names = self.lock();
        if names.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..names.len());
        Some(names.swap_remove(index))
    }

    /// Returns a previously claimed name to the pool
    ///
    /// Returns `false` (and leaves the registry unchanged) if the name is
    /// already present.
    pub fn release(&self, name: String) -> bool {
        self.add(name, "release")
    }

    /// Adds a newly created name
    ///
    /// Returns `false` (and leaves the registry unchanged) if the name is
    /// already present.
    pub fn insert(&self, name: String) -> bool {
        self.add(name, "insert")
    }

    fn add(&self, name: String, op: &'static str) -> bool {
        let mut names = self.lock();
        if names.contains(&name) {
            warn!(file = %name, op, "Name already registered, ignoring");
            return false;
        }
        names.push(name);
        true
    }

    /// Removes and returns every name
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().iter().any(|n| n == name)
    }

    /// Copy of the current contents, in no particular order
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }
}
