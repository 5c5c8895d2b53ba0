//! Scoped suspension of foreign-key enforcement.
//!
//! Bulk structural rewrites (imports, identifier namespacing, merges) break
//! references transiently. A phase acquires an [`IntegrityGuard`], does its
//! work and either calls [`IntegrityGuard::restore`] to surface a restore
//! failure or lets the guard drop, which restores on every exit path.
//!
//! The guard restores the setting it found, so nested guards compose.

use crate::error::Result;
use crate::store::Store;

#[must_use = "integrity checking is restored as soon as the guard is dropped"]
pub struct IntegrityGuard<'a> {
    store: &'a Store,
    previous: bool,
    armed: bool,
}

impl<'a> IntegrityGuard<'a> {
    pub(crate) fn new(store: &'a Store) -> Result<Self> {
        let previous = store.foreign_keys_enabled()?;
        store.set_foreign_keys(false)?;
        Ok(Self {
            store,
            previous,
            armed: true,
        })
    }

    /// Setting that will be put back.
    pub fn previous(&self) -> bool {
        self.previous
    }

    /// Restore the previous setting now, reporting failure.
    pub fn restore(mut self) -> Result<()> {
        self.armed = false;
        self.store.set_foreign_keys(self.previous)
    }
}

impl Drop for IntegrityGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.store.set_foreign_keys(self.previous) {
                tracing::warn!(error = %e, "failed to restore foreign key enforcement");
            }
        }
    }
}
