//! Process-wide singleton cells with construct-once semantics.

use crate::dependencies::types::{Instance, TeardownFn};
use crate::errors::{ContainerError, TeardownFailure};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

struct ConstructedSingleton {
    name: String,
    instance: Instance,
    teardown: Option<TeardownFn>,
}

/// Singleton cache shared by every caller of one container.
///
/// Each name owns an `OnceCell`; concurrent first requests serialize on it,
/// so exactly one constructor call wins and the others receive its result.
/// A failed construction leaves the cell empty and a later request retries.
#[derive(Default)]
pub(crate) struct SingletonCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<Instance>>>>,
    // Construction order, for shutdown.
    constructed: Mutex<Vec<ConstructedSingleton>>,
}

impl SingletonCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn cell(&self, name: &str) -> Arc<OnceCell<Instance>> {
        let mut cells = self.cells.lock();
        Arc::clone(
            cells
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        )
    }

    pub(crate) fn get(&self, name: &str) -> Option<Instance> {
        self.cells
            .lock()
            .get(name)
            .and_then(|cell| cell.get().cloned())
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Return the cached instance or run `construct` exactly once across threads.
    pub(crate) fn get_or_try_init<F>(
        &self,
        name: &str,
        teardown: Option<TeardownFn>,
        construct: F,
    ) -> Result<Instance, ContainerError>
    where
        F: FnOnce() -> Result<Instance, ContainerError>,
    {
        // The map lock is released before construction; only the cell blocks.
        let cell = self.cell(name);
        let mut created = false;
        let instance = cell
            .get_or_try_init(|| {
                let instance = construct()?;
                created = true;
                Ok::<_, ContainerError>(instance)
            })?
            .clone();

        if created {
            // Lock order matches `evict` and `shutdown`: cells, then constructed
            let cells = self.cells.lock();
            let still_cached = cells.get(name).is_some_and(|current| Arc::ptr_eq(current, &cell));
            if still_cached {
                log::debug!("Constructed singleton '{}'", name);
                self.constructed.lock().push(ConstructedSingleton {
                    name: name.to_string(),
                    instance: Arc::clone(&instance),
                    teardown,
                });
            } else {
                log::warn!("Singleton '{}' was evicted while being constructed; not cached", name);
            }
        }
        Ok(instance)
    }

    /// Drop cached instances of `names` without running their teardown hooks.
    pub(crate) fn evict<'a, I>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut cells = self.cells.lock();
        let mut constructed = self.constructed.lock();
        let mut evicted = 0;
        for name in names {
            if let Some(cell) = cells.remove(name) {
                if cell.get().is_some() {
                    log::warn!("Evicted cached singleton '{}' without teardown", name);
                    evicted += 1;
                }
            }
            constructed.retain(|entry| entry.name != name);
        }
        evicted
    }

    pub(crate) fn len(&self) -> usize {
        self.constructed.lock().len()
    }

    /// Empty the cache and run teardown hooks in reverse construction order.
    /// Every hook runs even if an earlier one fails.
    pub(crate) fn shutdown(&self) -> Vec<TeardownFailure> {
        let drained: Vec<ConstructedSingleton> = {
            let mut cells = self.cells.lock();
            let mut constructed = self.constructed.lock();
            cells.clear();
            constructed.drain(..).collect()
        };

        let mut failures = Vec::new();
        for singleton in drained.into_iter().rev() {
            let Some(teardown) = singleton.teardown else {
                continue;
            };
            log::debug!("Tearing down singleton '{}'", singleton.name);
            if let Err(source) = teardown(&singleton.instance) {
                log::error!("Teardown of singleton '{}' failed: {}", singleton.name, source);
                failures.push(TeardownFailure {
                    name: singleton.name,
                    source,
                });
            }
        }
        failures
    }
}
