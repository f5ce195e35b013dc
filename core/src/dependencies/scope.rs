//! Resource scopes: a bounded unit of work owning its RESOURCE instances.

use crate::dependencies::resolver::Container;
use crate::dependencies::types::{downcast_instance, Instance, TeardownFn};
use crate::errors::{ContainerError, TeardownFailure};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static SCOPE_COUNTER: AtomicU64 = AtomicU64::new(0);

struct ScopedResource {
    name: String,
    instance: Instance,
    teardown: Option<TeardownFn>,
}

/// Resource instances in construction order.
#[derive(Default)]
pub(crate) struct ResourceStack {
    resources: Vec<ScopedResource>,
    index: HashMap<String, usize>,
}

impl ResourceStack {
    pub(crate) fn get(&self, name: &str) -> Option<Instance> {
        self.index
            .get(name)
            .map(|&slot| Arc::clone(&self.resources[slot].instance))
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub(crate) fn push(&mut self, name: &str, instance: Instance, teardown: Option<TeardownFn>) {
        self.index.insert(name.to_string(), self.resources.len());
        self.resources.push(ScopedResource {
            name: name.to_string(),
            instance,
            teardown,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.resources.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Tear everything down in reverse construction order, leaving the stack
    /// empty. A failing hook does not stop the ones after it.
    pub(crate) fn unwind(&mut self) -> Vec<TeardownFailure> {
        self.index.clear();
        let mut failures = Vec::new();
        while let Some(resource) = self.resources.pop() {
            let Some(teardown) = resource.teardown else {
                continue;
            };
            log::trace!("Tearing down resource '{}'", resource.name);
            if let Err(source) = teardown(&resource.instance) {
                log::error!("Teardown of resource '{}' failed: {}", resource.name, source);
                failures.push(TeardownFailure {
                    name: resource.name,
                    source,
                });
            }
        }
        failures
    }
}

/// **RESOURCE SCOPE**
///
/// Opened with [`Container::enter_scope`]. RESOURCE-lifetime instances
/// resolved through the scope are cached in it and torn down exactly once,
/// in reverse construction order, by [`Scope::close`] or on drop.
///
/// A scope belongs to one unit of work; it is not meant to be shared
/// between threads.
pub struct Scope<'c> {
    container: &'c Container,
    id: u64,
    resources: ResourceStack,
    closed: bool,
}

impl<'c> Scope<'c> {
    pub(crate) fn new(container: &'c Container) -> Self {
        let id = SCOPE_COUNTER.fetch_add(1, Ordering::SeqCst);
        log::debug!("Opened scope {} on container {}", id, container.id());
        Self {
            container,
            id,
            resources: ResourceStack::default(),
            closed: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// **RESOLVE** `name` with this scope as the resource cache.
    pub fn get(&mut self, name: &str) -> Result<Instance, ContainerError> {
        self.container.resolve_in(name, Some(&mut self.resources))
    }

    /// Typed [`Scope::get`].
    pub fn get_as<T: Any + Send + Sync>(&mut self, name: &str) -> Result<Arc<T>, ContainerError> {
        let instance = self.get(name)?;
        downcast_instance(name, instance)
    }

    /// Number of resource instances owned by the scope.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains(name)
    }

    /// **CLOSE** the scope, tearing down every resource it owns.
    ///
    /// **ERRORS**: `AggregateTeardown` carrying every failed hook.
    pub fn close(mut self) -> Result<(), ContainerError> {
        let failures = self.teardown();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::AggregateTeardown { failures })
        }
    }

    fn teardown(&mut self) -> Vec<TeardownFailure> {
        if self.closed {
            return Vec::new();
        }
        self.closed = true;
        log::debug!(
            "Closing scope {} with {} resource(s)",
            self.id,
            self.resources.len()
        );
        self.resources.unwind()
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let failures = self.teardown();
        if !failures.is_empty() {
            log::warn!(
                "Scope {} dropped without close; {} teardown failure(s) discarded",
                self.id,
                failures.len()
            );
        }
    }
}
