use crate::config::ContainerConfig;
use crate::dependencies::cache::SingletonCache;
use crate::dependencies::registry::{Registry, RegistryEntry};
use crate::dependencies::scope::{ResourceStack, Scope};
use crate::dependencies::types::{downcast_instance, Args, Instance, Lifetime, Provider};
use crate::errors::ContainerError;
use crate::graph::{GraphBuilder, ResolutionGraph};
use crate::validation::NameValidator;
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

// Object counter for log correlation
static CONTAINER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// What the forward walk does with one node of the order.
enum Step {
    /// Not reachable through any node that needs work.
    Skip,
    /// Construct now (or, for singletons, join a concurrent construction).
    Build,
    /// Cached instance observed by the reverse pass. Its dependencies were
    /// skipped, so it must not be looked up again.
    Reuse(Instance),
}

/// Registry entries snapshotted for one walk, aligned with `graph.order()`.
struct ResolutionPlan {
    graph: Arc<ResolutionGraph>,
    entries: Vec<Arc<RegistryEntry>>,
}

/// **CONTAINER**
///
/// **PURPOSE**: Resolve named dependencies in dependency-first order,
/// honoring each provider's [`Lifetime`].
/// **GUARANTEE**: `Send + Sync`; singletons are constructed at most once
/// even under concurrent first requests.
///
/// The first resolution seals the registry. Later `register`/`replace`/
/// `unregister` calls fail with `RegistrySealed` unless
/// [`ContainerConfig::allow_late_registration`] is set.
pub struct Container {
    id: u64,
    config: ContainerConfig,
    registry: RwLock<Registry>,
    graphs: Mutex<HashMap<String, Arc<ResolutionGraph>>>,
    singletons: SingletonCache,
    sealed: AtomicBool,
}

impl Container {
    /// **CONSTRUCTOR** - default configuration
    pub fn new() -> Self {
        Self::from_registry(
            Registry::with_validator(NameValidator::standard()),
            ContainerConfig::default(),
        )
    }

    /// **CONSTRUCTOR WITH CONFIG**
    ///
    /// **ERRORS**: `InvalidConfig` when the name pattern does not compile.
    pub fn with_config(config: ContainerConfig) -> Result<Self, ContainerError> {
        let validator = NameValidator::from_config(&config)?;
        Ok(Self::from_registry(Registry::with_validator(validator), config))
    }

    /// Wrap an already populated registry. The registry keeps its own validator.
    pub fn from_registry(registry: Registry, config: ContainerConfig) -> Self {
        let id = CONTAINER_COUNTER.fetch_add(1, Ordering::SeqCst);
        log::debug!("Creating container {} with {} entries", id, registry.len());
        Self {
            id,
            config,
            registry: RwLock::new(registry),
            graphs: Mutex::new(HashMap::new()),
            singletons: SingletonCache::new(),
            sealed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// True once any resolution has started.
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    // ============================================================================================
    // REGISTRATION
    // ============================================================================================

    /// **REGISTER** a provider under `name`.
    ///
    /// **PARAMETERS**:
    /// - `name` - Unique dependency identifier
    /// - `dependency_names` - Names passed to the constructor, in this order
    /// - `provider` - Factory plus lifetime
    pub fn register<I, S>(
        &self,
        name: &str,
        dependency_names: I,
        provider: Provider,
    ) -> Result<(), ContainerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = self.write_registry(name)?;
        registry.register(name, dependency_names, provider)?;
        self.graphs.lock().clear();
        Ok(())
    }

    /// **REPLACE** an entry (or register it if absent). Cached singletons of
    /// `name` and of everything depending on it are evicted.
    pub fn replace<I, S>(
        &self,
        name: &str,
        dependency_names: I,
        provider: Provider,
    ) -> Result<(), ContainerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = self.write_registry(name)?;
        registry.replace(name, dependency_names, provider)?;

        let mut stale = registry.transitive_dependents(name);
        stale.push(name.to_string());
        self.invalidate(&stale);
        Ok(())
    }

    /// **UNREGISTER** - fails with `InUse` while other entries reference `name`.
    pub fn unregister(&self, name: &str) -> Result<(), ContainerError> {
        let mut registry = self.write_registry(name)?;
        registry.unregister(name)?;
        self.invalidate(&[name.to_string()]);
        Ok(())
    }

    /// **CASCADING UNREGISTER** - removes `name` and its transitive dependents.
    pub fn unregister_cascade(&self, name: &str) -> Result<Vec<String>, ContainerError> {
        let mut registry = self.write_registry(name)?;
        let removed = registry.unregister_cascade(name)?;
        self.invalidate(&removed);
        Ok(removed)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.read().contains(name)
    }

    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.read().is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.registry.read().names()
    }

    fn write_registry(&self, name: &str) -> Result<RwLockWriteGuard<'_, Registry>, ContainerError> {
        let registry = self.registry.write();
        if self.is_sealed() && !self.config.allow_late_registration {
            return Err(ContainerError::RegistrySealed {
                name: name.to_string(),
            });
        }
        Ok(registry)
    }

    fn invalidate(&self, names: &[String]) {
        self.graphs.lock().clear();
        let evicted = self.singletons.evict(names.iter().map(String::as_str));
        if evicted > 0 {
            log::debug!("Container {}: evicted {} singleton(s)", self.id, evicted);
        }
    }

    // ============================================================================================
    // GRAPH
    // ============================================================================================

    /// **GRAPH** rooted at `name`, validated. Cached until the registry changes.
    pub fn graph(&self, name: &str) -> Result<Arc<ResolutionGraph>, ContainerError> {
        let registry = self.registry.read();
        self.graph_from(&registry, name)
    }

    /// **VALIDATE** every registered entry: no missing names, cycles or
    /// captive dependencies anywhere in the registry.
    pub fn validate(&self) -> Result<(), ContainerError> {
        let registry = self.registry.read();
        GraphBuilder::new(&registry).validate_all().map(|_| ())
    }

    fn graph_from(
        &self,
        registry: &Registry,
        root: &str,
    ) -> Result<Arc<ResolutionGraph>, ContainerError> {
        if self.config.cache_graphs {
            if let Some(graph) = self.graphs.lock().get(root) {
                return Ok(Arc::clone(graph));
            }
        }

        let graph = Arc::new(GraphBuilder::new(registry).build(root)?);
        if self.config.cache_graphs {
            self.graphs
                .lock()
                .insert(root.to_string(), Arc::clone(&graph));
        }
        Ok(graph)
    }

    // ============================================================================================
    // RESOLUTION
    // ============================================================================================

    /// **RESOLVE** `name` outside any scope.
    ///
    /// **ERRORS**: structural errors from the graph builder, `ScopeRequired`
    /// if a RESOURCE node would have to be constructed, and
    /// `ProviderConstruction` when a constructor fails.
    pub fn get(&self, name: &str) -> Result<Instance, ContainerError> {
        self.resolve_in(name, None)
    }

    /// Typed [`Container::get`].
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ContainerError> {
        let instance = self.get(name)?;
        downcast_instance(name, instance)
    }

    /// **ENTER SCOPE** - open a RESOURCE cache boundary.
    pub fn enter_scope(&self) -> Scope<'_> {
        Scope::new(self)
    }

    /// **RUN** - resolve `name` in a fresh scope, execute its bound task, then
    /// tear the scope down whatever the outcome.
    ///
    /// **RETURNS**: the task result, or the instance itself when no task is bound.
    pub fn run(&self, name: &str) -> Result<Instance, ContainerError> {
        let mut scope = self.enter_scope();
        let outcome = scope
            .get(name)
            .and_then(|instance| self.run_task(name, instance));
        let closed = scope.close();

        match (outcome, closed) {
            (Ok(result), Ok(())) => Ok(result),
            (Ok(_), Err(teardown)) => Err(teardown),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(teardown)) => {
                log::error!("Run of '{}' failed ({}); {}", name, err, teardown);
                Err(err)
            }
        }
    }

    /// Typed [`Container::run`].
    pub fn run_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ContainerError> {
        let result = self.run(name)?;
        downcast_instance(name, result)
    }

    /// Number of singletons constructed and still cached.
    pub fn singleton_count(&self) -> usize {
        self.singletons.len()
    }

    /// **SHUTDOWN** - tear down cached singletons in reverse construction
    /// order and empty the cache. Later requests construct them again.
    ///
    /// **ERRORS**: `AggregateTeardown` carrying every failed hook.
    pub fn shutdown(&self) -> Result<(), ContainerError> {
        log::debug!(
            "Container {}: shutting down {} singleton(s)",
            self.id,
            self.singletons.len()
        );
        let failures = self.singletons.shutdown();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::AggregateTeardown { failures })
        }
    }

    fn run_task(&self, name: &str, instance: Instance) -> Result<Instance, ContainerError> {
        let task = self
            .registry
            .read()
            .get(name)
            .and_then(|entry| entry.provider().task().cloned());

        match task {
            Some(task) => {
                log::debug!("Running task bound to '{}'", name);
                task(&instance).map_err(|source| ContainerError::TaskFailed {
                    name: name.to_string(),
                    source,
                })
            }
            None => Ok(instance),
        }
    }

    pub(crate) fn resolve_in(
        &self,
        root: &str,
        mut scope: Option<&mut ResourceStack>,
    ) -> Result<Instance, ContainerError> {
        self.sealed.store(true, Ordering::SeqCst);

        // **STEP 1**: Validated graph + entry snapshot; no constructor has run yet
        let plan = self.plan(root)?;
        let steps = self.plan_steps(&plan, root, scope.as_deref())?;

        // **STEP 2**: Dependency-first walk over the nodes that need work
        let mut resolved: HashMap<&str, Instance> = HashMap::with_capacity(plan.entries.len());
        for (entry, step) in plan.entries.iter().zip(steps) {
            let name = entry.name();
            match step {
                Step::Skip => continue,
                Step::Reuse(instance) => {
                    log::trace!("Reusing cached '{}' for '{}'", name, root);
                    resolved.insert(name, instance);
                    continue;
                }
                Step::Build => {}
            }
            log::trace!("Resolving '{}' ({}) for '{}'", name, entry.lifetime(), root);

            let instance = match entry.lifetime() {
                Lifetime::Transient => self.construct(entry, &resolved)?,
                Lifetime::Singleton => self.singletons.get_or_try_init(
                    name,
                    entry.provider().teardown_hook(),
                    || self.construct(entry, &resolved),
                )?,
                Lifetime::Resource => {
                    let stack = scope.as_deref_mut().ok_or_else(|| ContainerError::ScopeRequired {
                        name: name.to_string(),
                        root: root.to_string(),
                    })?;
                    match stack.get(name) {
                        Some(instance) => instance,
                        None => {
                            let instance = self.construct(entry, &resolved)?;
                            stack.push(name, Arc::clone(&instance), entry.provider().teardown_hook());
                            instance
                        }
                    }
                }
            };
            resolved.insert(name, instance);
        }

        // **STEP 3**: Root is last in the order and always needed
        resolved.remove(root).ok_or_else(|| ContainerError::NotFound {
            name: root.to_string(),
        })
    }

    fn plan(&self, root: &str) -> Result<ResolutionPlan, ContainerError> {
        let registry = self.registry.read();
        let graph = self.graph_from(&registry, root)?;
        let entries = graph
            .order()
            .iter()
            .map(|name| {
                registry
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ContainerError::NotFound { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResolutionPlan { graph, entries })
    }

    // Reverse pass over the order: a node needs work if a dependent that needs
    // work is not already cached. Subtrees below cached singletons and scoped
    // resources are skipped, and the cached instances are captured here so a
    // concurrent `shutdown` cannot empty them out from under the walk.
    fn plan_steps(
        &self,
        plan: &ResolutionPlan,
        root: &str,
        scope: Option<&ResourceStack>,
    ) -> Result<Vec<Step>, ContainerError> {
        let mut steps: Vec<Step> = plan.entries.iter().map(|_| Step::Skip).collect();
        if let Some(last) = steps.last_mut() {
            *last = Step::Build;
        }

        for index in (0..plan.entries.len()).rev() {
            if matches!(steps[index], Step::Skip) {
                continue;
            }
            let entry = &plan.entries[index];
            let cached = match entry.lifetime() {
                Lifetime::Transient => None,
                Lifetime::Singleton => self.singletons.get(entry.name()),
                Lifetime::Resource => match scope {
                    Some(stack) => stack.get(entry.name()),
                    None => {
                        return Err(ContainerError::ScopeRequired {
                            name: entry.name().to_string(),
                            root: root.to_string(),
                        })
                    }
                },
            };
            if let Some(instance) = cached {
                steps[index] = Step::Reuse(instance);
                continue;
            }
            for dep in entry.dependency().dependency_names() {
                if let Some(position) = plan.graph.position(dep) {
                    if matches!(steps[position], Step::Skip) {
                        steps[position] = Step::Build;
                    }
                }
            }
        }

        Ok(steps)
    }

    fn construct(
        &self,
        entry: &RegistryEntry,
        resolved: &HashMap<&str, Instance>,
    ) -> Result<Instance, ContainerError> {
        let names = entry.dependency().dependency_names();
        let values = names
            .iter()
            .map(|dep| {
                resolved
                    .get(dep.as_str())
                    .cloned()
                    .ok_or_else(|| ContainerError::MissingDependency {
                        name: dep.clone(),
                        referenced_by: entry.name().to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        entry
            .provider()
            .construct(&Args::new(entry.name(), names, &values))
            .map_err(|source| {
                log::debug!("Constructor of '{}' failed: {}", entry.name(), source);
                ContainerError::ProviderConstruction {
                    name: entry.name().to_string(),
                    source,
                }
            })
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("entries", &self.len())
            .field("singletons", &self.singletons.len())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}
