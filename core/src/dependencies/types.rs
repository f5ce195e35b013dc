use crate::errors::{ArgumentError, BoxError, ContainerError};
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A resolved, type-erased instance. Singletons hand out clones of the same `Arc`.
pub type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) type ConstructorFn =
    Arc<dyn Fn(&Args<'_>) -> Result<Instance, BoxError> + Send + Sync>;
pub(crate) type TeardownFn = Arc<dyn Fn(&Instance) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type TaskFn = Arc<dyn Fn(&Instance) -> Result<Instance, BoxError> + Send + Sync>;

/// **LIFETIME POLICY**
///
/// How long a constructed instance is cached and whether the container tears it down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// New instance on every resolution call.
    Transient,
    /// One instance per container, constructed at most once.
    Singleton,
    /// One instance per scope, torn down when the scope exits.
    Resource,
}

impl Lifetime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Singleton => "singleton",
            Lifetime::Resource => "resource",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifetime {
    type Err = ContainerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "transient" => Ok(Lifetime::Transient),
            "singleton" => Ok(Lifetime::Singleton),
            "resource" => Ok(Lifetime::Resource),
            _ => Err(ContainerError::InvalidLifetime {
                value: value.to_string(),
            }),
        }
    }
}

/// **DEPENDENCY** - a named node and the names it requires, in argument order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    name: String,
    dependency_names: Vec<String>,
}

impl Dependency {
    pub fn new<I, S>(name: impl Into<String>, dependency_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            dependency_names: dependency_names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependency_names(&self) -> &[String] {
        &self.dependency_names
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.dependency_names.iter().any(|dep| dep == name)
    }
}

/// **FACTORY**
///
/// The constructor bound to a dependency plus its optional teardown hook and
/// "use" task. Lifetime-agnostic so the same factory can back several
/// registrations (see [`FactoryCatalog`](crate::manifest::FactoryCatalog)).
#[derive(Clone)]
pub struct Factory {
    constructor: ConstructorFn,
    teardown: Option<TeardownFn>,
    task: Option<TaskFn>,
}

impl Factory {
    /// Wrap a typed constructor. The value is moved into an [`Instance`].
    pub fn new<T, F>(constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::from_instance_fn(move |args| constructor(args).map(|value| Arc::new(value) as Instance))
    }

    /// Wrap a constructor that already produces a type-erased instance.
    pub fn from_instance_fn<F>(constructor: F) -> Self
    where
        F: Fn(&Args<'_>) -> Result<Instance, BoxError> + Send + Sync + 'static,
    {
        Self {
            constructor: Arc::new(constructor),
            teardown: None,
            task: None,
        }
    }

    /// Attach a teardown hook. Runs once per resource instance on scope exit
    /// and once per singleton on container shutdown.
    pub fn with_teardown<T, F>(mut self, teardown: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.teardown = Some(Arc::new(move |instance: &Instance| {
            let value = instance
                .downcast_ref::<T>()
                .ok_or_else(|| hook_type_error::<T>("teardown"))?;
            teardown(value)
        }));
        self
    }

    /// Attach the task executed by [`Container::run`](crate::Container::run).
    pub fn with_task<T, R, F>(mut self, task: F) -> Self
    where
        T: Any + Send + Sync,
        R: Any + Send + Sync,
        F: Fn(&T) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        self.task = Some(Arc::new(move |instance: &Instance| {
            let value = instance
                .downcast_ref::<T>()
                .ok_or_else(|| hook_type_error::<T>("task"))?;
            task(value).map(|result| Arc::new(result) as Instance)
        }));
        self
    }

    pub fn has_teardown(&self) -> bool {
        self.teardown.is_some()
    }

    pub fn has_task(&self) -> bool {
        self.task.is_some()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("teardown", &self.teardown.is_some())
            .field("task", &self.task.is_some())
            .finish()
    }
}

fn hook_type_error<T>(hook: &str) -> BoxError {
    format!("{} hook expects a {}", hook, type_name::<T>()).into()
}

/// **PROVIDER** - a [`Factory`] paired with its [`Lifetime`].
#[derive(Debug, Clone)]
pub struct Provider {
    lifetime: Lifetime,
    factory: Factory,
}

impl Provider {
    pub fn new(lifetime: Lifetime, factory: Factory) -> Self {
        Self { lifetime, factory }
    }

    pub fn transient<T, F>(constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::new(Lifetime::Transient, Factory::new(constructor))
    }

    pub fn singleton<T, F>(constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::new(Lifetime::Singleton, Factory::new(constructor))
    }

    pub fn resource<T, F>(constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::new(Lifetime::Resource, Factory::new(constructor))
    }

    /// See [`Factory::with_teardown`].
    pub fn with_teardown<T, F>(mut self, teardown: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.factory = self.factory.with_teardown(teardown);
        self
    }

    /// See [`Factory::with_task`].
    pub fn with_task<T, R, F>(mut self, task: F) -> Self
    where
        T: Any + Send + Sync,
        R: Any + Send + Sync,
        F: Fn(&T) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        self.factory = self.factory.with_task(task);
        self
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub(crate) fn construct(&self, args: &Args<'_>) -> Result<Instance, BoxError> {
        (self.factory.constructor)(args)
    }

    pub(crate) fn teardown_hook(&self) -> Option<TeardownFn> {
        self.factory.teardown.clone()
    }

    pub(crate) fn task(&self) -> Option<&TaskFn> {
        self.factory.task.as_ref()
    }
}

/// **POSITIONAL ARGUMENTS**
///
/// Resolved dependencies handed to a constructor, in the order the
/// dependency names were declared.
pub struct Args<'a> {
    owner: &'a str,
    names: &'a [String],
    values: &'a [Instance],
}

impl<'a> Args<'a> {
    pub(crate) fn new(owner: &'a str, names: &'a [String], values: &'a [Instance]) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self {
            owner,
            names,
            values,
        }
    }

    /// Name of the dependency being constructed.
    pub fn owner(&self) -> &str {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> &[String] {
        self.names
    }

    /// Type-erased argument at `index`.
    pub fn instance(&self, index: usize) -> Result<&Instance, ArgumentError> {
        self.values
            .get(index)
            .ok_or_else(|| ArgumentError::IndexOutOfRange {
                owner: self.owner.to_string(),
                index,
                len: self.values.len(),
            })
    }

    /// Typed argument at `index`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, ArgumentError> {
        let instance = self.instance(index)?;
        Arc::clone(instance)
            .downcast::<T>()
            .map_err(|_| ArgumentError::TypeMismatch {
                owner: self.owner.to_string(),
                dependency: self.names[index].clone(),
                expected: type_name::<T>(),
            })
    }

    /// Typed argument by dependency name (first occurrence).
    pub fn get_by_name<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ArgumentError> {
        let index = self
            .names
            .iter()
            .position(|candidate| candidate == name)
            .ok_or_else(|| ArgumentError::UnknownDependency {
                owner: self.owner.to_string(),
                dependency: name.to_string(),
            })?;
        self.get(index)
    }
}

/// Downcast a resolved instance, reporting the dependency name on mismatch.
pub(crate) fn downcast_instance<T: Any + Send + Sync>(
    name: &str,
    instance: Instance,
) -> Result<Arc<T>, ContainerError> {
    instance
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeMismatch {
            name: name.to_string(),
            expected: type_name::<T>(),
        })
}
