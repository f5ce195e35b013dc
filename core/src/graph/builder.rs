use crate::dependencies::registry::{Registry, RegistryEntry};
use crate::dependencies::types::Lifetime;
use crate::errors::ContainerError;
use crate::graph::types::{ResolutionGraph, VisitState};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// **GRAPH BUILDER**
///
/// Depth-first, cycle-checked topological sort over a [`Registry`].
/// Dependencies are visited in declared order, so the resulting order is
/// reproducible for a fixed set of registrations. The walk keeps its own
/// stack, so arbitrarily deep chains cannot overflow the thread stack.
pub struct GraphBuilder<'r> {
    registry: &'r Registry,
}

impl<'r> GraphBuilder<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// **BUILD** the validated graph rooted at `root`.
    ///
    /// **ERRORS**: `NotFound` (unknown root), `MissingDependency`,
    /// `CyclicDependency`, `CaptiveDependency`. No constructor is involved.
    pub fn build(&self, root: &str) -> Result<ResolutionGraph, ContainerError> {
        let entry = self.entry(root)?;
        let mut states = HashMap::new();
        let mut order = Vec::new();

        self.visit(entry, &mut states, &mut order)?;
        self.check_captives(&order)?;

        log::trace!("Graph for '{}': {:?}", root, order);
        Ok(ResolutionGraph::new(
            root,
            order.into_iter().map(str::to_string).collect(),
        ))
    }

    /// **VALIDATE ALL** registered roots, in sorted-name order, sharing the
    /// visit state. Returns one dependency-first order covering the registry.
    pub fn validate_all(&self) -> Result<Vec<String>, ContainerError> {
        let mut states = HashMap::new();
        let mut order = Vec::new();

        for name in self.registry.names() {
            let entry = self.entry(&name)?;
            self.visit(entry, &mut states, &mut order)?;
        }
        self.check_captives(&order)?;

        Ok(order.into_iter().map(str::to_string).collect())
    }

    fn visit(
        &self,
        root: &'r RegistryEntry,
        states: &mut HashMap<&'r str, VisitState>,
        order: &mut Vec<&'r str>,
    ) -> Result<(), ContainerError> {
        if states.get(root.name()) == Some(&VisitState::Done) {
            return Ok(());
        }

        // Each frame: entry being visited and the index of its next dependency.
        let mut stack: Vec<(&'r RegistryEntry, usize)> = vec![(root, 0)];
        states.insert(root.name(), VisitState::InProgress);

        while let Some(&(current, next)) = stack.last() {
            let Some(dep) = current.dependency().dependency_names().get(next) else {
                stack.pop();
                states.insert(current.name(), VisitState::Done);
                order.push(current.name());
                continue;
            };
            if let Some(frame) = stack.last_mut() {
                frame.1 += 1;
            }

            match states.get(dep.as_str()) {
                Some(VisitState::Done) => {}
                Some(VisitState::InProgress) => {
                    let mut path: Vec<String> = stack
                        .iter()
                        .map(|(entry, _)| entry.name().to_string())
                        .collect();
                    path.push(dep.clone());
                    return Err(ContainerError::CyclicDependency { path });
                }
                None => {
                    let child = self.registry.get(dep).map(Arc::as_ref).ok_or_else(|| {
                        ContainerError::MissingDependency {
                            name: dep.clone(),
                            referenced_by: current.name().to_string(),
                        }
                    })?;
                    states.insert(child.name(), VisitState::InProgress);
                    stack.push((child, 0));
                }
            }
        }

        Ok(())
    }

    // A singleton outlives every scope, so it must not capture anything that
    // needs one, directly or through transients.
    fn check_captives(&self, order: &[&'r str]) -> Result<(), ContainerError> {
        let mut needs_scope: HashSet<&str> = HashSet::new();

        for &name in order {
            let entry = self.entry(name)?;
            let scoped_dep = entry
                .dependency()
                .dependency_names()
                .iter()
                .find(|dep| needs_scope.contains(dep.as_str()));

            match entry.lifetime() {
                Lifetime::Singleton => {
                    if let Some(dep) = scoped_dep {
                        return Err(ContainerError::CaptiveDependency {
                            name: name.to_string(),
                            dependency: dep.clone(),
                        });
                    }
                }
                Lifetime::Resource => {
                    needs_scope.insert(name);
                }
                Lifetime::Transient => {
                    if scoped_dep.is_some() {
                        needs_scope.insert(name);
                    }
                }
            }
        }

        Ok(())
    }

    fn entry(&self, name: &str) -> Result<&'r RegistryEntry, ContainerError> {
        self.registry
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| ContainerError::NotFound {
                name: name.to_string(),
            })
    }
}
