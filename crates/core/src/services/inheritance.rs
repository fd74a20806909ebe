use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, warn};

use crate::model::ClassDescriptor;

/// Effective virtual-table slots of a class: slot index → method name.
pub type SlotMap = BTreeMap<i64, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// `path` starts and ends with the class that was revisited.
    #[error("Cyclic inheritance at class '{class}': {}", path.join(" -> "))]
    Cycle { class: String, path: Vec<String> },
    #[error("Class '{0}' is not described in the dataset")]
    UnknownClass(String),
}

impl ResolveError {
    /// Restate a cycle from the point of view of `class` when `class` lies on
    /// it, so each member reports the loop starting at itself.
    fn seen_from(self, class: &str) -> Self {
        match self {
            ResolveError::Cycle { class: at, mut path } => {
                path.pop();
                match path.iter().position(|n| n == class) {
                    Some(pos) => {
                        path.rotate_left(pos);
                        path.push(class.to_string());
                        ResolveError::Cycle { class: class.to_string(), path }
                    }
                    None => {
                        path.push(at.clone());
                        ResolveError::Cycle { class: at, path }
                    }
                }
            }
            other => other,
        }
    }
}

/// Merges ancestor virtual-table slots into descendants.
///
/// Classes are nodes of a name-keyed graph; an edge goes from a class to the
/// parent it inherits from. Resolution is a post-order walk: the parent's
/// effective map is computed first and the child's own slots are laid over it.
/// Results (including failures) are memoized for the lifetime of the resolver,
/// so one resolver corresponds to one resolution pass over a dataset.
pub struct InheritanceResolver<'a> {
    classes: &'a BTreeMap<String, ClassDescriptor>,
    resolved: HashMap<String, Result<SlotMap, ResolveError>>,
    visiting: Vec<String>,
}

impl<'a> InheritanceResolver<'a> {
    pub fn new(classes: &'a BTreeMap<String, ClassDescriptor>) -> Self {
        Self { classes, resolved: HashMap::new(), visiting: Vec::new() }
    }

    /// Effective slots of the dataset class called `name`.
    pub fn resolve(&mut self, name: &str) -> Result<SlotMap, ResolveError> {
        let classes = self.classes;
        let class = classes.get(name).ok_or_else(|| ResolveError::UnknownClass(name.to_string()))?;
        self.visit(class)
    }

    /// Resolve every class of the dataset, in name order.
    pub fn resolve_all(&mut self) -> BTreeMap<String, Result<SlotMap, ResolveError>> {
        let classes = self.classes;
        classes.values().map(|class| (class.name.clone(), self.visit(class))).collect()
    }

    /// Number of classes whose result is already memoized.
    pub fn memoized(&self) -> usize {
        self.resolved.len()
    }

    fn visit(&mut self, class: &ClassDescriptor) -> Result<SlotMap, ResolveError> {
        if let Some(done) = self.resolved.get(&class.name) {
            return done.clone();
        }

        if let Some(pos) = self.visiting.iter().position(|n| *n == class.name) {
            let mut path = self.visiting[pos..].to_vec();
            path.push(class.name.clone());
            return Err(ResolveError::Cycle { class: class.name.clone(), path });
        }

        // Inheritance only applies to classes that own a vtable.
        if class.vtable_base.is_none() {
            let own = class.vtable_slots.clone();
            self.resolved.insert(class.name.clone(), Ok(own.clone()));
            return Ok(own);
        }

        let classes = self.classes;
        let parent = class.inherits_from.as_deref().and_then(|p| classes.get(p));
        let result = match parent {
            Some(parent) => {
                self.visiting.push(class.name.clone());
                let inherited = self.visit(parent);
                self.visiting.pop();
                inherited.map_err(|err| err.seen_from(&class.name)).map(|mut slots| {
                    slots.extend(class.vtable_slots.iter().map(|(i, n)| (*i, n.clone())));
                    slots
                })
            }
            None => {
                if let Some(missing) = &class.inherits_from {
                    warn!(
                        class = %class.name,
                        parent = %missing,
                        "parent not described; no slots inherited"
                    );
                }
                Ok(class.vtable_slots.clone())
            }
        };

        if let Ok(slots) = &result {
            debug!(class = %class.name, slots = slots.len(), "resolved vtable slots");
        }
        self.resolved.insert(class.name.clone(), result.clone());
        result
    }
}

/// One-off resolution of `class` against `classes` with a fresh memo table.
pub fn resolve(
    class: &ClassDescriptor,
    classes: &BTreeMap<String, ClassDescriptor>,
) -> Result<SlotMap, ResolveError> {
    InheritanceResolver::new(classes).visit(class)
}
