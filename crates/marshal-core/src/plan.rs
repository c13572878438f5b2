//! Compiled per-type plans and the engine-owned cache that holds them.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::describe::{ArrayAccess, FieldDescriptor, ListAccess, TypeKey, TypeKind};
use crate::error::{MarshalError, Result};
use crate::transform::{Transform, TransformRegistry};

/// The immutable recipe for one type: its kind with the serializable fields
/// in declaration order, and the resolved transform chain.
pub struct TypePlan {
    key: TypeKey,
    kind: TypeKind,
    transforms: Vec<Arc<dyn Transform>>,
    dimensions: usize,
}

impl TypePlan {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Serializable fields in declaration order. Empty for non-structs.
    pub fn fields(&self) -> &[FieldDescriptor] {
        match &self.kind {
            TypeKind::Struct(access) => access.fields(),
            _ => &[],
        }
    }

    /// Map-node keys in the order fields are written.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields().iter().map(FieldDescriptor::key).collect()
    }

    pub fn array_access(&self) -> Option<&ArrayAccess> {
        match &self.kind {
            TypeKind::Array(access) => Some(access),
            _ => None,
        }
    }

    pub fn list_access(&self) -> Option<&ListAccess> {
        match &self.kind {
            TypeKind::List(access) => Some(access),
            _ => None,
        }
    }

    pub fn transforms(&self) -> &[Arc<dyn Transform>] {
        &self.transforms
    }

    /// Array nesting depth: 1 for `Vec<i32>`, 2 for `Vec<Vec<i32>>`, 0 for
    /// anything that is not an array.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

impl std::fmt::Debug for TypePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypePlan")
            .field("type", &self.key.name())
            .field("kind", &self.kind)
            .field("fields", &self.field_names())
            .field("transforms", &self.transforms.len())
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

/// Append-only cache of compiled plans, owned by one engine.
///
/// Failures are cached alongside successes, so a type that cannot be
/// compiled reports the same error on every lookup without recompiling.
pub struct PlanCache {
    entries: RwLock<HashMap<TypeId, Result<Arc<TypePlan>>>>,
    registry: TransformRegistry,
}

impl PlanCache {
    pub fn new(registry: TransformRegistry) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            registry,
        }
    }

    /// The cached plan for `key`, compiling it on first use.
    pub fn get(&self, key: TypeKey) -> Result<Arc<TypePlan>> {
        if let Some(entry) = self.entries.read().get(&key.id()) {
            return entry.clone();
        }

        let mut entries = self.entries.write();
        // Another thread may have compiled it between the two locks.
        if let Some(entry) = entries.get(&key.id()) {
            return entry.clone();
        }

        let compiled = compile(key, &self.registry).map(Arc::new);
        match &compiled {
            Ok(plan) => debug!(
                "compiled plan for `{}`: {:?} with {} transform(s)",
                key,
                plan.kind(),
                plan.transforms().len()
            ),
            Err(err) => debug!("caching compile failure for `{key}`: {err}"),
        }
        entries.insert(key.id(), compiled.clone());
        compiled
    }

    /// Number of cached entries, failures included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: TypeKey) -> bool {
        self.entries.read().contains_key(&key.id())
    }
}

fn compile(key: TypeKey, registry: &TransformRegistry) -> Result<TypePlan> {
    let descriptor = key.describe();
    let transforms = registry.resolve(key, &descriptor);

    let mut kind = descriptor.kind;
    match &mut kind {
        TypeKind::Struct(access) => {
            access.fields.retain(|field| !field.is_skipped());
            let mut seen = HashSet::with_capacity(access.fields.len());
            for field in &access.fields {
                if field.key().is_empty() {
                    return Err(MarshalError::compile(
                        key.name(),
                        format!("field `{}` has an empty key", field.name()),
                    ));
                }
                if !seen.insert(field.key()) {
                    return Err(MarshalError::compile(
                        key.name(),
                        format!("duplicate field key `{}`", field.key()),
                    ));
                }
            }
        }
        TypeKind::List(_) if transforms.is_empty() => {
            return Err(MarshalError::compile(
                key.name(),
                "list-like type has no transform registered",
            ));
        }
        TypeKind::Opaque if transforms.is_empty() => {
            return Err(MarshalError::compile(
                key.name(),
                "opaque type has no transform to rewrite it",
            ));
        }
        _ => {}
    }

    let dimensions = match &kind {
        TypeKind::Array(access) => array_dimensions(access.element),
        _ => 0,
    };

    Ok(TypePlan {
        key,
        kind,
        transforms,
        dimensions,
    })
}

fn array_dimensions(mut element: TypeKey) -> usize {
    let mut dimensions = 1;
    while let TypeKind::Array(access) = element.describe().kind {
        dimensions += 1;
        element = access.element;
    }
    dimensions
}
