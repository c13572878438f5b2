//! The marshaling engine: plan cache, transform registry and the state gate
//! that keeps serialize and deserialize traversals apart.
//!
//! One traversal may be in flight per engine. A call from another thread
//! blocks until it finishes; a nested call of the same kind from inside a
//! transform runs immediately on its own private stacks; a nested call of the
//! opposite kind fails with [`MarshalError::Busy`].

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use log::trace;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::config::{ListPolicy, MarshalConfig};
use crate::describe::{Describe, InterfaceId, Reflect, TypeKey};
use crate::error::{MarshalError, Result};
use crate::plan::{PlanCache, TypePlan};
use crate::transform::{ListTransform, Transform, TransformRegistry};
use crate::value::Value;
use crate::{deserialize, serialize};

/// What an engine is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    Idle,
    Serializing,
    Deserializing,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EngineState::Idle => "idle",
            EngineState::Serializing => "serializing",
            EngineState::Deserializing => "deserializing",
        };
        f.write_str(label)
    }
}

/// Holds the engine in a traversal state and restores the previous state
/// when dropped, on success and error alike.
struct StateScope<'e> {
    guard: ReentrantMutexGuard<'e, Cell<EngineState>>,
    previous: EngineState,
}

impl<'e> StateScope<'e> {
    fn enter(gate: &'e ReentrantMutex<Cell<EngineState>>, requested: EngineState) -> Result<Self> {
        let guard = gate.lock();
        let current = guard.get();
        if current != EngineState::Idle && current != requested {
            return Err(MarshalError::Busy { requested, current });
        }
        guard.set(requested);
        Ok(Self {
            guard,
            previous: current,
        })
    }
}

impl Drop for StateScope<'_> {
    fn drop(&mut self) {
        self.guard.set(self.previous);
    }
}

/// Converts object graphs to [`Value`] trees and back.
///
/// # Example
///
/// ```
/// use marshal_core::{Marshaller, Value};
///
/// let engine = Marshaller::new();
/// let tree = engine.serialize(&vec![1u8, 2, 3]).unwrap();
/// assert_eq!(tree.as_seq().map(|seq| seq.len()), Some(3));
///
/// let back: Vec<u8> = engine.deserialize(&tree).unwrap();
/// assert_eq!(back, vec![1, 2, 3]);
/// ```
pub struct Marshaller {
    plans: PlanCache,
    gate: ReentrantMutex<Cell<EngineState>>,
    config: MarshalConfig,
}

impl Marshaller {
    /// An engine with the default configuration.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_config(config: MarshalConfig) -> Self {
        MarshallerBuilder::from_config(config).build()
    }

    pub fn builder() -> MarshallerBuilder {
        MarshallerBuilder::new()
    }

    pub fn config(&self) -> &MarshalConfig {
        &self.config
    }

    /// The current state. Blocks while another thread holds a traversal.
    pub fn state(&self) -> EngineState {
        self.gate.lock().get()
    }

    pub fn plans(&self) -> &PlanCache {
        &self.plans
    }

    /// The compiled plan for `T`, compiling it on first use.
    pub fn plan<T: Describe>(&self) -> Result<Arc<TypePlan>> {
        self.plan_for(TypeKey::of::<T>())
    }

    pub fn plan_for(&self, key: TypeKey) -> Result<Arc<TypePlan>> {
        self.plans.get(key)
    }

    /// Convert `value` into a tree. The tree shares nothing with `value`.
    pub fn serialize<T: Describe>(&self, value: &T) -> Result<Value> {
        self.serialize_dyn(value)
    }

    pub fn serialize_dyn(&self, value: &dyn Reflect) -> Result<Value> {
        let _scope = StateScope::enter(&self.gate, EngineState::Serializing)?;
        trace!("serialize `{}`", value.type_key());
        serialize::run(self, value, true)
    }

    /// Rebuild a `T` from a tree.
    pub fn deserialize<T: Describe>(&self, value: &Value) -> Result<T> {
        let key = TypeKey::of::<T>();
        self.deserialize_dyn(key, value)?
            .downcast::<T>()
            .map(|object| *object)
            .map_err(|found| MarshalError::corrupted(key.name(), found.name()))
    }

    pub fn deserialize_dyn(&self, target: TypeKey, value: &Value) -> Result<Box<dyn Reflect>> {
        let _scope = StateScope::enter(&self.gate, EngineState::Deserializing)?;
        trace!("deserialize `{target}` from {}", value.kind_name());
        deserialize::run(self, target, value, true)
    }
}

impl Default for Marshaller {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Marshaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marshaller")
            .field("config", &self.config)
            .field("plans", &self.plans.len())
            .finish()
    }
}

/// Builder for [`Marshaller`].
///
/// Unless a transform is registered for [`InterfaceId::LIST`], `build`
/// installs a [`ListTransform`] with the configured list policy.
#[derive(Default)]
pub struct MarshallerBuilder {
    config: MarshalConfig,
    registry: TransformRegistry,
}

impl MarshallerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: MarshalConfig) -> Self {
        Self {
            config,
            registry: TransformRegistry::new(),
        }
    }

    pub fn value_stack_initial_size(mut self, size: usize) -> Self {
        self.config.value_stack_initial_size = size;
        self
    }

    pub fn context_stack_initial_size(mut self, size: usize) -> Self {
        self.config.context_stack_initial_size = size;
        self
    }

    pub fn list_policy(mut self, policy: ListPolicy) -> Self {
        self.config.list_policy = policy;
        self
    }

    pub fn native_fast_path(mut self, enabled: bool) -> Self {
        self.config.native_fast_path = enabled;
        self
    }

    /// Register a transform for exactly `T`.
    pub fn register_transform<T: Describe>(mut self, transform: Arc<dyn Transform>) -> Self {
        self.registry.register(TypeKey::of::<T>(), transform);
        self
    }

    /// Register the transform for every type declaring `interface`.
    pub fn register_interface_transform(mut self, interface: InterfaceId, transform: Arc<dyn Transform>) -> Self {
        self.registry.register_interface(interface, transform);
        self
    }

    pub fn build(self) -> Marshaller {
        let mut registry = self.registry;
        if !registry.has_interface(InterfaceId::LIST) {
            registry.register_interface(InterfaceId::LIST, Arc::new(ListTransform::new(self.config.list_policy)));
        }
        Marshaller {
            plans: PlanCache::new(registry),
            gate: ReentrantMutex::new(Cell::new(EngineState::Idle)),
            config: self.config,
        }
    }
}
