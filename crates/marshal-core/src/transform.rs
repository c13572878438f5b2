//! Value rewriters applied before the engine's structural logic runs.
//!
//! A [`Transform`] sees a value on its way into the tree (`serialize`) or on
//! its way out (`deserialize`) and may replace it with something of a
//! different type. The engine then treats the replacement by its own type.
//! Transforms may call back into the [`Marshaller`] for nested work but never
//! see the engine's frames.
//!
//! Resolution order for a type, performed once at plan compilation:
//! 1. transforms registered for the exact type, in registration order;
//! 2. otherwise the transform registered for the first declared interface
//!    that has one (earlier declarations are more specific);
//! 3. then the type's own descriptor bindings.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use log::trace;

use crate::config::ListPolicy;
use crate::describe::{InterfaceId, Reflect, TypeDescriptor, TypeKey};
use crate::engine::Marshaller;
use crate::error::{MarshalError, Result};
use crate::value::{MapNode, SeqNode, Value};

/// A polymorphic value rewriter.
pub trait Transform: Send + Sync {
    /// Name used in log output.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Rewrite a source value before it is expanded into the tree.
    fn serialize<'a>(&self, engine: &Marshaller, operand: Operand<'a>) -> Result<Operand<'a>>;

    /// Rewrite a tree node before it is turned into an instance of `target`.
    fn deserialize<'a>(&self, engine: &Marshaller, target: TypeKey, node: Node<'a>) -> Result<Node<'a>>;
}

/// A value on the serialize path: either still borrowed from the caller's
/// graph or produced by an earlier transform.
pub enum Operand<'a> {
    Borrowed(&'a dyn Reflect),
    Owned(Box<dyn Reflect>),
}

impl<'a> Operand<'a> {
    pub fn get(&self) -> &dyn Reflect {
        match self {
            Operand::Borrowed(value) => *value,
            Operand::Owned(value) => value.as_ref(),
        }
    }

    pub fn type_key(&self) -> TypeKey {
        self.get().type_key()
    }
}

/// A value on the deserialize path: a tree node (borrowed or rewritten), or
/// an already finished instance of the target type.
pub enum Node<'a> {
    Borrowed(&'a Value),
    Owned(Value),
    Object(Box<dyn Reflect>),
}

impl<'a> Node<'a> {
    /// The tree node, unless a transform already produced the instance.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Node::Borrowed(value) => Some(value),
            Node::Owned(value) => Some(value),
            Node::Object(_) => None,
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Transforms registered on an engine, keyed by exact type and by interface.
#[derive(Default, Clone)]
pub struct TransformRegistry {
    exact: Vec<(TypeId, Arc<dyn Transform>)>,
    interfaces: HashMap<InterfaceId, Arc<dyn Transform>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform for one concrete type. Several transforms for the
    /// same type run as a chain in registration order.
    pub fn register(&mut self, key: TypeKey, transform: Arc<dyn Transform>) {
        self.exact.push((key.id(), transform));
    }

    /// Register the transform for an interface, replacing any earlier one.
    pub fn register_interface(&mut self, interface: InterfaceId, transform: Arc<dyn Transform>) {
        self.interfaces.insert(interface, transform);
    }

    pub fn has_interface(&self, interface: InterfaceId) -> bool {
        self.interfaces.contains_key(&interface)
    }

    /// The full chain that applies to a type with the given descriptor.
    pub fn resolve(&self, key: TypeKey, descriptor: &TypeDescriptor) -> Vec<Arc<dyn Transform>> {
        let mut chain: Vec<Arc<dyn Transform>> = self
            .exact
            .iter()
            .filter(|(id, _)| *id == key.id())
            .map(|(_, transform)| Arc::clone(transform))
            .collect();

        if chain.is_empty() {
            if let Some(transform) = descriptor
                .interfaces()
                .iter()
                .find_map(|interface| self.interfaces.get(interface))
            {
                chain.push(Arc::clone(transform));
            }
        }

        chain.extend(descriptor.transforms.iter().cloned());
        chain
    }
}

// ============================================================================
// List transform
// ============================================================================

const TYPE_KEY: &str = "type";
const VALUE_KEY: &str = "value";

/// Default transform for [`InterfaceId::LIST`] collections.
///
/// Serializes the collection into a sequence node, one element per item.
/// Under [`ListPolicy::TypeWrapped`] every element becomes a map
/// `{"type": <element type>, "value": <element>}`; under
/// [`ListPolicy::Plain`] the element value is stored as-is.
#[derive(Debug, Clone, Copy)]
pub struct ListTransform {
    policy: ListPolicy,
}

impl ListTransform {
    pub fn new(policy: ListPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ListPolicy {
        self.policy
    }
}

impl Transform for ListTransform {
    fn name(&self) -> &str {
        "list"
    }

    fn serialize<'a>(&self, engine: &Marshaller, operand: Operand<'a>) -> Result<Operand<'a>> {
        let plan = engine.plan_for(operand.type_key())?;
        let Some(access) = plan.list_access() else {
            return Ok(operand);
        };

        let source = operand.get();
        let items = (access.items)(source)
            .ok_or_else(|| MarshalError::corrupted(plan.name(), source.type_key().name()))?;
        trace!("list transform: {} items of `{}`", items.len(), access.element);

        let mut seq = SeqNode::with_capacity(items.len());
        for item in items {
            let value = engine.serialize_dyn(item)?;
            match self.policy {
                ListPolicy::Plain => seq.push(value),
                ListPolicy::TypeWrapped => {
                    let mut wrapped = MapNode::with_capacity(2);
                    wrapped.insert(TYPE_KEY, access.element.name());
                    wrapped.insert(VALUE_KEY, value);
                    seq.push(wrapped);
                }
            }
        }
        Ok(Operand::Owned(Box::new(Value::Seq(seq))))
    }

    fn deserialize<'a>(&self, engine: &Marshaller, target: TypeKey, node: Node<'a>) -> Result<Node<'a>> {
        let plan = engine.plan_for(target)?;
        let Some(access) = plan.list_access() else {
            return Ok(node);
        };
        if !matches!(node.value(), Some(Value::Seq(_))) {
            return Ok(node);
        }
        let Some(seq) = node.value().and_then(Value::as_seq) else {
            return Err(MarshalError::corrupted("sequence node", "non-sequence node"));
        };

        let mut items = Vec::with_capacity(seq.len());
        for item in seq.iter() {
            let element = match self.policy {
                ListPolicy::Plain => item.as_ref(),
                ListPolicy::TypeWrapped => unwrap_element(access.element, target, item.as_ref())?,
            };
            items.push(engine.deserialize_dyn(access.element, element)?);
        }

        let collection = (access.collect)(items).map_err(|reason| MarshalError::deserialize(plan.name(), reason))?;
        Ok(Node::Object(collection))
    }
}

fn unwrap_element(element: TypeKey, target: TypeKey, item: &Value) -> Result<&Value> {
    let wrapped = item.as_map().ok_or_else(|| {
        MarshalError::deserialize(
            target.name(),
            format!("expected a type-wrapped element, found {}", item.kind_name()),
        )
    })?;
    match wrapped.get_str(TYPE_KEY).and_then(Value::as_str) {
        Some(name) if name == element.name() => {}
        Some(name) => {
            return Err(MarshalError::deserialize(
                target.name(),
                format!("element type `{name}` does not match `{}`", element.name()),
            ))
        }
        None => {
            return Err(MarshalError::deserialize(
                target.name(),
                "type-wrapped element has no `type` entry",
            ))
        }
    }
    wrapped
        .get_str(VALUE_KEY)
        .ok_or_else(|| MarshalError::deserialize(target.name(), "type-wrapped element has no `value` entry"))
}
