//! Object graph → tree traversal.
//!
//! Iterative and stack-driven: `prepare` turns one source value into either a
//! finished [`Value`] or an empty pending node plus a frame on the three
//! aligned stacks; `drain` pops frames and prepares their children. Pending
//! nodes live in an arena indexed by allocation order, so a child's id is
//! always greater than its parent's and the tree is assembled in one
//! descending pass once every frame is drained.

use std::sync::Arc;

use log::trace;

use crate::describe::{Reflect, TypeKind};
use crate::engine::Marshaller;
use crate::error::{MarshalError, Result};
use crate::plan::TypePlan;
use crate::transform::Operand;
use crate::value::{MapNode, SeqNode, Value};

type NodeId = usize;

enum Slot {
    Ready(Value),
    Pending(NodeId),
}

enum PendingNode {
    Seq(Vec<Slot>),
    Map(Vec<(&'static str, Slot)>),
}

struct SerializeRun<'e, 'a> {
    engine: &'e Marshaller,
    sources: Vec<&'a dyn Reflect>,
    nodes: Vec<NodeId>,
    plans: Vec<Arc<TypePlan>>,
    arena: Vec<PendingNode>,
}

/// Serialize `root` on the calling thread's current traversal scope.
/// `transforms` is false when `root` is itself the output of a transform.
pub(crate) fn run(engine: &Marshaller, root: &dyn Reflect, transforms: bool) -> Result<Value> {
    let config = engine.config();
    let mut traversal = SerializeRun {
        engine,
        sources: Vec::with_capacity(config.context_stack_initial_size),
        nodes: Vec::with_capacity(config.context_stack_initial_size),
        plans: Vec::with_capacity(config.context_stack_initial_size),
        arena: Vec::with_capacity(config.value_stack_initial_size),
    };

    let root = traversal.prepare(root, transforms)?;
    traversal.drain()?;
    trace!("serialize finished with {} compound node(s)", traversal.arena.len());
    assemble(traversal.arena, root)
}

impl<'e, 'a> SerializeRun<'e, 'a> {
    fn prepare(&mut self, source: &'a dyn Reflect, mut transforms: bool) -> Result<Slot> {
        let mut current = source;
        loop {
            let mut plan = self.engine.plan_for(current.type_key())?;

            if transforms && !plan.transforms().is_empty() {
                let mut operand = Operand::Borrowed(current);
                for transform in plan.transforms() {
                    trace!("applying `{}` to `{}`", transform.name(), operand.type_key());
                    operand = transform.serialize(self.engine, operand)?;
                }
                match operand {
                    Operand::Owned(value) => return self.prepare_owned(value),
                    Operand::Borrowed(value) => {
                        current = value;
                        if current.type_key() != plan.key() {
                            plan = self.engine.plan_for(current.type_key())?;
                        }
                    }
                }
            }

            match plan.kind() {
                TypeKind::Value => {
                    let value = current
                        .downcast_ref::<Value>()
                        .ok_or_else(|| MarshalError::corrupted("value", current.type_key().name()))?;
                    return Ok(Slot::Ready(value.clone()));
                }
                TypeKind::Scalar(access) => {
                    return (access.to_value)(current)
                        .map(Slot::Ready)
                        .ok_or_else(|| MarshalError::corrupted(plan.name(), current.type_key().name()));
                }
                TypeKind::Optional(access) => match (access.get)(current) {
                    Some(None) => return Ok(Slot::Ready(Value::Null)),
                    Some(Some(inner)) => {
                        current = inner;
                        transforms = true;
                    }
                    None => return Err(MarshalError::corrupted(plan.name(), current.type_key().name())),
                },
                TypeKind::Array(access) => {
                    if self.engine.config().native_fast_path && plan.dimensions() == 1 {
                        if let Some(native) = (access.native)(current) {
                            trace!("native fast path: {} {} element(s)", native.len(), native.kind());
                            return Ok(Slot::Ready(Value::Seq(SeqNode::from_native(native))));
                        }
                    }
                    let len = (access.len)(current)
                        .ok_or_else(|| MarshalError::corrupted(plan.name(), current.type_key().name()))?;
                    return Ok(self.push_frame(current, PendingNode::Seq(Vec::with_capacity(len)), plan));
                }
                TypeKind::Struct(_) => {
                    let fields = plan.fields().len();
                    return Ok(self.push_frame(current, PendingNode::Map(Vec::with_capacity(fields)), plan));
                }
                TypeKind::List(_) | TypeKind::Opaque => {
                    return Err(MarshalError::serialize(
                        plan.name(),
                        "no transform rewrote the value into a serializable shape",
                    ));
                }
            }
        }
    }

    /// A transform handed back a value it owns; it cannot join this
    /// traversal's borrowed frames, so compounds get a traversal of their own.
    fn prepare_owned(&mut self, value: Box<dyn Reflect>) -> Result<Slot> {
        if value.is::<Value>() {
            let value = value
                .downcast::<Value>()
                .map_err(|found| MarshalError::corrupted("value", found.name()))?;
            return Ok(Slot::Ready(*value));
        }
        let plan = self.engine.plan_for(value.type_key())?;
        if let TypeKind::Scalar(access) = plan.kind() {
            return (access.to_value)(value.as_ref())
                .map(Slot::Ready)
                .ok_or_else(|| MarshalError::corrupted(plan.name(), value.type_key().name()));
        }
        run(self.engine, value.as_ref(), false).map(Slot::Ready)
    }

    fn push_frame(&mut self, source: &'a dyn Reflect, node: PendingNode, plan: Arc<TypePlan>) -> Slot {
        let id = self.arena.len();
        self.arena.push(node);
        self.sources.push(source);
        self.nodes.push(id);
        self.plans.push(plan);
        Slot::Pending(id)
    }

    fn pop_frame(&mut self) -> Result<Option<(&'a dyn Reflect, NodeId, Arc<TypePlan>)>> {
        match (self.sources.pop(), self.nodes.pop(), self.plans.pop()) {
            (Some(source), Some(node), Some(plan)) => Ok(Some((source, node, plan))),
            (None, None, None) => Ok(None),
            _ => Err(MarshalError::corrupted("aligned frame stacks", "stacks of unequal depth")),
        }
    }

    fn drain(&mut self) -> Result<()> {
        while let Some((source, node, plan)) = self.pop_frame()? {
            match plan.kind() {
                TypeKind::Array(access) => {
                    let len = (access.len)(source)
                        .ok_or_else(|| MarshalError::corrupted(plan.name(), source.type_key().name()))?;
                    for index in 0..len {
                        let item = (access.get)(source, index).ok_or_else(|| {
                            MarshalError::serialize(plan.name(), format!("can't get element {index}"))
                        })?;
                        let slot = self.prepare(item, true)?;
                        self.append(node, None, slot)?;
                    }
                }
                TypeKind::Struct(_) => {
                    for field in plan.fields() {
                        let value = field.read(source).ok_or_else(|| {
                            MarshalError::serialize(plan.name(), format!("can't get `{}` field data", field.name()))
                        })?;
                        let slot = match field.transform() {
                            Some(transform) => match transform.serialize(self.engine, Operand::Borrowed(value))? {
                                Operand::Borrowed(value) => self.prepare(value, true)?,
                                Operand::Owned(value) => self.prepare_owned(value)?,
                            },
                            None => self.prepare(value, true)?,
                        };
                        self.append(node, Some(field.key()), slot)?;
                    }
                }
                other => {
                    return Err(MarshalError::corrupted(
                        "array or struct frame",
                        format!("{other:?} frame"),
                    ))
                }
            }
        }
        Ok(())
    }

    fn append(&mut self, node: NodeId, key: Option<&'static str>, slot: Slot) -> Result<()> {
        match (self.arena.get_mut(node), key) {
            (Some(PendingNode::Seq(items)), None) => items.push(slot),
            (Some(PendingNode::Map(entries)), Some(key)) => entries.push((key, slot)),
            _ => return Err(MarshalError::corrupted("pending node for frame", "mismatched node")),
        }
        Ok(())
    }
}

fn assemble(arena: Vec<PendingNode>, root: Slot) -> Result<Value> {
    let mut built: Vec<Option<Value>> = Vec::new();
    built.resize_with(arena.len(), || None);

    for (id, node) in arena.into_iter().enumerate().rev() {
        let value = match node {
            PendingNode::Seq(items) => {
                let items = items
                    .into_iter()
                    .map(|slot| take(&mut built, slot))
                    .collect::<Result<Vec<_>>>()?;
                Value::Seq(SeqNode::from(items))
            }
            PendingNode::Map(entries) => {
                let mut map = MapNode::with_capacity(entries.len());
                for (key, slot) in entries {
                    map.insert(key, take(&mut built, slot)?);
                }
                Value::Map(map)
            }
        };
        built[id] = Some(value);
    }

    take(&mut built, root)
}

fn take(built: &mut [Option<Value>], slot: Slot) -> Result<Value> {
    match slot {
        Slot::Ready(value) => Ok(value),
        Slot::Pending(id) => built
            .get_mut(id)
            .and_then(Option::take)
            .ok_or_else(|| MarshalError::corrupted(format!("assembled node {id}"), "missing node")),
    }
}
