//! Tree → object graph traversal, the mirror of [`serialize`](crate::serialize).
//!
//! Struct targets are created up front by their factory and receive their
//! fields at assembly time; arrays and collections are built from their
//! finished elements. Assignments are deferred because a child target is not
//! complete until its own frame has drained.

use std::borrow::Cow;
use std::sync::Arc;

use log::trace;

use crate::describe::{Reflect, TypeKey, TypeKind};
use crate::engine::Marshaller;
use crate::error::{MarshalError, Result};
use crate::plan::TypePlan;
use crate::transform::Node;
use crate::value::Value;

type TargetId = usize;
type Wrap = fn(Box<dyn Reflect>) -> Option<Box<dyn Reflect>>;

enum Slot {
    Ready(Box<dyn Reflect>),
    /// A target still being filled, plus the `Some` wrappers to apply once
    /// it is finished, outermost first.
    Pending { id: TargetId, wraps: Vec<Wrap> },
}

enum TargetBody {
    Struct {
        object: Box<dyn Reflect>,
        assignments: Vec<(usize, Slot)>,
    },
    Array {
        items: Vec<Slot>,
    },
}

struct PendingTarget {
    plan: Arc<TypePlan>,
    body: TargetBody,
}

struct DeserializeRun<'e, 'a> {
    engine: &'e Marshaller,
    sources: Vec<&'a Value>,
    targets: Vec<TargetId>,
    plans: Vec<Arc<TypePlan>>,
    arena: Vec<PendingTarget>,
}

pub(crate) fn run(engine: &Marshaller, target: TypeKey, root: &Value, transforms: bool) -> Result<Box<dyn Reflect>> {
    let config = engine.config();
    let mut traversal = DeserializeRun {
        engine,
        sources: Vec::with_capacity(config.context_stack_initial_size),
        targets: Vec::with_capacity(config.context_stack_initial_size),
        plans: Vec::with_capacity(config.context_stack_initial_size),
        arena: Vec::with_capacity(config.value_stack_initial_size),
    };

    let root = traversal.prepare(target, root, transforms)?;
    traversal.drain()?;
    trace!("deserialize finished with {} compound target(s)", traversal.arena.len());
    assemble(traversal.arena, root)
}

impl<'e, 'a> DeserializeRun<'e, 'a> {
    fn prepare(&mut self, target: TypeKey, source: &'a Value, mut transforms: bool) -> Result<Slot> {
        let mut key = target;
        let mut current = source;
        let mut wraps: Vec<Wrap> = Vec::new();

        loop {
            let plan = self.engine.plan_for(key)?;

            if transforms && !plan.transforms().is_empty() {
                let mut node = Node::Borrowed(current);
                for transform in plan.transforms() {
                    trace!("applying `{}` to {} for `{key}`", transform.name(), kind_of(&node));
                    node = transform.deserialize(self.engine, key, node)?;
                }
                match node {
                    Node::Borrowed(value) => current = value,
                    Node::Owned(value) => {
                        let object = run(self.engine, key, &value, false)?;
                        return ready(object, wraps);
                    }
                    Node::Object(object) => {
                        if object.type_key() != key {
                            return Err(MarshalError::corrupted(key.name(), object.type_key().name()));
                        }
                        return ready(object, wraps);
                    }
                }
            }

            match plan.kind() {
                TypeKind::Value => return ready(Box::new(current.clone()), wraps),
                TypeKind::Scalar(access) => {
                    let object =
                        (access.from_value)(current).map_err(|reason| MarshalError::deserialize(key.name(), reason))?;
                    return ready(object, wraps);
                }
                TypeKind::Optional(access) => {
                    if current.is_null() {
                        return ready((access.none)(), wraps);
                    }
                    wraps.push(access.some);
                    key = access.inner;
                    transforms = true;
                }
                TypeKind::Array(access) => {
                    let seq = current.as_seq().ok_or_else(|| {
                        MarshalError::deserialize(
                            key.name(),
                            format!("target is an array but found {}", current.kind_name()),
                        )
                    })?;
                    if self.engine.config().native_fast_path && plan.dimensions() == 1 {
                        if let Some(object) = seq.native().and_then(|native| (access.from_native)(native)) {
                            trace!("native fast path into `{key}`: {} element(s)", seq.len());
                            return ready(object, wraps);
                        }
                    }
                    let body = TargetBody::Array {
                        items: Vec::with_capacity(seq.len()),
                    };
                    return Ok(self.push_frame(current, body, plan, wraps));
                }
                TypeKind::Struct(access) => {
                    if current.as_map().is_none() {
                        return Err(MarshalError::deserialize(
                            key.name(),
                            format!("target is a struct but found {}", current.kind_name()),
                        ));
                    }
                    let object = access.construct().ok_or_else(|| {
                        MarshalError::compile(key.name(), "no factory registered to construct the target")
                    })?;
                    let body = TargetBody::Struct {
                        object,
                        assignments: Vec::with_capacity(plan.fields().len()),
                    };
                    return Ok(self.push_frame(current, body, plan, wraps));
                }
                TypeKind::List(_) | TypeKind::Opaque => {
                    return Err(MarshalError::deserialize(
                        key.name(),
                        format!("no transform rebuilt the target from {}", current.kind_name()),
                    ));
                }
            }
        }
    }

    /// Prepare a node that does not live in the source tree: a transform
    /// output, or an element materialized from a native sequence.
    fn prepare_detached(&mut self, target: TypeKey, value: Value) -> Result<Slot> {
        run(self.engine, target, &value, true).map(Slot::Ready)
    }

    fn push_frame(&mut self, source: &'a Value, body: TargetBody, plan: Arc<TypePlan>, wraps: Vec<Wrap>) -> Slot {
        let id = self.arena.len();
        self.arena.push(PendingTarget {
            plan: Arc::clone(&plan),
            body,
        });
        self.sources.push(source);
        self.targets.push(id);
        self.plans.push(plan);
        Slot::Pending { id, wraps }
    }

    fn pop_frame(&mut self) -> Result<Option<(&'a Value, TargetId, Arc<TypePlan>)>> {
        match (self.sources.pop(), self.targets.pop(), self.plans.pop()) {
            (Some(source), Some(target), Some(plan)) => Ok(Some((source, target, plan))),
            (None, None, None) => Ok(None),
            _ => Err(MarshalError::corrupted("aligned frame stacks", "stacks of unequal depth")),
        }
    }

    fn drain(&mut self) -> Result<()> {
        while let Some((source, target, plan)) = self.pop_frame()? {
            match plan.kind() {
                TypeKind::Array(access) => {
                    let seq = source
                        .as_seq()
                        .ok_or_else(|| MarshalError::corrupted("sequence node", source.kind_name()))?;
                    for item in seq.iter() {
                        let slot = match item {
                            Cow::Borrowed(item) => self.prepare(access.element, item, true)?,
                            Cow::Owned(item) => self.prepare_detached(access.element, item)?,
                        };
                        self.assign(target, None, slot)?;
                    }
                }
                TypeKind::Struct(_) => {
                    let map = source
                        .as_map()
                        .ok_or_else(|| MarshalError::corrupted("map node", source.kind_name()))?;
                    for (index, field) in plan.fields().iter().enumerate() {
                        let Some(entry) = map.get_str(field.key()) else {
                            continue;
                        };
                        let slot = match field.transform() {
                            Some(transform) => match transform.deserialize(self.engine, field.ty(), Node::Borrowed(entry))? {
                                Node::Borrowed(value) => self.prepare(field.ty(), value, true)?,
                                Node::Owned(value) => {
                                    Slot::Ready(run(self.engine, field.ty(), &value, false)?)
                                }
                                Node::Object(object) => Slot::Ready(object),
                            },
                            None => self.prepare(field.ty(), entry, true)?,
                        };
                        self.assign(target, Some(index), slot)?;
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

    fn assign(&mut self, target: TargetId, field: Option<usize>, slot: Slot) -> Result<()> {
        match (self.arena.get_mut(target).map(|pending| &mut pending.body), field) {
            (Some(TargetBody::Array { items }), None) => items.push(slot),
            (Some(TargetBody::Struct { assignments, .. }), Some(index)) => assignments.push((index, slot)),
            _ => return Err(MarshalError::corrupted("pending target for frame", "mismatched target")),
        }
        Ok(())
    }
}

fn kind_of(node: &Node<'_>) -> &'static str {
    node.value().map_or("an object", Value::kind_name)
}

fn ready(object: Box<dyn Reflect>, wraps: Vec<Wrap>) -> Result<Slot> {
    wrap(object, &wraps).map(Slot::Ready)
}

fn wrap(mut object: Box<dyn Reflect>, wraps: &[Wrap]) -> Result<Box<dyn Reflect>> {
    for some in wraps.iter().rev() {
        let inner = object.type_key();
        object = some(object).ok_or_else(|| MarshalError::corrupted("optional payload", inner.name()))?;
    }
    Ok(object)
}

fn assemble(arena: Vec<PendingTarget>, root: Slot) -> Result<Box<dyn Reflect>> {
    let mut built: Vec<Option<Box<dyn Reflect>>> = Vec::new();
    built.resize_with(arena.len(), || None);

    for (id, pending) in arena.into_iter().enumerate().rev() {
        let PendingTarget { plan, body } = pending;
        let object = match body {
            TargetBody::Struct {
                mut object,
                assignments,
            } => {
                for (index, slot) in assignments {
                    let field = plan
                        .fields()
                        .get(index)
                        .ok_or_else(|| MarshalError::corrupted(format!("field {index}"), plan.name()))?;
                    let value = take(&mut built, slot)?;
                    field.write(object.as_mut(), value).map_err(|reason| {
                        MarshalError::deserialize(plan.name(), format!("can't set `{}` field: {reason}", field.name()))
                    })?;
                }
                object
            }
            TargetBody::Array { items } => {
                let access = plan
                    .array_access()
                    .ok_or_else(|| MarshalError::corrupted("array plan", plan.name()))?;
                let items = items
                    .into_iter()
                    .map(|slot| take(&mut built, slot))
                    .collect::<Result<Vec<_>>>()?;
                (access.build)(items).map_err(|reason| MarshalError::deserialize(plan.name(), reason))?
            }
        };
        built[id] = Some(object);
    }

    take(&mut built, root)
}

fn take(built: &mut [Option<Box<dyn Reflect>>], slot: Slot) -> Result<Box<dyn Reflect>> {
    match slot {
        Slot::Ready(object) => Ok(object),
        Slot::Pending { id, wraps } => {
            let object = built
                .get_mut(id)
                .and_then(Option::take)
                .ok_or_else(|| MarshalError::corrupted(format!("assembled target {id}"), "missing target"))?;
            wrap(object, &wraps)
        }
    }
}
