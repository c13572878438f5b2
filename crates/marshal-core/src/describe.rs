//! Type metadata: how the engine learns the shape of a Rust type.
//!
//! A type opts in by implementing [`Describe`], returning a [`TypeDescriptor`]
//! that names its kind and binds the accessors the engine needs: a
//! scalar codec, element access for arrays and list-like collections,
//! or an ordered field table plus a factory for structs. Every `Describe` type
//! is automatically [`Reflect`], the object-safe handle the engine passes
//! around while it walks a graph.
//!
//! # Example
//!
//! ```
//! use marshal_core::{Describe, TypeDescriptor};
//!
//! #[derive(Default)]
//! struct Account {
//!     id: u64,
//!     owner: String,
//!     cache: Vec<u8>,
//! }
//!
//! impl Describe for Account {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::structure::<Self>()
//!             .field("id", |a: &Account| &a.id, |a: &mut Account, v| a.id = v)
//!             .field("owner", |a: &Account| &a.owner, |a: &mut Account, v| a.owner = v)
//!             .with_field(
//!                 marshal_core::FieldDescriptor::new("cache", |a: &Account| &a.cache, |a: &mut Account, v| a.cache = v)
//!                     .skipped(),
//!             )
//!             .default_factory()
//!             .build()
//!     }
//! }
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeSet, LinkedList, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::native::NativeArray;
use crate::scalar::{Scalar, ScalarKind};
use crate::transform::Transform;
use crate::value::Value;

/// Source of a type's metadata.
pub trait Describe: Send + Sync + 'static {
    fn describe() -> TypeDescriptor;
}

/// Object-safe handle to any [`Describe`] type.
pub trait Reflect: Any + Send + Sync + 'static {
    fn type_key(&self) -> TypeKey;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Describe> Reflect for T {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl dyn Reflect {
    pub fn is<T: Describe>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Describe>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Describe>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Take ownership of the concrete value. On mismatch the key of the
    /// actual type is returned so callers can report it.
    pub fn downcast<T: Describe>(self: Box<Self>) -> Result<Box<T>, TypeKey> {
        let key = self.type_key();
        self.into_any().downcast::<T>().map_err(|_| key)
    }
}

impl fmt::Debug for dyn Reflect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.type_key().name())
    }
}

// ============================================================================
// Type identity
// ============================================================================

/// Identity of a describable type: its `TypeId`, its name for diagnostics,
/// and the function that produces its descriptor. Equality and hashing use
/// the `TypeId` only.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
    describe: fn() -> TypeDescriptor,
}

impl TypeKey {
    pub fn of<T: Describe>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            describe: T::describe,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn describe(&self) -> TypeDescriptor {
        (self.describe)()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeKey").field(&self.name).finish()
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A named capability a type can declare so that transforms registered for
/// the capability apply to it (the way an interface or base class would).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub &'static str);

impl InterfaceId {
    /// Generic sequence collections. The engine registers its list transform
    /// for this interface by default.
    pub const LIST: InterfaceId = InterfaceId("list");
}

// ============================================================================
// Descriptors
// ============================================================================

/// Metadata for one type: its kind plus declared interfaces and transform
/// bindings.
pub struct TypeDescriptor {
    pub(crate) kind: TypeKind,
    pub(crate) interfaces: Vec<InterfaceId>,
    pub(crate) transforms: Vec<Arc<dyn Transform>>,
}

/// How the engine treats a type once transforms have run.
pub enum TypeKind {
    /// Leaf converted directly to and from a scalar value.
    Scalar(ScalarAccess),
    /// The [`Value`] type itself; passed through as a deep clone.
    Value,
    /// `Option<T>`: `None` is `Null`, `Some` is handled as `T`.
    Optional(OptionalAccess),
    /// Index-addressable array expanded into a sequence node.
    Array(ArrayAccess),
    /// Generic collection handled by a transform registered for
    /// [`InterfaceId::LIST`].
    List(ListAccess),
    /// Record expanded into a map node, one entry per field.
    Struct(StructAccess),
    /// No structure of its own; a transform must rewrite it.
    Opaque,
}

impl TypeKind {
    fn label(&self) -> &'static str {
        match self {
            TypeKind::Scalar(_) => "scalar",
            TypeKind::Value => "value",
            TypeKind::Optional(_) => "optional",
            TypeKind::Array(_) => "array",
            TypeKind::List(_) => "list",
            TypeKind::Struct(_) => "struct",
            TypeKind::Opaque => "opaque",
        }
    }
}

impl fmt::Debug for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub struct ScalarAccess {
    pub kind: ScalarKind,
    pub to_value: fn(&dyn Reflect) -> Option<Value>,
    pub from_value: fn(&Value) -> Result<Box<dyn Reflect>, String>,
}

pub struct OptionalAccess {
    pub inner: TypeKey,
    /// Outer `None` means the handle was not an `Option<inner>`.
    pub get: for<'a> fn(&'a dyn Reflect) -> Option<Option<&'a dyn Reflect>>,
    pub none: fn() -> Box<dyn Reflect>,
    pub some: fn(Box<dyn Reflect>) -> Option<Box<dyn Reflect>>,
}

pub struct ArrayAccess {
    pub element: TypeKey,
    pub len: fn(&dyn Reflect) -> Option<usize>,
    pub get: for<'a> fn(&'a dyn Reflect, usize) -> Option<&'a dyn Reflect>,
    /// Bulk clone into a native backing; `None` for non-primitive elements.
    pub native: fn(&dyn Reflect) -> Option<NativeArray>,
    /// Bulk conversion from a native backing of the same element type.
    pub from_native: fn(&NativeArray) -> Option<Box<dyn Reflect>>,
    pub build: fn(Vec<Box<dyn Reflect>>) -> Result<Box<dyn Reflect>, String>,
}

pub struct ListAccess {
    pub element: TypeKey,
    pub items: for<'a> fn(&'a dyn Reflect) -> Option<Vec<&'a dyn Reflect>>,
    pub collect: fn(Vec<Box<dyn Reflect>>) -> Result<Box<dyn Reflect>, String>,
}

type Getter = Box<dyn for<'a> Fn(&'a dyn Reflect) -> Option<&'a dyn Reflect> + Send + Sync>;
type Setter = Box<dyn Fn(&mut dyn Reflect, Box<dyn Reflect>) -> Result<(), String> + Send + Sync>;
type Factory = Box<dyn Fn() -> Box<dyn Reflect> + Send + Sync>;

pub struct StructAccess {
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) factory: Option<Factory>,
}

impl StructAccess {
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// A fresh instance whose fields will be assigned afterwards.
    pub(crate) fn construct(&self) -> Option<Box<dyn Reflect>> {
        self.factory.as_ref().map(|make| make())
    }
}

/// One field of a struct: its name, declared type, accessor pair, and any
/// per-field transform.
pub struct FieldDescriptor {
    name: &'static str,
    rename: Option<&'static str>,
    ty: TypeKey,
    get: Getter,
    set: Setter,
    transform: Option<Arc<dyn Transform>>,
    skip: bool,
}

// Pins the closure signature so the returned borrow is tied to the argument.
fn getter<G>(get: G) -> G
where
    G: for<'a> Fn(&'a dyn Reflect) -> Option<&'a dyn Reflect>,
{
    get
}

impl FieldDescriptor {
    pub fn new<S, F>(
        name: &'static str,
        get: impl for<'a> Fn(&'a S) -> &'a F + Send + Sync + 'static,
        set: impl Fn(&mut S, F) + Send + Sync + 'static,
    ) -> Self
    where
        S: Describe,
        F: Describe,
    {
        Self {
            name,
            rename: None,
            ty: TypeKey::of::<F>(),
            get: Box::new(getter(move |source| {
                source.downcast_ref::<S>().map(|owner| get(owner) as &dyn Reflect)
            })),
            set: Box::new(move |target: &mut dyn Reflect, value: Box<dyn Reflect>| {
                let owner = target
                    .downcast_mut::<S>()
                    .ok_or_else(|| format!("target is not `{}`", type_name::<S>()))?;
                let value = value.downcast::<F>().map_err(|found| {
                    format!("expected `{}`, found `{}`", type_name::<F>(), found.name())
                })?;
                set(owner, *value);
                Ok(())
            }),
            transform: None,
            skip: false,
        }
    }

    /// Use `key` instead of the field name in map nodes.
    pub fn renamed(mut self, key: &'static str) -> Self {
        self.rename = Some(key);
        self
    }

    /// Run `transform` on this field's value before the engine sees it.
    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Exclude the field from plans; deserialized instances keep the value
    /// the factory gave them.
    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The map-node key this field is written under.
    pub fn key(&self) -> &'static str {
        self.rename.unwrap_or(self.name)
    }

    pub fn ty(&self) -> TypeKey {
        self.ty
    }

    pub fn transform(&self) -> Option<&Arc<dyn Transform>> {
        self.transform.as_ref()
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    pub(crate) fn read<'a>(&self, source: &'a dyn Reflect) -> Option<&'a dyn Reflect> {
        (self.get)(source)
    }

    pub(crate) fn write(&self, target: &mut dyn Reflect, value: Box<dyn Reflect>) -> Result<(), String> {
        (self.set)(target, value)
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("key", &self.key())
            .field("ty", &self.ty)
            .field("skip", &self.skip)
            .finish()
    }
}

impl TypeDescriptor {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            interfaces: Vec::new(),
            transforms: Vec::new(),
        }
    }

    pub fn scalar<T: Scalar>() -> Self {
        Self::new(TypeKind::Scalar(ScalarAccess {
            kind: T::KIND,
            to_value: scalar_to_value::<T>,
            from_value: scalar_from_value::<T>,
        }))
    }

    pub fn value() -> Self {
        Self::new(TypeKind::Value)
    }

    pub fn opaque() -> Self {
        Self::new(TypeKind::Opaque)
    }

    pub fn optional<T: Describe>() -> Self {
        Self::new(TypeKind::Optional(OptionalAccess {
            inner: TypeKey::of::<T>(),
            get: option_get::<T>,
            none: option_none::<T>,
            some: option_some::<T>,
        }))
    }

    /// `Vec<T>` as an array.
    pub fn array<T: Describe>() -> Self {
        Self::new(TypeKind::Array(ArrayAccess {
            element: TypeKey::of::<T>(),
            len: vec_len::<T>,
            get: vec_get::<T>,
            native: vec_native,
            from_native: vec_from_native::<T>,
            build: vec_build::<T>,
        }))
    }

    /// A list-like collection `C` of `T`, declared as [`InterfaceId::LIST`].
    pub fn list<C, T>() -> Self
    where
        C: Describe + FromIterator<T>,
        T: Describe,
        for<'a> &'a C: IntoIterator<Item = &'a T>,
    {
        Self::new(TypeKind::List(ListAccess {
            element: TypeKey::of::<T>(),
            items: list_items::<C, T>,
            collect: list_collect::<C, T>,
        }))
        .implements(InterfaceId::LIST)
    }

    pub fn structure<S: Describe>() -> StructBuilder<S> {
        StructBuilder {
            fields: Vec::new(),
            factory: None,
            interfaces: Vec::new(),
            transforms: Vec::new(),
            marker: PhantomData,
        }
    }

    /// Declare an interface. Earlier declarations are more specific.
    pub fn implements(mut self, interface: InterfaceId) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Bind a type-level transform, applied after registry matches.
    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn interfaces(&self) -> &[InterfaceId] {
        &self.interfaces
    }
}

/// Builder for struct descriptors; fields keep declaration order.
pub struct StructBuilder<S> {
    fields: Vec<FieldDescriptor>,
    factory: Option<Factory>,
    interfaces: Vec<InterfaceId>,
    transforms: Vec<Arc<dyn Transform>>,
    marker: PhantomData<fn() -> S>,
}

impl<S: Describe> StructBuilder<S> {
    pub fn field<F: Describe>(
        mut self,
        name: &'static str,
        get: impl for<'a> Fn(&'a S) -> &'a F + Send + Sync + 'static,
        set: impl Fn(&mut S, F) + Send + Sync + 'static,
    ) -> Self {
        self.fields.push(FieldDescriptor::new(name, get, set));
        self
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// How to create an instance before its fields are known.
    pub fn factory(mut self, make: impl Fn() -> S + Send + Sync + 'static) -> Self {
        self.factory = Some(Box::new(move || Box::new(make()) as Box<dyn Reflect>));
        self
    }

    pub fn default_factory(self) -> Self
    where
        S: Default,
    {
        self.factory(S::default)
    }

    pub fn implements(mut self, interface: InterfaceId) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor {
            kind: TypeKind::Struct(StructAccess {
                fields: self.fields,
                factory: self.factory,
            }),
            interfaces: self.interfaces,
            transforms: self.transforms,
        }
    }
}

// ============================================================================
// Monomorphized accessors
// ============================================================================

fn scalar_to_value<T: Scalar>(source: &dyn Reflect) -> Option<Value> {
    source.downcast_ref::<T>().map(Scalar::to_value)
}

fn scalar_from_value<T: Scalar>(value: &Value) -> Result<Box<dyn Reflect>, String> {
    T::from_value(value).map(|v| Box::new(v) as Box<dyn Reflect>)
}

fn option_get<T: Describe>(source: &dyn Reflect) -> Option<Option<&dyn Reflect>> {
    source
        .downcast_ref::<Option<T>>()
        .map(|inner| inner.as_ref().map(|v| v as &dyn Reflect))
}

fn option_none<T: Describe>() -> Box<dyn Reflect> {
    Box::new(None::<T>)
}

fn option_some<T: Describe>(value: Box<dyn Reflect>) -> Option<Box<dyn Reflect>> {
    value
        .downcast::<T>()
        .ok()
        .map(|v| Box::new(Some(*v)) as Box<dyn Reflect>)
}

fn vec_len<T: Describe>(source: &dyn Reflect) -> Option<usize> {
    source.downcast_ref::<Vec<T>>().map(Vec::len)
}

fn vec_get<T: Describe>(source: &dyn Reflect, index: usize) -> Option<&dyn Reflect> {
    source
        .downcast_ref::<Vec<T>>()?
        .get(index)
        .map(|item| item as &dyn Reflect)
}

fn vec_native(source: &dyn Reflect) -> Option<NativeArray> {
    NativeArray::from_any(source.as_any())
}

fn vec_from_native<T: Describe>(native: &NativeArray) -> Option<Box<dyn Reflect>> {
    native.to_reflect(TypeId::of::<T>())
}

fn unbox_all<T: Describe>(items: Vec<Box<dyn Reflect>>) -> impl Iterator<Item = Result<T, String>> {
    items.into_iter().map(|item| {
        item.downcast::<T>()
            .map(|v| *v)
            .map_err(|found| format!("expected `{}` element, found `{}`", type_name::<T>(), found.name()))
    })
}

fn vec_build<T: Describe>(items: Vec<Box<dyn Reflect>>) -> Result<Box<dyn Reflect>, String> {
    let items = unbox_all::<T>(items).collect::<Result<Vec<T>, String>>()?;
    Ok(Box::new(items))
}

fn list_items<C, T>(source: &dyn Reflect) -> Option<Vec<&dyn Reflect>>
where
    C: Describe,
    T: Describe,
    for<'a> &'a C: IntoIterator<Item = &'a T>,
{
    source
        .downcast_ref::<C>()
        .map(|collection| collection.into_iter().map(|item| item as &dyn Reflect).collect())
}

fn list_collect<C, T>(items: Vec<Box<dyn Reflect>>) -> Result<Box<dyn Reflect>, String>
where
    C: Describe + FromIterator<T>,
    T: Describe,
{
    let collection = unbox_all::<T>(items).collect::<Result<C, String>>()?;
    Ok(Box::new(collection))
}

// ============================================================================
// Built-in descriptors
// ============================================================================

impl Describe for Value {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::value()
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::optional::<T>()
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::array::<T>()
    }
}

impl<T: Describe> Describe for VecDeque<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::list::<Self, T>()
    }
}

impl<T: Describe> Describe for LinkedList<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::list::<Self, T>()
    }
}

impl<T: Describe + Ord> Describe for BTreeSet<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::list::<Self, T>()
    }
}
