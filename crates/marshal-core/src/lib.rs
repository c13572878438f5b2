//! # marshal-core
//!
//! Iterative object-graph marshaling: converts Rust object graphs into a small
//! intermediate tree of maps, sequences and scalars, and back.
//!
//! The engine never recurses on the call stack. Each traversal keeps three
//! aligned stacks (source, destination node, type plan) and alternates between
//! preparing a value and draining pending frames, so graphs of any depth are
//! handled in constant stack space. Per-type plans are compiled on first use
//! and cached on the engine; transforms registered per type or per interface
//! can rewrite values before the structural logic sees them.
//!
//! ## Quick start
//!
//! ```rust
//! use marshal_core::{Describe, Marshaller, TypeDescriptor, Value};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//!     label: Option<String>,
//! }
//!
//! impl Describe for Point {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::structure::<Self>()
//!             .field("x", |p: &Point| &p.x, |p: &mut Point, v| p.x = v)
//!             .field("y", |p: &Point| &p.y, |p: &mut Point, v| p.y = v)
//!             .field("label", |p: &Point| &p.label, |p: &mut Point, v| p.label = v)
//!             .default_factory()
//!             .build()
//!     }
//! }
//!
//! let engine = Marshaller::new();
//! let point = Point { x: 3, y: -4, label: None };
//!
//! let tree = engine.serialize(&point).unwrap();
//! let map = tree.as_map().unwrap();
//! assert_eq!(map.get_str("x"), Some(&Value::Int(3)));
//! assert_eq!(map.get_str("label"), Some(&Value::Null));
//!
//! let back: Point = engine.deserialize(&tree).unwrap();
//! assert_eq!(back, point);
//! ```
//!
//! ## Modules
//!
//! - [`value`] — `Value`, `MapNode`, `SeqNode`: the intermediate tree
//! - [`native`] — `NativeArray`, primitive backing for sequences
//! - [`scalar`] — scalar kinds and their value conversions
//! - [`describe`] — `Describe` / `Reflect`, type descriptors and field accessors
//! - [`plan`] — compiled `TypePlan`s and the engine's `PlanCache`
//! - [`transform`] — `Transform`, the registry, and the default `ListTransform`
//! - [`engine`] — `Marshaller`, its builder and state gate
//! - [`config`] — `MarshalConfig`
//! - [`codec`] — the `Codec` trait wire formats implement
//! - [`error`] — `MarshalError`

pub mod codec;
pub mod config;
mod deserialize;
pub mod describe;
pub mod engine;
pub mod error;
pub mod native;
pub mod plan;
pub mod scalar;
mod serialize;
pub mod transform;
pub mod value;

pub use codec::Codec;
pub use config::{ListPolicy, MarshalConfig};
pub use describe::{Describe, FieldDescriptor, InterfaceId, Reflect, StructBuilder, TypeDescriptor, TypeKey, TypeKind};
pub use engine::{EngineState, Marshaller, MarshallerBuilder};
pub use error::{MarshalError, Result};
pub use native::NativeArray;
pub use plan::{PlanCache, TypePlan};
pub use scalar::{Scalar, ScalarKind};
pub use transform::{ListTransform, Node, Operand, Transform, TransformRegistry};
pub use value::{MapNode, SeqNode, Value};
