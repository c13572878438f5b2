//! Primitive-array backing for natively stored sequences.
//!
//! A [`NativeArray`] owns a one-dimensional `Vec` of a primitive scalar kind.
//! The engine bulk-copies a source `Vec<primitive>` into one in a single pass
//! instead of pushing a frame per element, and bulk-converts it back when the
//! deserialize target has the same element type.

use std::any::{Any, TypeId};

use crate::describe::Reflect;
use crate::scalar::ScalarKind;
use crate::value::Value;

macro_rules! native_array {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// A primitive vector stored without per-element boxing.
        #[derive(Debug, Clone)]
        pub enum NativeArray {
            $($variant(Vec<$ty>),)*
        }

        impl NativeArray {
            pub fn len(&self) -> usize {
                match self {
                    $(NativeArray::$variant(items) => items.len(),)*
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// The scalar kind of every element.
            pub fn kind(&self) -> ScalarKind {
                match self {
                    $(NativeArray::$variant(_) => ScalarKind::$variant,)*
                }
            }

            /// Element at `index`, materialized as a scalar value.
            pub fn get(&self, index: usize) -> Option<Value> {
                match self {
                    $(NativeArray::$variant(items) => items.get(index).map(|item| Value::from(*item)),)*
                }
            }

            /// Every element, materialized as scalar values.
            pub fn to_values(&self) -> Vec<Value> {
                match self {
                    $(NativeArray::$variant(items) => items.iter().map(|item| Value::from(*item)).collect(),)*
                }
            }

            /// Bulk-clone `source` when it is a `Vec` of a primitive kind.
            pub fn from_any(source: &dyn Any) -> Option<Self> {
                $(
                    if let Some(items) = source.downcast_ref::<Vec<$ty>>() {
                        return Some(NativeArray::$variant(items.clone()));
                    }
                )*
                None
            }

            /// Bulk-convert back into a `Vec` whose element type is `element`.
            /// Returns `None` when the element type differs from the stored kind.
            pub fn to_reflect(&self, element: TypeId) -> Option<Box<dyn Reflect>> {
                match self {
                    $(
                        NativeArray::$variant(items) if element == TypeId::of::<$ty>() => {
                            Some(Box::new(items.clone()))
                        }
                    )*
                    _ => None,
                }
            }
        }

        $(
            impl From<Vec<$ty>> for NativeArray {
                fn from(items: Vec<$ty>) -> Self {
                    NativeArray::$variant(items)
                }
            }
        )*
    };
}

native_array! {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
}
