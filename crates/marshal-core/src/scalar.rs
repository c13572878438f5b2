//! The closed set of scalar kinds and their value conversions.
//!
//! Conversions out of a [`Value`] coerce within a family: any integer value
//! that fits converts to any integer type, integers widen to floats, and a
//! `char` accepts a one-character string or a code point. Anything else is a
//! type mismatch reported as a plain reason string; the engine attaches the
//! target type name.

use std::fmt;

use crate::describe::{Describe, TypeDescriptor};
use crate::value::Value;

/// Scalar kinds the engine stops at instead of expanding structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
}

impl ScalarKind {
    /// Whether a one-dimensional `Vec` of this kind can back a native sequence.
    pub fn is_native(self) -> bool {
        !matches!(self, ScalarKind::String)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Char => "char",
            ScalarKind::String => "String",
        };
        f.write_str(name)
    }
}

/// A type the engine treats as a leaf.
pub trait Scalar: Describe + Sized {
    const KIND: ScalarKind;

    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Result<Self, String>;
}

fn mismatch(value: &Value, kind: ScalarKind) -> String {
    format!("expected {kind}, found {}", value.kind_name())
}

fn out_of_range(value: &Value, kind: ScalarKind) -> String {
    format!("{value:?} is out of range for {kind}")
}

macro_rules! integer_scalar {
    ($($ty:ty => $kind:ident, $variant:ident, $wide:ty);* $(;)?) => {
        $(
            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                fn to_value(&self) -> Value {
                    Value::$variant(<$wide>::from(*self))
                }

                fn from_value(value: &Value) -> Result<Self, String> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(*i).map_err(|_| out_of_range(value, Self::KIND)),
                        Value::UInt(u) => <$ty>::try_from(*u).map_err(|_| out_of_range(value, Self::KIND)),
                        other => Err(mismatch(other, Self::KIND)),
                    }
                }
            }

            impl Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::scalar::<Self>()
                }
            }
        )*
    };
}

integer_scalar! {
    i8 => I8, Int, i64;
    i16 => I16, Int, i64;
    i32 => I32, Int, i64;
    i64 => I64, Int, i64;
    u8 => U8, UInt, u64;
    u16 => U16, UInt, u64;
    u32 => U32, UInt, u64;
    u64 => U64, UInt, u64;
}

macro_rules! float_scalar {
    ($($ty:ty => $kind:ident);* $(;)?) => {
        $(
            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                fn to_value(&self) -> Value {
                    Value::Float(f64::from(*self))
                }

                fn from_value(value: &Value) -> Result<Self, String> {
                    match value {
                        Value::Float(f) => {
                            let narrowed = *f as $ty;
                            if f.is_finite() && !narrowed.is_finite() {
                                return Err(out_of_range(value, Self::KIND));
                            }
                            Ok(narrowed)
                        }
                        Value::Int(i) => Ok(*i as $ty),
                        Value::UInt(u) => Ok(*u as $ty),
                        other => Err(mismatch(other, Self::KIND)),
                    }
                }
            }

            impl Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::scalar::<Self>()
                }
            }
        )*
    };
}

float_scalar! {
    f32 => F32;
    f64 => F64;
}

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        value.as_bool().ok_or_else(|| mismatch(value, Self::KIND))
    }
}

impl Describe for bool {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::scalar::<Self>()
    }
}

impl Scalar for char {
    const KIND: ScalarKind = ScalarKind::Char;

    fn to_value(&self) -> Value {
        Value::Char(*self)
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Char(c) => Ok(*c),
            Value::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(format!("expected a one-character string, found {s:?}")),
                }
            }
            Value::Int(_) | Value::UInt(_) => value
                .as_i64()
                .and_then(|code| u32::try_from(code).ok())
                .and_then(char::from_u32)
                .ok_or_else(|| out_of_range(value, Self::KIND)),
            other => Err(mismatch(other, Self::KIND)),
        }
    }
}

impl Describe for char {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::scalar::<Self>()
    }
}

impl Scalar for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Char(c) => Ok(c.to_string()),
            other => Err(mismatch(other, Self::KIND)),
        }
    }
}

impl Describe for String {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::scalar::<Self>()
    }
}
