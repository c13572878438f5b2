//! Error types for plan compilation and object-graph traversal.

use thiserror::Error;

use crate::engine::EngineState;

/// Errors that can occur while compiling type plans or marshaling values.
///
/// Every variant aborts the whole top-level call; the engine never returns a
/// partially populated tree or object.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarshalError {
    /// A type plan could not be built. The failure is cached, so later
    /// lookups for the same type return it again without recompiling.
    #[error("cannot compile type plan for `{type_name}`: {reason}")]
    Compile { type_name: String, reason: String },

    /// A serialize was requested while the engine was deserializing, or the
    /// reverse.
    #[error("cannot start {requested}: engine is {current}")]
    Busy {
        requested: EngineState,
        current: EngineState,
    },

    /// A traversal-time failure on the object → tree path.
    #[error("cannot serialize `{type_name}`: {reason}")]
    Serialize { type_name: String, reason: String },

    /// A traversal-time failure on the tree → object path.
    #[error("cannot deserialize `{type_name}`: {reason}")]
    Deserialize { type_name: String, reason: String },

    /// The value handed to a frame does not match what the frame was pushed
    /// to expect. Always fatal.
    #[error("corrupted traversal state: expected {expected}, found {found}")]
    CorruptedTraversal { expected: String, found: String },
}

impl MarshalError {
    pub fn compile(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Compile {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub fn serialize(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Serialize {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub fn deserialize(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Deserialize {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub fn corrupted(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::CorruptedTraversal {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// True for plan compilation failures.
    pub fn is_compile(&self) -> bool {
        matches!(self, Self::Compile { .. })
    }

    /// True when the call was rejected because the engine was busy with a
    /// traversal of the opposite kind.
    pub fn is_state_conflict(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }

    /// True for structural-invariant violations.
    pub fn is_corrupted_traversal(&self) -> bool {
        matches!(self, Self::CorruptedTraversal { .. })
    }
}

/// Convenience alias used throughout marshal-core.
pub type Result<T> = std::result::Result<T, MarshalError>;
