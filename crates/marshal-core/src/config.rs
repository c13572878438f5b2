//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document is enough:
//!
//! ```
//! use marshal_core::{ListPolicy, MarshalConfig};
//!
//! let config = MarshalConfig::from_json(r#"{"list_policy": "type_wrapped"}"#).unwrap();
//! assert_eq!(config.list_policy, ListPolicy::TypeWrapped);
//! assert_eq!(config.value_stack_initial_size, 512);
//! ```

use serde::{Deserialize, Serialize};

/// How the default list transform stores collection elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListPolicy {
    /// Store each element's value directly.
    #[default]
    Plain,
    /// Store each element as `{"type": <element type>, "value": <element>}`.
    TypeWrapped,
}

/// Tuning and behaviour switches for a [`Marshaller`](crate::Marshaller).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarshalConfig {
    /// Initial capacity of the pending-node arena of each traversal.
    pub value_stack_initial_size: usize,
    /// Initial capacity of each of the three frame stacks.
    pub context_stack_initial_size: usize,
    /// Element policy of the default list transform.
    pub list_policy: ListPolicy,
    /// Bulk-copy one-dimensional primitive arrays instead of walking them
    /// element by element.
    pub native_fast_path: bool,
}

impl Default for MarshalConfig {
    fn default() -> Self {
        Self {
            value_stack_initial_size: 512,
            context_stack_initial_size: 128,
            list_policy: ListPolicy::Plain,
            native_fast_path: true,
        }
    }
}

impl MarshalConfig {
    /// Parse a config from JSON; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
