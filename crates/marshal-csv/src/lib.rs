//! # marshal-csv
//!
//! Delimited-text encoder for [`marshal_core`] value trees.
//!
//! A tree is laid out as rows: a sequence of scalars becomes one row, a map
//! becomes one `key,value` row per entry, and a top-level sequence may carry
//! maps or scalar sequences that each become rows of their own. Scalars are
//! quoted string literals, with the exception of sequences backed by a
//! primitive array, which are written bare on a fast path.
//!
//! Decoding is not supported.
//!
//! ## Quick start
//!
//! ```rust
//! use marshal_core::{Marshaller, Value};
//! use marshal_csv::{encode, CsvCodec, CsvConfig};
//!
//! // Primitive arrays take the bare fast path.
//! let tree = Marshaller::new().serialize(&vec![1i32, 2, 3]).unwrap();
//! assert_eq!(encode(&tree).unwrap(), "1,2,3\n");
//!
//! // General values are quoted.
//! let row = Value::from(serde_json::json!([1, "a\"b", null]));
//! assert_eq!(encode(&row).unwrap(), "\"1\",\"a\\\"b\",null\n");
//!
//! let codec = CsvCodec::with_config(CsvConfig::default().with_space_after_separator(true));
//! assert_eq!(codec.encode(&tree).unwrap(), "1, 2, 3\n");
//! ```
//!
//! ## Modules
//!
//! - [`encoder`] — `CsvCodec`: value tree → delimited text
//! - [`literal`] — scalar formatting and string escaping
//! - [`config`] — `CsvConfig`
//! - [`error`] — `CsvError`

pub mod config;
pub mod encoder;
pub mod error;
pub mod literal;

pub use config::CsvConfig;
pub use encoder::{encode, CsvCodec};
pub use error::{CsvError, Result};
pub use literal::escape_into;
