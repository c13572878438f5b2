//! Value tree → delimited text.
//!
//! The grammar is flat: a root sequence of scalars is one row, a root map is
//! one `key,value` row per entry, and a root sequence may hold maps or
//! sequences of scalars that become rows of their own. Anything nested deeper
//! is rejected with [`CsvError::UnsupportedNesting`].
//!
//! Encoding is iterative over an explicit token stack. Children of a compound
//! are pushed in source order and the pushed range is then reversed, so popping
//! yields them in source order again.
//!
//! # Example
//! ```
//! use marshal_core::Value;
//! use marshal_csv::CsvCodec;
//!
//! let tree = Value::from(serde_json::json!({"a": 1, "b": "x"}));
//! let text = CsvCodec::new().encode(&tree).unwrap();
//! assert_eq!(text, "\"a\",\"1\"\n\"b\",\"x\"\n");
//! ```

use std::io::{self, Write};
use std::ops::Range;

use log::{debug, trace};
use marshal_core::{Codec, MapNode, NativeArray, SeqNode, Value};
use parking_lot::Mutex;

use crate::config::CsvConfig;
use crate::error::{CsvError, Result};
use crate::literal;

/// Delimited-text codec. Encoding only; see [`CsvCodec::decode`].
///
/// Calls on one codec are serialized: each encode holds the codec's literal
/// buffer for its whole duration.
#[derive(Debug)]
pub struct CsvCodec {
    config: CsvConfig,
    literal: Mutex<String>,
}

impl CsvCodec {
    pub fn new() -> Self {
        Self::with_config(CsvConfig::default())
    }

    pub fn with_config(config: CsvConfig) -> Self {
        let literal = Mutex::new(String::with_capacity(config.literal_buffer_size));
        Self { config, literal }
    }

    pub fn config(&self) -> &CsvConfig {
        &self.config
    }

    /// Encode a tree into a string.
    pub fn encode(&self, value: &Value) -> Result<String> {
        let mut out = Vec::with_capacity(self.config.literal_buffer_size);
        self.encode_to(value, &mut out)?;
        String::from_utf8(out).map_err(|err| CsvError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
    }

    /// Encode a tree into `writer`. On error, rows already written stay
    /// written.
    pub fn encode_to<W: Write>(&self, value: &Value, mut writer: W) -> Result<()> {
        let mut literal = self.literal.lock();
        literal.clear();
        trace!("csv encode of a {} root", value.kind_name());

        let mut encoder = Encoder {
            config: &self.config,
            writer: &mut writer,
            stack: Vec::with_capacity(self.config.encode_stack_initial_size),
            literal: &mut literal,
        };
        encoder.run(value)?;
        writer.flush()?;
        Ok(())
    }

    /// Delimited-text decoding is not supported: always `Ok(None)`.
    pub fn decode(&self, input: &str) -> Result<Option<Value>> {
        debug!(
            "csv decode requested for {} byte(s); decoding is not supported",
            input.len()
        );
        Ok(None)
    }

    pub fn can_decode(&self) -> bool {
        false
    }
}

impl Default for CsvCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for CsvCodec {
    type Input = str;
    type Output = String;
    type Error = CsvError;

    fn encode(&self, value: &Value) -> Result<String> {
        CsvCodec::encode(self, value)
    }

    fn encode_to<W: Write>(&self, value: &Value, writer: W) -> Result<()> {
        CsvCodec::encode_to(self, value, writer)
    }

    fn decode(&self, input: &str) -> Result<Option<Value>> {
        CsvCodec::decode(self, input)
    }

    fn can_decode(&self) -> bool {
        CsvCodec::can_decode(self)
    }
}

/// Encode a tree with the default configuration.
pub fn encode(value: &Value) -> Result<String> {
    CsvCodec::new().encode(value)
}

// ============================================================================
// Token stack
// ============================================================================

enum Token<'v> {
    /// Fixed text: separators and terminators.
    Raw(&'static str),
    /// A span of the literal buffer holding rendered fields.
    Buffered(Range<usize>),
    /// A scalar field.
    Field(&'v Value),
    /// A map key, which may be compound when the config allows it.
    Key(&'v Value),
    /// The whole tree.
    Root(&'v Value),
    /// A compound child of the root sequence.
    Row(&'v Value),
}

struct Encoder<'c, 'v, W> {
    config: &'c CsvConfig,
    writer: W,
    stack: Vec<Token<'v>>,
    literal: &'c mut String,
}

impl<'c, 'v, W: Write> Encoder<'c, 'v, W> {
    fn run(&mut self, root: &'v Value) -> Result<()> {
        self.stack.push(Token::Root(root));
        while let Some(token) = self.stack.pop() {
            match token {
                Token::Raw(text) => self.writer.write_all(text.as_bytes())?,
                Token::Buffered(span) => self.writer.write_all(self.literal[span].as_bytes())?,
                Token::Field(value) => self.write_scratch(|out, config| literal::write_literal(out, value, config))?,
                Token::Key(key) => self.write_key(key)?,
                Token::Root(value) => self.expand_root(value)?,
                Token::Row(value) => self.expand_row(value)?,
            }
        }
        Ok(())
    }

    fn expand_root(&mut self, value: &'v Value) -> Result<()> {
        match value {
            Value::Seq(seq) => self.expand_root_seq(seq),
            Value::Map(map) => self.push_entries(map),
            scalar => {
                let start = self.stack.len();
                self.stack.push(Token::Field(scalar));
                self.stack.push(Token::Raw(self.config.terminator()));
                self.stack[start..].reverse();
                Ok(())
            }
        }
    }

    /// Runs of consecutive scalars become one row each; compound elements
    /// become rows of their own.
    fn expand_root_seq(&mut self, seq: &'v SeqNode) -> Result<()> {
        if let Some(native) = seq.native() {
            return self.write_native_row(native);
        }
        let items = seq.as_slice().unwrap_or_default();
        if items.is_empty() {
            return self.write_empty_row();
        }

        let start = self.stack.len();
        let mut run: Option<usize> = None;
        for item in items {
            if item.is_compound() {
                self.flush_run(&mut run);
                self.stack.push(Token::Row(item));
                continue;
            }
            match run {
                Some(_) => self.literal.push_str(self.config.separator()),
                None => run = Some(self.literal.len()),
            }
            literal::write_literal(self.literal, item, self.config)?;
        }
        self.flush_run(&mut run);
        self.stack[start..].reverse();
        Ok(())
    }

    fn flush_run(&mut self, run: &mut Option<usize>) {
        if let Some(begin) = run.take() {
            self.literal.push_str(self.config.terminator());
            self.stack.push(Token::Buffered(begin..self.literal.len()));
        }
    }

    fn expand_row(&mut self, value: &'v Value) -> Result<()> {
        match value {
            Value::Map(map) => self.push_entries(map),
            Value::Seq(seq) => {
                if let Some(native) = seq.native() {
                    return self.write_native_row(native);
                }
                let items = seq.as_slice().unwrap_or_default();
                if items.iter().any(Value::is_compound) {
                    return Err(CsvError::UnsupportedNesting {
                        context: "compound element inside a row",
                    });
                }
                if items.is_empty() {
                    return self.write_empty_row();
                }
                self.write_scratch(|out, config| {
                    for (index, item) in items.iter().enumerate() {
                        if index > 0 {
                            out.push_str(config.separator());
                        }
                        literal::write_literal(out, item, config)?;
                    }
                    out.push_str(config.terminator());
                    Ok(())
                })
            }
            scalar => self.write_scratch(|out, config| {
                literal::write_literal(out, scalar, config)?;
                out.push_str(config.terminator());
                Ok(())
            }),
        }
    }

    /// One `key<sep>value<terminator>` row per entry. An empty map emits
    /// nothing.
    fn push_entries(&mut self, map: &'v MapNode) -> Result<()> {
        let start = self.stack.len();
        for (key, value) in map {
            if value.is_compound() {
                return Err(CsvError::UnsupportedNesting {
                    context: "compound map value",
                });
            }
            if key.is_compound() && !self.config.allow_compound_keys {
                return Err(CsvError::CompoundKey);
            }
            self.stack.push(Token::Key(key));
            self.stack.push(Token::Raw(self.config.separator()));
            self.stack.push(Token::Field(value));
            self.stack.push(Token::Raw(self.config.terminator()));
        }
        self.stack[start..].reverse();
        Ok(())
    }

    fn write_key(&mut self, key: &Value) -> Result<()> {
        if key.is_compound() {
            let json = serde_json::to_string(key)?;
            return self.write_scratch(|out, _| {
                literal::escape_into(out, &json);
                Ok(())
            });
        }
        self.write_scratch(|out, config| literal::write_literal(out, key, config))
    }

    fn write_native_row(&mut self, native: &NativeArray) -> Result<()> {
        if native.is_empty() {
            return self.write_empty_row();
        }
        trace!("csv fast path: {} {} element(s)", native.len(), native.kind());
        self.write_scratch(|out, config| {
            literal::write_native(out, native, config);
            out.push_str(config.terminator());
            Ok(())
        })
    }

    fn write_empty_row(&mut self) -> Result<()> {
        if !self.config.skip_empty_rows {
            self.writer.write_all(self.config.terminator().as_bytes())?;
        }
        Ok(())
    }

    /// Render into the tail of the literal buffer, write it, and drop it
    /// again. Spans already pushed as `Buffered` tokens are left intact.
    fn write_scratch(&mut self, render: impl FnOnce(&mut String, &CsvConfig) -> Result<()>) -> Result<()> {
        let start = self.literal.len();
        let rendered = render(&mut *self.literal, self.config);
        if rendered.is_ok() {
            self.writer.write_all(self.literal[start..].as_bytes())?;
        }
        self.literal.truncate(start);
        rendered
    }
}
