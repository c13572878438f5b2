//! Encoder configuration.

use serde::{Deserialize, Serialize};

/// Settings for a [`CsvCodec`](crate::CsvCodec).
///
/// The sizes are capacity hints only. All flags default to `false`, which
/// gives comma separators, `\n` row terminators and bare `null` tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// Initial capacity of the encoder's token stack.
    pub encode_stack_initial_size: usize,
    /// Initial capacity of the literal buffer fields are rendered into.
    pub literal_buffer_size: usize,
    /// Reserved for a decoder. Nothing reads it while decoding is
    /// unsupported.
    pub decode_stack_initial_size: usize,
    /// Accept map and sequence keys, rendered as quoted JSON text.
    pub allow_compound_keys: bool,
    /// Render characters as one-character strings instead of code points.
    pub char_as_string: bool,
    /// Render `Null` as `""` instead of `null`.
    pub null_as_empty_string: bool,
    /// Emit nothing for an empty row instead of a bare terminator.
    pub skip_empty_rows: bool,
    /// Follow each field separator with a space.
    pub space_after_separator: bool,
    /// Terminate rows with `\r` instead of `\n`.
    pub carriage_return_terminator: bool,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            encode_stack_initial_size: 128,
            literal_buffer_size: 1024,
            decode_stack_initial_size: 128,
            allow_compound_keys: false,
            char_as_string: false,
            null_as_empty_string: false,
            skip_empty_rows: false,
            space_after_separator: false,
            carriage_return_terminator: false,
        }
    }
}

impl CsvConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_encode_stack_initial_size(mut self, size: usize) -> Self {
        self.encode_stack_initial_size = size;
        self
    }

    pub fn with_literal_buffer_size(mut self, size: usize) -> Self {
        self.literal_buffer_size = size;
        self
    }

    pub fn with_decode_stack_initial_size(mut self, size: usize) -> Self {
        self.decode_stack_initial_size = size;
        self
    }

    pub fn with_compound_keys(mut self, allow: bool) -> Self {
        self.allow_compound_keys = allow;
        self
    }

    pub fn with_char_as_string(mut self, enabled: bool) -> Self {
        self.char_as_string = enabled;
        self
    }

    pub fn with_null_as_empty_string(mut self, enabled: bool) -> Self {
        self.null_as_empty_string = enabled;
        self
    }

    pub fn with_skip_empty_rows(mut self, enabled: bool) -> Self {
        self.skip_empty_rows = enabled;
        self
    }

    pub fn with_space_after_separator(mut self, enabled: bool) -> Self {
        self.space_after_separator = enabled;
        self
    }

    pub fn with_carriage_return_terminator(mut self, enabled: bool) -> Self {
        self.carriage_return_terminator = enabled;
        self
    }

    /// Text between two fields of a row.
    pub fn separator(&self) -> &'static str {
        if self.space_after_separator {
            ", "
        } else {
            ","
        }
    }

    /// Text after the last field of a row.
    pub fn terminator(&self) -> &'static str {
        if self.carriage_return_terminator {
            "\r"
        } else {
            "\n"
        }
    }
}
