//! The boundary between finished value trees and a wire medium.

use std::io;

use crate::value::Value;

/// A wire format that consumes and produces [`Value`] trees.
///
/// Codecs never see source objects; the [`Marshaller`](crate::Marshaller)
/// hands them a completed tree.
pub trait Codec {
    /// Encoded form accepted by [`decode`](Codec::decode), e.g. `str`.
    type Input: ?Sized;
    /// Encoded form returned by [`encode`](Codec::encode), e.g. `String`.
    type Output;
    type Error: std::error::Error;

    fn encode(&self, value: &Value) -> Result<Self::Output, Self::Error>;

    /// Encode straight into a caller-supplied writer.
    fn encode_to<W: io::Write>(&self, value: &Value, writer: W) -> Result<(), Self::Error>;

    /// Decode a tree. `Ok(None)` means the codec cannot decode; check
    /// [`can_decode`](Codec::can_decode) to tell that apart from empty input.
    fn decode(&self, input: &Self::Input) -> Result<Option<Value>, Self::Error>;

    fn can_decode(&self) -> bool {
        true
    }
}
