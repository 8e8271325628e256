// Licensed under the Apache-2.0 license

use zerocopy::{FromBytes, Immutable, IntoBytes};

#[derive(Debug, PartialEq)]
pub enum IpmiCodecError {
    BufferTooShort,
    Unsupported,
}

/// Encoding and decoding of fixed-layout IPMI message structures.
///
/// A message serializes to the exact byte layout the BMC expects on the
/// wire; nothing here depends on the native in-memory representation
/// beyond what the zerocopy traits guarantee.
pub trait IpmiCodec: core::fmt::Debug + Sized {
    /// Writes the message into `buffer`, returning the encoded size.
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, IpmiCodecError>;

    /// Reads a message back from the front of `buffer`.
    fn decode(buffer: &[u8]) -> Result<Self, IpmiCodecError>;
}

// Blanket implementation for message structs that derive the zerocopy
// marker traits.
impl<T> IpmiCodec for T
where
    T: core::fmt::Debug + Sized + FromBytes + IntoBytes + Immutable,
{
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, IpmiCodecError> {
        self.write_to_prefix(buffer)
            .map_err(|_| IpmiCodecError::BufferTooShort)
            .map(|_| core::mem::size_of::<T>())
    }

    fn decode(buffer: &[u8]) -> Result<Self, IpmiCodecError> {
        Ok(Self::read_from_prefix(buffer)
            .map_err(|_| IpmiCodecError::BufferTooShort)?
            .0)
    }
}
