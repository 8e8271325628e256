// Licensed under the Apache-2.0 license

use zerocopy::{FromBytes, Immutable, IntoBytes};

#[derive(Debug, PartialEq)]
pub enum PldmCodecError {
    BufferTooShort,
    Unsupported,
}

/// Bit-exact encoding and decoding of PLDM messages to and from a wire
/// buffer.
pub trait PldmCodec: core::fmt::Debug + Sized {
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, PldmCodecError>;

    fn decode(buffer: &[u8]) -> Result<Self, PldmCodecError>;
}

// Messages that derive the zerocopy marker traits get the codec for free.
impl<T> PldmCodec for T
where
    T: core::fmt::Debug + Sized + FromBytes + IntoBytes + Immutable,
{
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, PldmCodecError> {
        self.write_to_prefix(buffer)
            .map_err(|_| PldmCodecError::BufferTooShort)
            .map(|_| core::mem::size_of::<T>())
    }

    fn decode(buffer: &[u8]) -> Result<Self, PldmCodecError> {
        Ok(Self::read_from_prefix(buffer)
            .map_err(|_| PldmCodecError::BufferTooShort)?
            .0)
    }
}
