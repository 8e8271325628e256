// Licensed under the Apache-2.0 license

//! MCTP transport binding carrying PLDM messages.
//!
//! PLDM rides MCTP behind a one-byte common header holding the message
//! type discriminator. This binding frames and unframes that header
//! around a pluggable packet channel (I2C/I3C/SMBus hardware in
//! firmware, a loopback device in tests).

pub mod channel;
pub mod transport;
