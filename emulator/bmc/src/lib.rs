// Licensed under the Apache-2.0 license

//! Software BMC used by transport and dispatcher tests.
//!
//! The KCS device model answers at the register level, so the host-side
//! transport exercises the real byte-by-byte transfer flows rather than
//! a shortcut mock. Responders supply the BMC-side command behavior.

pub mod kcs_device;
pub mod mctp_channel;
pub mod responder;
