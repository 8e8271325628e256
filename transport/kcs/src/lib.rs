// Licensed under the Apache-2.0 license

//! KCS (Keyboard Controller Style) transport binding for IPMI.
//!
//! Implements the write and read transfer flows of IPMI specification
//! 2.0 section 9 over a pluggable register-access backend, so the same
//! flow drives legacy port I/O, memory-mapped hardware, or a software
//! device model in tests.

pub mod io;
pub mod transport;
