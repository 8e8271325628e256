// Licensed under the Apache-2.0 license

//! Manageability transport dispatch layer.
//!
//! Firmware submits management commands (IPMI, PLDM, ASF) through a
//! [`dispatcher::CommandDispatcher`] without knowing which hardware
//! channel carries them. Transport bindings implement
//! [`binding::ManageabilityTransport`] and are looked up per protocol
//! family in a [`registry::TransportRegistry`] owned by the firmware
//! phase that initialized them.

pub mod binding;
pub mod dispatcher;
pub mod health;
pub mod registry;
