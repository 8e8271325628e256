// Licensed under the Apache-2.0 license

use crate::binding::{ManageabilityTransport, ProtocolFamily, PROTOCOL_FAMILY_COUNT};
use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a binding is already registered for this protocol family")]
    AlreadyRegistered,
    #[error("binding does not support the protocol family")]
    ProtocolMismatch,
}

/// Maps each protocol family to its active transport binding.
///
/// The registry is an explicitly owned context, not a global: the
/// firmware-phase init routine creates it, registers bindings, and
/// hands references to whoever dispatches commands.
///
/// Writer invariant: registration happens only during phase init, on
/// the single thread of control, before the phase's ready milestone.
/// The `&mut self`/`&self` split checks this within one phase; a
/// multi-core or async reimplementation must wrap the registry in a
/// lock.
pub struct TransportRegistry {
    bindings: [Option<Box<dyn ManageabilityTransport>>; PROTOCOL_FAMILY_COUNT],
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self {
            bindings: [None, None, None],
        }
    }

    /// Registers `binding` for `family`. Fails with `AlreadyRegistered`
    /// if the slot is occupied; use [`Self::register_override`] to
    /// replace deliberately.
    pub fn register(
        &mut self,
        family: ProtocolFamily,
        binding: Box<dyn ManageabilityTransport>,
    ) -> Result<(), RegistryError> {
        if self.bindings[family.index()].is_some() {
            warn!("Transport already registered for {:?}", family);
            return Err(RegistryError::AlreadyRegistered);
        }
        self.install(family, binding)
    }

    /// Replaces whatever binding `family` currently has. Used when a
    /// later firmware phase supersedes an early-phase binding.
    pub fn register_override(
        &mut self,
        family: ProtocolFamily,
        binding: Box<dyn ManageabilityTransport>,
    ) -> Result<(), RegistryError> {
        self.install(family, binding)
    }

    fn install(
        &mut self,
        family: ProtocolFamily,
        binding: Box<dyn ManageabilityTransport>,
    ) -> Result<(), RegistryError> {
        if !binding.supports(family) {
            return Err(RegistryError::ProtocolMismatch);
        }
        debug!(
            "Registering {:?} transport on {:?}",
            family,
            binding.channel()
        );
        self.bindings[family.index()] = Some(binding);
        Ok(())
    }

    /// Drops the binding for `family`, if any. Called at the phase
    /// teardown event for bindings that do not survive into runtime.
    pub fn unregister(&mut self, family: ProtocolFamily) {
        self.bindings[family.index()] = None;
    }

    pub fn is_registered(&self, family: ProtocolFamily) -> bool {
        self.bindings[family.index()].is_some()
    }

    pub fn resolve(&self, family: ProtocolFamily) -> Option<&dyn ManageabilityTransport> {
        self.bindings[family.index()].as_deref()
    }

    pub fn resolve_mut(
        &mut self,
        family: ProtocolFamily,
    ) -> Option<&mut (dyn ManageabilityTransport + 'static)> {
        self.bindings[family.index()].as_deref_mut()
    }
}
