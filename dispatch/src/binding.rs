// Licensed under the Apache-2.0 license

use thiserror::Error;

/// Management protocol families a binding can carry. One active binding
/// per family at a time; the registry enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolFamily {
    Ipmi,
    Pldm,
    Asf,
}

pub const PROTOCOL_FAMILY_COUNT: usize = 3;

impl ProtocolFamily {
    pub(crate) fn index(&self) -> usize {
        match self {
            ProtocolFamily::Ipmi => 0,
            ProtocolFamily::Pldm => 1,
            ProtocolFamily::Asf => 2,
        }
    }
}

/// Lifecycle of a transport binding. `Busy` is held only while exactly
/// one command is in flight on the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Uninitialized,
    Ready,
    Busy,
    Error,
}

/// Where a binding talks. Purely descriptive; the binding owns the
/// actual access path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDescriptor {
    /// Legacy I/O port pair (data, command/status).
    IoPort(u16),
    /// Memory-mapped register block base.
    Mmio(u64),
    /// MCTP endpoint pair.
    MctpEndpoint { local_eid: u8, remote_eid: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport busy")]
    Busy,
    #[error("transport timed out")]
    Timeout,
    #[error("transport hardware fault")]
    DeviceError,
    #[error("operation not supported by transport")]
    Unsupported,
}

/// Byte-level send/receive over one hardware channel.
///
/// Implementations perform port or memory-mapped I/O and may block, but
/// only behind a bounded poll budget: a wait that exhausts its budget
/// returns [`TransportError::Timeout`] rather than spinning forever.
/// Firmware phases have no scheduler to preempt a stuck loop.
pub trait ManageabilityTransport {
    /// Capability check, replacing GUID comparison on protocol
    /// structures: can this binding carry `family` traffic?
    fn supports(&self, family: ProtocolFamily) -> bool;

    fn channel(&self) -> ChannelDescriptor;

    fn state(&self) -> BindingState;

    /// Polls the channel once for readiness to accept a request.
    fn is_ready(&mut self) -> bool;

    /// Sends one complete request frame.
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Receives one complete response frame into `buf`, returning the
    /// byte count. A frame longer than `buf` is an implementation
    /// choice between truncation and `DeviceError`; the dispatcher
    /// sizes its buffer to the transport maximum so neither occurs in
    /// practice.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}
