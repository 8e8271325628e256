// Licensed under the Apache-2.0 license

use mgmt_dispatch::binding::TransportError;

/// One MCTP packet channel between two endpoints. Implementations own
/// the bus access and packetization; the transport above deals only in
/// whole MCTP payloads.
pub trait MctpChannel {
    /// Polls whether the channel can accept a packet.
    fn is_open(&mut self) -> bool;

    fn send_packet(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Receives one packet into `buf`, returning its length.
    fn receive_packet(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}
