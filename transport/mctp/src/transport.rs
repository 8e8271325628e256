// Licensed under the Apache-2.0 license

use crate::channel::MctpChannel;
use log::{debug, error};
use mgmt_config::MctpEndpointConfig;
use mgmt_dispatch::binding::{
    BindingState, ChannelDescriptor, ManageabilityTransport, ProtocolFamily, TransportError,
};
use mgmt_dispatch::dispatcher::MAX_MGMT_PAYLOAD_SIZE;
use pldm_common::mctp::{pldm_msg_from_mctp, pldm_msg_into_mctp, MCTP_COMMON_HEADER_LEN};
use pldm_common::protocol::base::PLDM_MSG_HEADER_LEN;

const MAX_MCTP_FRAME_SIZE: usize =
    MCTP_COMMON_HEADER_LEN + PLDM_MSG_HEADER_LEN + MAX_MGMT_PAYLOAD_SIZE;

/// PLDM-over-MCTP transport binding.
pub struct MctpTransport<C: MctpChannel> {
    channel: C,
    endpoints: MctpEndpointConfig,
    state: BindingState,
}

impl<C: MctpChannel> MctpTransport<C> {
    pub fn new(channel: C, endpoints: MctpEndpointConfig) -> Self {
        Self {
            channel,
            endpoints,
            state: BindingState::Ready,
        }
    }
}

impl<C: MctpChannel> ManageabilityTransport for MctpTransport<C> {
    fn supports(&self, family: ProtocolFamily) -> bool {
        family == ProtocolFamily::Pldm
    }

    fn channel(&self) -> ChannelDescriptor {
        ChannelDescriptor::MctpEndpoint {
            local_eid: self.endpoints.local_eid,
            remote_eid: self.endpoints.remote_eid,
        }
    }

    fn state(&self) -> BindingState {
        self.state
    }

    fn is_ready(&mut self) -> bool {
        self.state != BindingState::Error && self.channel.is_open()
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if data.len() < PLDM_MSG_HEADER_LEN
            || data.len() > MAX_MCTP_FRAME_SIZE - MCTP_COMMON_HEADER_LEN
        {
            return Err(TransportError::Unsupported);
        }

        let mut frame = [0u8; MAX_MCTP_FRAME_SIZE];
        let frame_len = MCTP_COMMON_HEADER_LEN + data.len();
        let body = pldm_msg_into_mctp(&mut frame[..frame_len])
            .map_err(|_| TransportError::Unsupported)?;
        body.copy_from_slice(data);

        debug!(
            "MCTP send of {} bytes to eid {}",
            frame_len, self.endpoints.remote_eid
        );
        self.channel.send_packet(&frame[..frame_len])?;
        self.state = BindingState::Busy;
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut packet = [0u8; MAX_MCTP_FRAME_SIZE];
        let received = match self.channel.receive_packet(&mut packet) {
            Ok(n) => n,
            Err(e) => {
                if e == TransportError::DeviceError {
                    self.state = BindingState::Error;
                } else {
                    self.state = BindingState::Ready;
                }
                return Err(e);
            }
        };

        let body = pldm_msg_from_mctp(&packet[..received]).map_err(|e| {
            error!("Dropping non-PLDM MCTP packet: {:?}", e);
            self.state = BindingState::Ready;
            TransportError::DeviceError
        })?;

        let len = body.len().min(buf.len());
        buf[..len].copy_from_slice(&body[..len]);
        self.state = BindingState::Ready;
        Ok(len)
    }
}
