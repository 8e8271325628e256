// Licensed under the Apache-2.0 license

use log::debug;
use mctp_transport::channel::MctpChannel;
use mgmt_dispatch::binding::TransportError;
use pldm_common::codec::PldmCodec;
use pldm_common::mctp::{pldm_msg_from_mctp, MCTP_PLDM_MSG_TYPE};
use pldm_common::protocol::base::{
    PldmBaseCompletionCode, PldmControlCmd, PldmMsgHeader, PldmSupportedType,
    PLDM_MSG_HEADER_LEN,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// In-memory MCTP endpoint standing in for the BMC. Answers the PLDM
/// base control commands discovery starts with; everything else gets
/// an unsupported-command completion code.
pub struct LoopbackMctpChannel {
    open: bool,
    mute: bool,
    tid: u8,
    inbound: VecDeque<Vec<u8>>,
    tap: Option<Arc<Mutex<Vec<Vec<u8>>>>>,
}

impl LoopbackMctpChannel {
    pub fn new(tid: u8) -> Self {
        Self {
            open: true,
            mute: false,
            tid,
            inbound: VecDeque::new(),
            tap: None,
        }
    }

    /// The channel reports closed; submissions must fail readiness.
    pub fn closed(mut self) -> Self {
        self.open = false;
        self
    }

    /// Accepts requests but never answers them, for timeout tests.
    pub fn mute(mut self) -> Self {
        self.mute = true;
        self
    }

    pub fn with_tap(mut self, tap: Arc<Mutex<Vec<Vec<u8>>>>) -> Self {
        self.tap = Some(tap);
        self
    }

    /// Queues a raw MCTP packet for the host to receive, for tests
    /// scripting malformed traffic.
    pub fn inject_packet(&mut self, packet: &[u8]) {
        self.inbound.push_back(packet.to_vec());
    }

    fn respond(&mut self, header: PldmMsgHeader<[u8; PLDM_MSG_HEADER_LEN]>, body: &[u8]) {
        let mut packet = vec![MCTP_PLDM_MSG_TYPE];
        packet.extend_from_slice(&header.into_response().0);
        packet.extend_from_slice(body);
        self.inbound.push_back(packet);
    }
}

impl MctpChannel for LoopbackMctpChannel {
    fn is_open(&mut self) -> bool {
        self.open
    }

    fn send_packet(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if let Some(tap) = &self.tap {
            tap.lock().unwrap().push(data.to_vec());
        }
        if self.mute {
            return Ok(());
        }

        let payload = pldm_msg_from_mctp(data).map_err(|_| TransportError::DeviceError)?;
        let header: PldmMsgHeader<[u8; PLDM_MSG_HEADER_LEN]> =
            PldmCodec::decode(payload).map_err(|_| TransportError::DeviceError)?;
        if !header.is_request() {
            return Ok(());
        }
        debug!(
            "Loopback BMC handling PLDM type {:#04x} command {:#04x}",
            header.pldm_type(),
            header.cmd_code()
        );

        if header.pldm_type() == PldmSupportedType::Base as u8
            && header.cmd_code() == PldmControlCmd::GetTid as u8
        {
            let tid = self.tid;
            self.respond(header, &[PldmBaseCompletionCode::Success as u8, tid]);
        } else {
            self.respond(
                header,
                &[PldmBaseCompletionCode::UnsupportedPldmCmd as u8],
            );
        }
        Ok(())
    }

    fn receive_packet(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.inbound.pop_front() {
            Some(packet) => {
                let len = packet.len().min(buf.len());
                buf[..len].copy_from_slice(&packet[..len]);
                Ok(len)
            }
            None => Err(TransportError::Timeout),
        }
    }
}
