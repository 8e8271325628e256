// Licensed under the Apache-2.0 license
#![allow(dead_code)]

use ipmi_common::codec::IpmiCodec;
use ipmi_common::protocol::base::{IpmiMsgHeader, IPMI_MSG_HEADER_LEN};
use log::LevelFilter;
use mgmt_dispatch::binding::{
    BindingState, ChannelDescriptor, ManageabilityTransport, ProtocolFamily, TransportError,
};
use simple_logger::SimpleLogger;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub fn init_logging() {
    let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
}

/// Scriptable in-memory transport binding. Captures every sent frame
/// and serves canned (or echoed) response frames.
pub struct MockBinding {
    family: ProtocolFamily,
    ready: bool,
    echo: bool,
    busy_after_send: bool,
    state: BindingState,
    receive_error: Option<TransportError>,
    responses: VecDeque<Vec<u8>>,
    tap: Option<Arc<Mutex<Vec<Vec<u8>>>>>,
    pub sent: Vec<Vec<u8>>,
}

impl MockBinding {
    pub fn new(family: ProtocolFamily) -> Self {
        Self {
            family,
            ready: true,
            echo: false,
            busy_after_send: true,
            state: BindingState::Ready,
            receive_error: None,
            responses: VecDeque::new(),
            tap: None,
            sent: Vec::new(),
        }
    }

    /// Shares every sent frame with the test through `tap`, since the
    /// binding itself disappears into the registry.
    pub fn with_tap(mut self, tap: Arc<Mutex<Vec<Vec<u8>>>>) -> Self {
        self.tap = Some(tap);
        self
    }

    /// Models a channel whose write completes immediately (SMBus-style
    /// ASF alerts): the binding stays ready after send.
    pub fn fire_and_forget(mut self) -> Self {
        self.busy_after_send = false;
        self
    }

    /// Queues a raw response frame (protocol header included).
    pub fn with_canned_response(mut self, frame: &[u8]) -> Self {
        self.responses.push_back(frame.to_vec());
        self
    }

    /// Echoes each IPMI request back as a success response: converted
    /// header, completion code 0x00, request payload.
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    /// `is_ready` never reports ready; submissions must hit the poll
    /// budget, not hang.
    pub fn never_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn failing_receive(mut self, error: TransportError) -> Self {
        self.receive_error = Some(error);
        self
    }
}

impl ManageabilityTransport for MockBinding {
    fn supports(&self, family: ProtocolFamily) -> bool {
        self.family == family
    }

    fn channel(&self) -> ChannelDescriptor {
        ChannelDescriptor::IoPort(0x0CA2)
    }

    fn state(&self) -> BindingState {
        self.state
    }

    fn is_ready(&mut self) -> bool {
        self.ready && self.state == BindingState::Ready
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.sent.push(data.to_vec());
        if let Some(tap) = &self.tap {
            tap.lock().unwrap().push(data.to_vec());
        }
        if self.echo {
            let header: IpmiMsgHeader<[u8; IPMI_MSG_HEADER_LEN]> =
                IpmiCodec::decode(data).expect("echo mock needs an IPMI header");
            let mut response = header.into_response().0.to_vec();
            response.push(0x00);
            response.extend_from_slice(&data[IPMI_MSG_HEADER_LEN..]);
            self.responses.push_back(response);
        }
        if self.busy_after_send {
            self.state = BindingState::Busy;
        }
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.state = BindingState::Ready;
        if let Some(error) = self.receive_error {
            return Err(error);
        }
        match self.responses.pop_front() {
            Some(frame) => {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                Ok(len)
            }
            None => Err(TransportError::Timeout),
        }
    }
}
