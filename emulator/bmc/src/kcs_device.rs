// Licensed under the Apache-2.0 license

use crate::responder::IpmiResponder;
use kcs_transport::io::{
    KcsIo, KcsReg, KcsState, KcsStatus, KCS_CONTROL_GET_STATUS_ABORT, KCS_CONTROL_READ,
    KCS_CONTROL_WRITE_END, KCS_CONTROL_WRITE_START,
};
use log::trace;
use std::sync::{Arc, Mutex};

/// Register-accurate software model of the BMC side of a KCS
/// interface. The host drives it through the `KcsIo` trait exactly as
/// it would drive hardware; a responder supplies command behavior once
/// a full request frame has arrived.
///
/// The model is synchronous: the BMC consumes host bytes instantly, so
/// IBF reads back clear unless the device is deliberately wedged for a
/// timeout test.
pub struct KcsDevice<R: IpmiResponder> {
    responder: R,
    state: KcsState,
    obf: bool,
    out_byte: u8,
    request: Vec<u8>,
    response: Vec<u8>,
    response_idx: usize,
    write_end_seen: bool,
    stuck_ibf: bool,
    error_state: bool,
    tap: Option<Arc<Mutex<Vec<Vec<u8>>>>>,
}

impl<R: IpmiResponder> KcsDevice<R> {
    pub fn new(responder: R) -> Self {
        Self {
            responder,
            state: KcsState::Idle,
            obf: false,
            out_byte: 0,
            request: Vec::new(),
            response: Vec::new(),
            response_idx: 0,
            write_end_seen: false,
            stuck_ibf: false,
            error_state: false,
            tap: None,
        }
    }

    /// IBF never clears; host-side status waits must hit their budget.
    pub fn with_stuck_ibf(mut self) -> Self {
        self.stuck_ibf = true;
        self
    }

    /// The interface reports the error state on every status read.
    pub fn with_error_state(mut self) -> Self {
        self.error_state = true;
        self
    }

    /// Shares each completed request frame with the test.
    pub fn with_tap(mut self, tap: Arc<Mutex<Vec<Vec<u8>>>>) -> Self {
        self.tap = Some(tap);
        self
    }

    fn finish_request(&mut self) {
        if let Some(tap) = &self.tap {
            tap.lock().unwrap().push(self.request.clone());
        }
        self.response = self.responder.handle(&self.request);
        if self.response.is_empty() {
            self.state = KcsState::Error;
            return;
        }
        // First response byte goes out; the rest follow as the host
        // acknowledges with READ control codes.
        self.state = KcsState::Read;
        self.out_byte = self.response[0];
        self.response_idx = 1;
        self.obf = true;
    }

    fn advance_read(&mut self) {
        if self.response_idx < self.response.len() {
            self.out_byte = self.response[self.response_idx];
            self.response_idx += 1;
        } else {
            // Transfer done: idle state plus a dummy byte for the
            // host's final read.
            self.state = KcsState::Idle;
            self.out_byte = 0x00;
        }
        self.obf = true;
    }
}

impl<R: IpmiResponder> KcsIo for KcsDevice<R> {
    fn read(&mut self, reg: KcsReg) -> u8 {
        match reg {
            KcsReg::Status => {
                let mut status = KcsStatus(0);
                status.set_obf(self.obf as u8);
                status.set_ibf(self.stuck_ibf as u8);
                let state = if self.error_state {
                    KcsState::Error
                } else {
                    self.state
                };
                status.set_state(state as u8);
                status.0
            }
            KcsReg::DataIn => {
                self.obf = false;
                self.out_byte
            }
            _ => 0,
        }
    }

    fn write(&mut self, reg: KcsReg, value: u8) {
        trace!("KCS device write {:?} <- {:#04x}", reg, value);
        match reg {
            KcsReg::Command => match value {
                KCS_CONTROL_WRITE_START => {
                    self.state = KcsState::Write;
                    self.request.clear();
                    self.write_end_seen = false;
                }
                KCS_CONTROL_WRITE_END => {
                    self.write_end_seen = true;
                }
                KCS_CONTROL_GET_STATUS_ABORT => {
                    self.state = KcsState::Idle;
                    self.obf = false;
                }
                _ => {}
            },
            KcsReg::DataOut => match self.state {
                KcsState::Write => {
                    self.request.push(value);
                    if self.write_end_seen {
                        self.finish_request();
                    }
                }
                KcsState::Read => {
                    if value == KCS_CONTROL_READ {
                        self.advance_read();
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
}
