// Licensed under the Apache-2.0 license

use crate::io::{
    KcsIo, KcsReg, KcsState, KcsStatus, KCS_CONTROL_READ, KCS_CONTROL_WRITE_END,
    KCS_CONTROL_WRITE_START,
};
use log::{debug, error};
use mgmt_config::{AccessType, KcsRegisterMap, PollBudget};
use mgmt_dispatch::binding::{
    BindingState, ChannelDescriptor, ManageabilityTransport, ProtocolFamily, TransportError,
};

/// KCS transport binding carrying IPMI request/response frames.
///
/// The write and read sequences follow the BMC-to-SMS transfer flow
/// charts of IPMI specification 2.0, figures 9-6 and 9-7. Every status
/// wait is bounded by the configured poll budget.
pub struct KcsTransport<I: KcsIo> {
    io: I,
    channel: ChannelDescriptor,
    budget: PollBudget,
    state: BindingState,
}

impl<I: KcsIo> KcsTransport<I> {
    pub fn new(io: I, map: &KcsRegisterMap, budget: PollBudget) -> Self {
        let channel = match map.access_type {
            AccessType::Io => ChannelDescriptor::IoPort(map.data_in as u16),
            AccessType::Mmio => ChannelDescriptor::Mmio(map.data_in),
        };
        Self {
            io,
            channel,
            budget,
            state: BindingState::Ready,
        }
    }

    fn status(&mut self) -> KcsStatus {
        KcsStatus(self.io.read(KcsReg::Status))
    }

    /// Waits for the input buffer full flag to clear, at most
    /// `status_poll_count` polls.
    fn wait_ibf_clear(&mut self) -> Result<(), TransportError> {
        let mut polls: u32 = 0;
        while self.status().ibf() != 0 {
            polls += 1;
            if polls >= self.budget.status_poll_count {
                return Err(TransportError::Timeout);
            }
            self.io.poll_delay();
        }
        Ok(())
    }

    /// Waits for the output buffer full flag to set, at most
    /// `status_poll_count` polls.
    fn wait_obf_set(&mut self) -> Result<(), TransportError> {
        let mut polls: u32 = 0;
        while self.status().obf() == 0 {
            polls += 1;
            if polls >= self.budget.status_poll_count {
                return Err(TransportError::Timeout);
            }
            self.io.poll_delay();
        }
        Ok(())
    }

    /// Drains a stale byte out of the output buffer. A BMC that keeps
    /// OBF asserted after the drain is not accepting commands.
    fn clear_obf(&mut self) -> Result<(), TransportError> {
        if self.status().obf() != 0 {
            self.io.read(KcsReg::DataIn);
            if self.status().obf() != 0 {
                return Err(TransportError::Busy);
            }
        }
        Ok(())
    }

    fn expect_write_state(&mut self) -> Result<(), TransportError> {
        if self.status().interface_state() != KcsState::Write {
            return Err(TransportError::Busy);
        }
        Ok(())
    }

    fn write_frame(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let (last, head) = data.split_last().ok_or(TransportError::Unsupported)?;

        self.wait_ibf_clear()?;
        self.clear_obf()?;

        self.io.write(KcsReg::Command, KCS_CONTROL_WRITE_START);
        self.wait_ibf_clear()?;
        self.expect_write_state()?;
        self.clear_obf()?;

        for byte in head {
            self.io.write(KcsReg::DataOut, *byte);
            self.wait_ibf_clear()?;
            self.expect_write_state()?;
            self.clear_obf()?;
        }

        self.io.write(KcsReg::Command, KCS_CONTROL_WRITE_END);
        self.wait_ibf_clear()?;
        self.expect_write_state()?;
        self.clear_obf()?;

        self.io.write(KcsReg::DataOut, *last);
        Ok(())
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut read = 0;
        while read < buf.len() {
            self.wait_ibf_clear()?;
            match self.status().interface_state() {
                KcsState::Read => {
                    self.wait_obf_set()?;
                    buf[read] = self.io.read(KcsReg::DataIn);
                    read += 1;
                    self.wait_ibf_clear()?;
                    self.io.write(KcsReg::DataOut, KCS_CONTROL_READ);
                }
                KcsState::Idle => {
                    self.wait_obf_set()?;
                    // Dummy read completes the transfer.
                    self.io.read(KcsReg::DataIn);
                    return Ok(read);
                }
                _ => {
                    error!("KCS interface left the read transfer, status {:?}", self.status());
                    return Err(TransportError::DeviceError);
                }
            }
        }
        Ok(read)
    }
}

impl<I: KcsIo> ManageabilityTransport for KcsTransport<I> {
    fn supports(&self, family: ProtocolFamily) -> bool {
        family == ProtocolFamily::Ipmi
    }

    fn channel(&self) -> ChannelDescriptor {
        self.channel
    }

    fn state(&self) -> BindingState {
        self.state
    }

    fn is_ready(&mut self) -> bool {
        self.state != BindingState::Error && self.status().ibf() == 0
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        debug!("KCS write of {} bytes", data.len());
        match self.write_frame(data) {
            Ok(()) => {
                self.state = BindingState::Busy;
                Ok(())
            }
            Err(TransportError::DeviceError) => {
                self.state = BindingState::Error;
                Err(TransportError::DeviceError)
            }
            // Timeouts and busy interfaces leave the binding usable;
            // the caller decides whether to try again.
            Err(e) => Err(e),
        }
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let result = self.read_frame(buf);
        match &result {
            Ok(read) => {
                debug!("KCS read of {} bytes", read);
                self.state = BindingState::Ready;
            }
            Err(TransportError::DeviceError) => self.state = BindingState::Error,
            Err(_) => self.state = BindingState::Ready,
        }
        result
    }
}
