// Licensed under the Apache-2.0 license

use bitfield::bitfield;

/// KCS interface registers. Data-in and data-out share one address on
/// the bus, command and status the other; the access direction selects
/// which register the hardware presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KcsReg {
    /// BMC-to-host data (host reads).
    DataIn,
    /// Host-to-BMC data (host writes).
    DataOut,
    /// Control codes (host writes).
    Command,
    /// Interface status flags (host reads).
    Status,
}

/// Register access for one KCS interface instance. Platform code
/// provides a port-I/O or MMIO implementation built from its
/// `KcsRegisterMap`; tests provide a software device.
pub trait KcsIo {
    fn read(&mut self, reg: KcsReg) -> u8;

    fn write(&mut self, reg: KcsReg, value: u8);

    /// Called once per status poll iteration. Platform implementations
    /// insert the 1 ms delay the poll budget is calibrated against;
    /// device models need none.
    fn poll_delay(&mut self) {}
}

pub const KCS_CONTROL_GET_STATUS_ABORT: u8 = 0x60;
pub const KCS_CONTROL_WRITE_START: u8 = 0x61;
pub const KCS_CONTROL_WRITE_END: u8 = 0x62;
pub const KCS_CONTROL_READ: u8 = 0x68;

/// Interface state encoded in status bits 7:6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KcsState {
    Idle = 0x00,
    Read = 0x01,
    Write = 0x02,
    Error = 0x03,
}

bitfield! {
    #[derive(Copy, Clone, PartialEq)]
    pub struct KcsStatus(u8);
    impl Debug;
    pub u8, obf, set_obf: 0, 0;
    pub u8, ibf, set_ibf: 1, 1;
    pub u8, sms_atn, set_sms_atn: 2, 2;
    pub u8, cd, set_cd: 3, 3;
    pub u8, state, set_state: 7, 6;
}

impl KcsStatus {
    pub fn interface_state(&self) -> KcsState {
        match self.state() {
            0x00 => KcsState::Idle,
            0x01 => KcsState::Read,
            0x02 => KcsState::Write,
            _ => KcsState::Error,
        }
    }
}
