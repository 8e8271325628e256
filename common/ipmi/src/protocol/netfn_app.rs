// Licensed under the Apache-2.0 license

use crate::error::IpmiError;
use core::convert::TryFrom;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum IpmiAppCmd {
    GetDeviceId = 0x01,
    ColdReset = 0x02,
    WarmReset = 0x03,
    GetSelfTestResults = 0x04,
    GetDeviceGuid = 0x08,
    ResetWatchdogTimer = 0x22,
    SetWatchdogTimer = 0x24,
    GetWatchdogTimer = 0x25,
}

impl TryFrom<u8> for IpmiAppCmd {
    type Error = IpmiError;

    fn try_from(value: u8) -> Result<Self, IpmiError> {
        match value {
            0x01 => Ok(IpmiAppCmd::GetDeviceId),
            0x02 => Ok(IpmiAppCmd::ColdReset),
            0x03 => Ok(IpmiAppCmd::WarmReset),
            0x04 => Ok(IpmiAppCmd::GetSelfTestResults),
            0x08 => Ok(IpmiAppCmd::GetDeviceGuid),
            0x22 => Ok(IpmiAppCmd::ResetWatchdogTimer),
            0x24 => Ok(IpmiAppCmd::SetWatchdogTimer),
            0x25 => Ok(IpmiAppCmd::GetWatchdogTimer),
            _ => Err(IpmiError::InvalidCommand),
        }
    }
}

/// Get Device ID response body, completion code first.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, PartialEq)]
#[repr(C, packed)]
pub struct GetDeviceIdResponse {
    pub completion_code: u8,
    pub device_id: u8,
    pub device_revision: u8,
    pub firmware_rev_major: u8,
    pub firmware_rev_minor: u8,
    pub ipmi_version: u8,
    pub additional_device_support: u8,
    pub manufacturer_id: [u8; 3],
    pub product_id: [u8; 2],
}

pub const IPMI_APP_SELFTEST_NO_ERROR: u8 = 0x55;
pub const IPMI_APP_SELFTEST_NOT_IMPLEMENTED: u8 = 0x56;
pub const IPMI_APP_SELFTEST_ERROR: u8 = 0x57;
pub const IPMI_APP_SELFTEST_FATAL_HW_ERROR: u8 = 0x58;
pub const IPMI_APP_SELFTEST_RESERVED: u8 = 0xFF;

/// Get Self Test Results response body. `param` qualifies `result` when
/// the result byte is 0x57 (device-specific failure detail otherwise).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, PartialEq)]
#[repr(C, packed)]
pub struct SelfTestResultResponse {
    pub completion_code: u8,
    pub result: u8,
    pub param: u8,
}
