// Licensed under the Apache-2.0 license

use crate::error::IpmiError;
use bitfield::bitfield;
use core::convert::TryFrom;
use zerocopy::{FromBytes, Immutable, IntoBytes};

pub const IPMI_MSG_HEADER_LEN: usize = 2;

/// LUN 0 addresses the BMC itself.
pub const BMC_LUN: u8 = 0x00;
pub const IPMI_MAX_LUN: u8 = 0x03;

/// Network functions are even for requests; the matching response uses
/// the request NetFn with the low bit set.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum IpmiNetFn {
    Chassis = 0x00,
    Bridge = 0x02,
    SensorEvent = 0x04,
    App = 0x06,
    Firmware = 0x08,
    Storage = 0x0A,
    Transport = 0x0C,
    GroupExtension = 0x2C,
}

impl TryFrom<u8> for IpmiNetFn {
    type Error = IpmiError;

    fn try_from(value: u8) -> Result<Self, IpmiError> {
        match value {
            0x00 => Ok(IpmiNetFn::Chassis),
            0x02 => Ok(IpmiNetFn::Bridge),
            0x04 => Ok(IpmiNetFn::SensorEvent),
            0x06 => Ok(IpmiNetFn::App),
            0x08 => Ok(IpmiNetFn::Firmware),
            0x0A => Ok(IpmiNetFn::Storage),
            0x0C => Ok(IpmiNetFn::Transport),
            0x2C => Ok(IpmiNetFn::GroupExtension),
            _ => Err(IpmiError::InvalidNetFn),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum IpmiCompletionCode {
    Success = 0x00,
    NodeBusy = 0xC0,
    InvalidCommand = 0xC1,
    InvalidCommandForLun = 0xC2,
    Timeout = 0xC3,
    OutOfSpace = 0xC4,
    ReservationCanceled = 0xC5,
    RequestDataTruncated = 0xC6,
    RequestDataLengthInvalid = 0xC7,
    RequestDataLengthLimitExceeded = 0xC8,
    ParameterOutOfRange = 0xC9,
    CannotReturnRequestedBytes = 0xCA,
    RequestedDataNotPresent = 0xCB,
    InvalidDataField = 0xCC,
    CommandIllegalForSensor = 0xCD,
    ResponseNotProvided = 0xCE,
    DuplicatedRequest = 0xCF,
    SdrRepositoryInUpdate = 0xD0,
    DeviceInFirmwareUpdate = 0xD1,
    BmcInitializationInProgress = 0xD2,
    DestinationUnavailable = 0xD3,
    InsufficientPrivilege = 0xD4,
    NotSupportedInPresentState = 0xD5,
    SubFunctionDisabled = 0xD6,
    UnspecifiedError = 0xFF,
}

/// Completion codes the BMC returns for transient conditions. A command
/// failing with one of these counts against the interface soft-error
/// budget rather than marking the interface broken.
pub const IPMI_SOFT_ERROR_COMPLETION_CODES: [u8; 7] =
    [0xC0, 0xC3, 0xC4, 0xC9, 0xCE, 0xCF, 0xFF];

pub fn is_soft_error_completion_code(code: u8) -> bool {
    IPMI_SOFT_ERROR_COMPLETION_CODES.contains(&code)
}

bitfield! {
    #[repr(C)]
    #[derive(Copy, Clone, FromBytes, IntoBytes, Immutable, PartialEq)]
    pub struct IpmiMsgHeader([u8]);
    impl Debug;
    pub u8, lun, set_lun: 1, 0;
    pub u8, netfn, set_netfn: 7, 2;
    pub u8, cmd, set_cmd: 15, 8;
}

impl IpmiMsgHeader<[u8; IPMI_MSG_HEADER_LEN]> {
    pub fn new(netfn: IpmiNetFn, lun: u8, cmd: u8) -> Self {
        Self::from_parts(netfn as u8, lun, cmd)
    }

    /// Builds a header from raw field values, for dispatch paths that
    /// carry NetFn as a plain byte.
    pub fn from_parts(netfn: u8, lun: u8, cmd: u8) -> Self {
        let mut header = IpmiMsgHeader([0; IPMI_MSG_HEADER_LEN]);
        header.set_netfn(netfn & 0x3F);
        header.set_lun(lun & IPMI_MAX_LUN);
        header.set_cmd(cmd);
        header
    }

    /// Responses carry the request NetFn with the low bit set.
    pub fn is_response(&self) -> bool {
        self.netfn() & 0x01 != 0
    }

    pub fn into_response(&self) -> Self {
        let mut header = *self;
        header.set_netfn(self.netfn() | 0x01);
        header
    }

    /// NetFn of the request this header belongs to, response bit cleared.
    pub fn request_netfn(&self) -> u8 {
        self.netfn() & !0x01
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::IpmiCodec;

    #[test]
    fn test_header_layout() {
        let header = IpmiMsgHeader::new(IpmiNetFn::App, BMC_LUN, 0x01);
        assert_eq!(header.0, [0x18, 0x01]);
        assert!(!header.is_response());

        let response = header.into_response();
        assert_eq!(response.0, [0x1C, 0x01]);
        assert!(response.is_response());
        assert_eq!(response.request_netfn(), IpmiNetFn::App as u8);
    }

    #[test]
    fn test_header_round_trip() {
        for netfn in [
            IpmiNetFn::Chassis,
            IpmiNetFn::SensorEvent,
            IpmiNetFn::App,
            IpmiNetFn::Storage,
            IpmiNetFn::Transport,
        ] {
            for lun in 0..=IPMI_MAX_LUN {
                let header = IpmiMsgHeader::new(netfn, lun, 0x42);
                let mut buffer = [0; IPMI_MSG_HEADER_LEN];
                let size = header.encode(&mut buffer).unwrap();
                assert_eq!(size, IPMI_MSG_HEADER_LEN);

                let decoded = IpmiMsgHeader::decode(&buffer).unwrap();
                assert_eq!(header, decoded);
                assert_eq!(decoded.netfn(), netfn as u8);
                assert_eq!(decoded.lun(), lun);
                assert_eq!(decoded.cmd(), 0x42);
            }
        }
    }

    #[test]
    fn test_lun_masked_to_two_bits() {
        let header = IpmiMsgHeader::new(IpmiNetFn::App, 0x07, 0x01);
        assert_eq!(header.lun(), 0x03);
        assert_eq!(header.netfn(), IpmiNetFn::App as u8);
    }

    #[test]
    fn test_soft_error_codes() {
        assert!(is_soft_error_completion_code(
            IpmiCompletionCode::NodeBusy as u8
        ));
        assert!(is_soft_error_completion_code(
            IpmiCompletionCode::UnspecifiedError as u8
        ));
        assert!(!is_soft_error_completion_code(
            IpmiCompletionCode::Success as u8
        ));
        assert!(!is_soft_error_completion_code(
            IpmiCompletionCode::InvalidCommand as u8
        ));
    }
}
