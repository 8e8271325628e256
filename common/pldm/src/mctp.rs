// Licensed under the Apache-2.0 license

use crate::protocol::base::PLDM_MSG_HEADER_LEN;
use bitfield::bitfield;

/// IANA-assigned MCTP message type carrying PLDM.
pub const MCTP_PLDM_MSG_TYPE: u8 = 0x01;
pub const MCTP_COMMON_HEADER_LEN: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum MctpFramingError {
    PayloadTooShort,
    InvalidMsgType,
}

bitfield! {
    #[derive(Copy, Clone, PartialEq)]
    pub struct MctpCommonHeader(u8);
    impl Debug;
    pub u8, ic, set_ic: 7, 7;
    pub u8, msg_type, set_msg_type: 6, 0;
}

/// Validates the MCTP common header of an inbound payload and returns
/// the PLDM message carried behind it.
pub fn pldm_msg_from_mctp(mctp_payload: &[u8]) -> Result<&[u8], MctpFramingError> {
    if mctp_payload.len() < MCTP_COMMON_HEADER_LEN + PLDM_MSG_HEADER_LEN {
        return Err(MctpFramingError::PayloadTooShort);
    }

    let common = MctpCommonHeader(mctp_payload[0]);
    if common.ic() != 0 || common.msg_type() != MCTP_PLDM_MSG_TYPE {
        return Err(MctpFramingError::InvalidMsgType);
    }

    Ok(&mctp_payload[MCTP_COMMON_HEADER_LEN..])
}

/// Stamps the MCTP common header into an outbound buffer and returns
/// the slice where the PLDM message goes.
pub fn pldm_msg_into_mctp(mctp_payload: &mut [u8]) -> Result<&mut [u8], MctpFramingError> {
    if mctp_payload.len() < MCTP_COMMON_HEADER_LEN + PLDM_MSG_HEADER_LEN {
        return Err(MctpFramingError::PayloadTooShort);
    }

    let mut common = MctpCommonHeader(0);
    common.set_ic(0);
    common.set_msg_type(MCTP_PLDM_MSG_TYPE);
    mctp_payload[0] = common.0;

    Ok(&mut mctp_payload[MCTP_COMMON_HEADER_LEN..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pldm_msg_from_mctp() {
        let mut payload = [0u8; 8];
        assert_eq!(
            pldm_msg_from_mctp(&payload),
            Err(MctpFramingError::InvalidMsgType)
        );

        payload[0] = MCTP_PLDM_MSG_TYPE;
        assert_eq!(pldm_msg_from_mctp(&payload).unwrap().len(), 7);

        let short = [MCTP_PLDM_MSG_TYPE; 3];
        assert_eq!(
            pldm_msg_from_mctp(&short),
            Err(MctpFramingError::PayloadTooShort)
        );
    }

    #[test]
    fn test_pldm_msg_into_mctp() {
        let mut payload = [0u8; 10];
        assert_eq!(pldm_msg_into_mctp(&mut payload).unwrap().len(), 9);
        assert_eq!(payload[0], MCTP_PLDM_MSG_TYPE);

        let mut short = [0u8; 2];
        assert_eq!(
            pldm_msg_into_mctp(&mut short),
            Err(MctpFramingError::PayloadTooShort)
        );
    }

    #[test]
    fn test_ic_bit_rejected() {
        let mut payload = [0u8; 8];
        payload[0] = 0x80 | MCTP_PLDM_MSG_TYPE;
        assert_eq!(
            pldm_msg_from_mctp(&payload),
            Err(MctpFramingError::InvalidMsgType)
        );
    }
}
