// Licensed under the Apache-2.0 license

use ipmi_common::codec::IpmiCodec;
use ipmi_common::protocol::base::{IpmiCompletionCode, IpmiMsgHeader, IpmiNetFn, IPMI_MSG_HEADER_LEN};
use ipmi_common::protocol::netfn_app::{
    GetDeviceIdResponse, IpmiAppCmd, IPMI_APP_SELFTEST_NO_ERROR,
};
use log::debug;
use zerocopy::IntoBytes;

/// BMC-side command behavior behind the KCS device model. Takes the
/// full request frame (header plus body) and returns the full response
/// frame.
pub trait IpmiResponder {
    fn handle(&mut self, request: &[u8]) -> Vec<u8>;
}

/// Echoes every request back as a success response carrying the
/// request body.
pub struct EchoResponder;

impl IpmiResponder for EchoResponder {
    fn handle(&mut self, request: &[u8]) -> Vec<u8> {
        let header: IpmiMsgHeader<[u8; IPMI_MSG_HEADER_LEN]> =
            match IpmiCodec::decode(request) {
                Ok(h) => h,
                Err(_) => return Vec::new(),
            };
        let mut response = header.into_response().0.to_vec();
        response.push(IpmiCompletionCode::Success as u8);
        response.extend_from_slice(&request[IPMI_MSG_HEADER_LEN..]);
        response
    }
}

/// Implements the App-NetFn commands platform init actually issues.
/// Anything else gets an Invalid Command completion code.
pub struct CoreAppResponder {
    pub self_test_result: u8,
    pub self_test_param: u8,
}

impl Default for CoreAppResponder {
    fn default() -> Self {
        Self {
            self_test_result: IPMI_APP_SELFTEST_NO_ERROR,
            self_test_param: 0x00,
        }
    }
}

impl CoreAppResponder {
    pub fn with_self_test_result(result: u8, param: u8) -> Self {
        Self {
            self_test_result: result,
            self_test_param: param,
        }
    }
}

impl IpmiResponder for CoreAppResponder {
    fn handle(&mut self, request: &[u8]) -> Vec<u8> {
        let header: IpmiMsgHeader<[u8; IPMI_MSG_HEADER_LEN]> =
            match IpmiCodec::decode(request) {
                Ok(h) => h,
                Err(_) => return Vec::new(),
            };
        debug!(
            "BMC handling NetFn {:#04x} command {:#04x}",
            header.netfn(),
            header.cmd()
        );

        let mut response = header.into_response().0.to_vec();
        if header.netfn() != IpmiNetFn::App as u8 {
            response.push(IpmiCompletionCode::InvalidCommand as u8);
            return response;
        }

        match IpmiAppCmd::try_from(header.cmd()) {
            Ok(IpmiAppCmd::GetDeviceId) => {
                let body = GetDeviceIdResponse {
                    completion_code: IpmiCompletionCode::Success as u8,
                    device_id: 0x20,
                    device_revision: 0x01,
                    firmware_rev_major: 0x01,
                    firmware_rev_minor: 0x05,
                    ipmi_version: 0x02,
                    additional_device_support: 0x88,
                    manufacturer_id: [0x57, 0x01, 0x00],
                    product_id: [0x34, 0x12],
                };
                response.extend_from_slice(body.as_bytes());
            }
            Ok(IpmiAppCmd::GetSelfTestResults) => {
                response.push(IpmiCompletionCode::Success as u8);
                response.push(self.self_test_result);
                response.push(self.self_test_param);
            }
            _ => response.push(IpmiCompletionCode::InvalidCommand as u8),
        }
        response
    }
}
