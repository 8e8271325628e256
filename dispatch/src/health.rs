// Licensed under the Apache-2.0 license

//! BMC health probing on top of the dispatcher, mirroring the
//! self-test check platform code runs before trusting the management
//! channel.

use crate::binding::ProtocolFamily;
use crate::dispatcher::{
    CommandDispatcher, CommandRequest, DispatchError, StateMachineActions,
};
use crate::registry::TransportRegistry;
use ipmi_common::codec::IpmiCodec;
use ipmi_common::protocol::base::{IpmiCompletionCode, IpmiNetFn, BMC_LUN};
use ipmi_common::protocol::netfn_app::{
    IpmiAppCmd, SelfTestResultResponse, IPMI_APP_SELFTEST_ERROR, IPMI_APP_SELFTEST_NO_ERROR,
    IPMI_APP_SELFTEST_NOT_IMPLEMENTED, IPMI_APP_SELFTEST_RESERVED,
};
use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmcStatus {
    Ok,
    SoftFail,
    HardFail,
}

/// Runs Get Self Test Results and interprets the outcome. 0x55-0x58
/// are the results the IPMI specification defines; anything else is a
/// device-specific hardware failure.
///
/// Retries once on a congested transport; the dispatcher itself never
/// retries, so the bound lives here with the caller.
pub fn check_self_test<A: StateMachineActions>(
    dispatcher: &mut CommandDispatcher<A>,
    registry: &mut TransportRegistry,
) -> Result<BmcStatus, DispatchError> {
    let request = CommandRequest {
        protocol: ProtocolFamily::Ipmi,
        type_or_netfn: IpmiNetFn::App as u8,
        command: IpmiAppCmd::GetSelfTestResults as u8,
        lun: BMC_LUN,
        payload: &[],
        expected_response_size: core::mem::size_of::<SelfTestResultResponse>(),
    };

    let mut buf = [0u8; core::mem::size_of::<SelfTestResultResponse>()];
    let response = match dispatcher.submit_command(registry, &request, &mut buf) {
        Ok(response) => response,
        Err(DispatchError::TransportNotReady) => {
            warn!("Self test hit a busy transport, retrying once");
            dispatcher.submit_command(registry, &request, &mut buf)?
        }
        Err(e) => return Err(e),
    };

    if response.completion_code != IpmiCompletionCode::Success as u8 {
        warn!(
            "Get Self Test Results failed with completion code {:#04x}",
            response.completion_code
        );
        return Ok(BmcStatus::HardFail);
    }

    let result =
        SelfTestResultResponse::decode(&buf).map_err(|_| DispatchError::DeviceError)?;
    info!(
        "BMC self test result {:#04x} param {:#04x}",
        result.result, result.param
    );
    Ok(match result.result {
        IPMI_APP_SELFTEST_NO_ERROR | IPMI_APP_SELFTEST_NOT_IMPLEMENTED
        | IPMI_APP_SELFTEST_RESERVED => BmcStatus::Ok,
        IPMI_APP_SELFTEST_ERROR => BmcStatus::SoftFail,
        // 0x58 and device-specific codes are hardware failures.
        _ => BmcStatus::HardFail,
    })
}
