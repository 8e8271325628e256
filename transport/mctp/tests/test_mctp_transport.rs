// Licensed under the Apache-2.0 license

use bmc_emulator::mctp_channel::LoopbackMctpChannel;
use mctp_transport::transport::MctpTransport;
use mgmt_config::{MctpEndpointConfig, PollBudget};
use mgmt_dispatch::binding::{
    BindingState, ChannelDescriptor, ManageabilityTransport, ProtocolFamily, TransportError,
};
use mgmt_dispatch::dispatcher::{CommandDispatcher, CommandRequest, DispatchError};
use mgmt_dispatch::registry::TransportRegistry;
use pldm_common::protocol::base::{PldmControlCmd, PldmSupportedType};
use std::sync::{Arc, Mutex};

fn endpoints() -> MctpEndpointConfig {
    MctpEndpointConfig::default()
}

#[test]
fn test_frames_carry_the_pldm_message_type() {
    let tap = Arc::new(Mutex::new(Vec::new()));
    let mut transport = MctpTransport::new(
        LoopbackMctpChannel::new(0x2A).with_tap(tap.clone()),
        endpoints(),
    );

    // A PLDM GetTid request header, as the dispatcher would encode it.
    let pldm_msg = [0x80, 0x00, 0x02];
    transport.send(&pldm_msg).unwrap();
    assert_eq!(transport.state(), BindingState::Busy);

    let sent = tap.lock().unwrap();
    assert_eq!(sent[0][0], 0x01);
    assert_eq!(&sent[0][1..], &pldm_msg);
}

#[test]
fn test_receive_strips_the_common_header() {
    let mut transport = MctpTransport::new(LoopbackMctpChannel::new(0x2A), endpoints());

    transport.send(&[0x80, 0x00, 0x02]).unwrap();

    let mut buf = [0u8; 16];
    let len = transport.receive(&mut buf).unwrap();
    assert_eq!(&buf[..len], &[0x00, 0x00, 0x02, 0x00, 0x2A]);
    assert_eq!(transport.state(), BindingState::Ready);
}

#[test]
fn test_non_pldm_packet_rejected() {
    let mut channel = LoopbackMctpChannel::new(0x2A);
    // SPDM message type, not PLDM.
    channel.inject_packet(&[0x05, 0x00, 0x00, 0x02, 0x00]);
    let mut transport = MctpTransport::new(channel, endpoints());

    let mut buf = [0u8; 16];
    assert_eq!(
        transport.receive(&mut buf),
        Err(TransportError::DeviceError)
    );
}

#[test]
fn test_undersized_message_refused() {
    let mut transport = MctpTransport::new(LoopbackMctpChannel::new(0x2A), endpoints());
    // Shorter than a PLDM header; nothing valid can be framed.
    assert_eq!(
        transport.send(&[0x80, 0x00]),
        Err(TransportError::Unsupported)
    );
}

#[test]
fn test_closed_channel_is_not_ready() {
    let mut transport =
        MctpTransport::new(LoopbackMctpChannel::new(0x2A).closed(), endpoints());
    assert!(!transport.is_ready());
    assert_eq!(
        transport.channel(),
        ChannelDescriptor::MctpEndpoint {
            local_eid: 0x01,
            remote_eid: 0x08
        }
    );
}

#[test]
fn test_get_tid_through_the_dispatcher() {
    let mut registry = TransportRegistry::new();
    registry
        .register(
            ProtocolFamily::Pldm,
            Box::new(MctpTransport::new(
                LoopbackMctpChannel::new(0x2A),
                endpoints(),
            )),
        )
        .unwrap();
    let mut dispatcher = CommandDispatcher::new(PollBudget::default());

    let request = CommandRequest {
        protocol: ProtocolFamily::Pldm,
        type_or_netfn: PldmSupportedType::Base as u8,
        command: PldmControlCmd::GetTid as u8,
        lun: 0,
        payload: &[],
        expected_response_size: 2,
    };

    let mut buf = [0u8; 8];
    let response = dispatcher
        .submit_command(&mut registry, &request, &mut buf)
        .unwrap();

    assert_eq!(response.completion_code, 0x00);
    assert_eq!(buf[1], 0x2A);
}

#[test]
fn test_dispatcher_times_out_on_silent_channel() {
    let mut registry = TransportRegistry::new();
    registry
        .register(
            ProtocolFamily::Pldm,
            Box::new(MctpTransport::new(
                LoopbackMctpChannel::new(0x2A).mute(),
                endpoints(),
            )),
        )
        .unwrap();
    let mut dispatcher = CommandDispatcher::new(PollBudget::default());

    let request = CommandRequest {
        protocol: ProtocolFamily::Pldm,
        type_or_netfn: PldmSupportedType::Base as u8,
        command: PldmControlCmd::GetTid as u8,
        lun: 0,
        payload: &[],
        expected_response_size: 2,
    };

    let mut buf = [0u8; 4];
    assert_eq!(
        dispatcher.submit_command(&mut registry, &request, &mut buf),
        Err(DispatchError::Timeout)
    );
}

#[test]
fn test_unanswerable_command_reports_completion_code() {
    let mut registry = TransportRegistry::new();
    registry
        .register(
            ProtocolFamily::Pldm,
            Box::new(MctpTransport::new(
                LoopbackMctpChannel::new(0x2A),
                endpoints(),
            )),
        )
        .unwrap();
    let mut dispatcher = CommandDispatcher::new(PollBudget::default());

    let request = CommandRequest {
        protocol: ProtocolFamily::Pldm,
        type_or_netfn: PldmSupportedType::Base as u8,
        command: PldmControlCmd::SetTid as u8,
        lun: 0,
        payload: &[0x01],
        expected_response_size: 1,
    };

    // The exchange completes; the completion code carries the refusal
    // and the caller decides what to do with it.
    let mut buf = [0u8; 4];
    let response = dispatcher
        .submit_command(&mut registry, &request, &mut buf)
        .unwrap();
    assert_eq!(response.completion_code, 0x05);
}
