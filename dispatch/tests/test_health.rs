// Licensed under the Apache-2.0 license

mod common;

use common::MockBinding;
use mgmt_config::PollBudget;
use mgmt_dispatch::binding::ProtocolFamily;
use mgmt_dispatch::dispatcher::{CommandDispatcher, DefaultActions, DispatchError};
use mgmt_dispatch::health::{check_self_test, BmcStatus};
use mgmt_dispatch::registry::TransportRegistry;

// Get Self Test Results response frames: IPMI App response header
// (NetFn 0x07, cmd 0x04), then completion code, result, param.
fn self_test_frame(completion_code: u8, result: u8, param: u8) -> [u8; 5] {
    [0x1C, 0x04, completion_code, result, param]
}

fn setup(frame: &[u8]) -> (CommandDispatcher<DefaultActions>, TransportRegistry) {
    let mut registry = TransportRegistry::new();
    registry
        .register(
            ProtocolFamily::Ipmi,
            Box::new(MockBinding::new(ProtocolFamily::Ipmi).with_canned_response(frame)),
        )
        .unwrap();
    (CommandDispatcher::new(PollBudget::default()), registry)
}

#[test]
fn test_self_test_passing() {
    common::init_logging();
    let (mut dispatcher, mut registry) = setup(&self_test_frame(0x00, 0x55, 0x00));
    assert_eq!(
        check_self_test(&mut dispatcher, &mut registry),
        Ok(BmcStatus::Ok)
    );
}

#[test]
fn test_self_test_not_implemented_is_ok() {
    let (mut dispatcher, mut registry) = setup(&self_test_frame(0x00, 0x56, 0x00));
    assert_eq!(
        check_self_test(&mut dispatcher, &mut registry),
        Ok(BmcStatus::Ok)
    );
}

#[test]
fn test_self_test_corrupted_devices_is_soft_fail() {
    let (mut dispatcher, mut registry) = setup(&self_test_frame(0x00, 0x57, 0x80));
    assert_eq!(
        check_self_test(&mut dispatcher, &mut registry),
        Ok(BmcStatus::SoftFail)
    );
}

#[test]
fn test_self_test_fatal_hardware_is_hard_fail() {
    let (mut dispatcher, mut registry) = setup(&self_test_frame(0x00, 0x58, 0x01));
    assert_eq!(
        check_self_test(&mut dispatcher, &mut registry),
        Ok(BmcStatus::HardFail)
    );
}

#[test]
fn test_self_test_command_error_is_hard_fail() {
    let (mut dispatcher, mut registry) = setup(&self_test_frame(0xC1, 0x00, 0x00));
    assert_eq!(
        check_self_test(&mut dispatcher, &mut registry),
        Ok(BmcStatus::HardFail)
    );
}

#[test]
fn test_self_test_on_dead_transport_propagates() {
    let mut registry = TransportRegistry::new();
    let mut dispatcher = CommandDispatcher::new(PollBudget::default());
    assert_eq!(
        check_self_test(&mut dispatcher, &mut registry),
        Err(DispatchError::TransportNotFound)
    );
}

#[test]
fn test_soft_error_completion_code_is_counted() {
    let (mut dispatcher, mut registry) = setup(&self_test_frame(0xC0, 0x00, 0x00));
    assert_eq!(dispatcher.soft_error_count(), 0);
    let status = check_self_test(&mut dispatcher, &mut registry);
    assert_eq!(status, Ok(BmcStatus::HardFail));
    assert_eq!(dispatcher.soft_error_count(), 1);
}
