// Licensed under the Apache-2.0 license

//! ASF 2.0 message frames. ASF is push-only: the firmware emits event
//! frames toward the alert-sending device and expects no response
//! payload beyond the bus-level ack.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const ASF_MSG_COMMAND_SYSTEM_STATE: u8 = 0x01;
pub const ASF_MSG_COMMAND_MANAGEMENT_CONTROL: u8 = 0x02;
pub const ASF_MSG_COMMAND_MESSAGING: u8 = 0x04;

pub const ASF_MSG_SUBCOMMAND_STOP_WATCHDOG: u8 = 0x14;
pub const ASF_MSG_SUBCOMMAND_NO_RETRANSMIT: u8 = 0x16;
pub const ASF_MSG_SUBCOMMAND_SET_SYSTEM_STATE: u8 = 0x18;

pub const ASF_MSG_VERSION_1_0: u8 = 0x10;

pub const ASF_EVENT_SENSOR_TYPE_CHASSIS_INTRUSION: u8 = 0x05;
pub const ASF_EVENT_SENSOR_TYPE_FW_ERROR_PROGRESS: u8 = 0x0F;
pub const ASF_EVENT_SENSOR_TYPE_BOOT_ERROR: u8 = 0x1E;

pub const ASF_EVENT_TYPE_SENSOR_SPECIFIC: u8 = 0x6F;
pub const ASF_EVENT_SOURCE_TYPE_ASF10: u8 = 0x68;

pub const ASF_EVENT_SEVERITY_MONITOR: u8 = 0x01;
pub const ASF_EVENT_SEVERITY_NON_CRITICAL: u8 = 0x08;
pub const ASF_EVENT_SEVERITY_CRITICAL: u8 = 0x10;

pub const ASF_SENSOR_DEVICE_UNSPECIFIED: u8 = 0xFF;
pub const ASF_SENSOR_NUMBER_UNSPECIFIED: u8 = 0xFF;
pub const ASF_ENTITY_UNSPECIFIED: u8 = 0x00;

/// Single-frame alert transmission, sent without retransmission.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, PartialEq)]
#[repr(C, packed)]
pub struct AsfMsgNoRetransmit {
    pub command: u8,
    pub byte_count: u8,
    pub sub_command: u8,
    pub version: u8,
    pub event_sensor_type: u8,
    pub event_type: u8,
    pub event_offset: u8,
    pub event_source_type: u8,
    pub event_severity: u8,
    pub sensor_device: u8,
    pub sensor_number: u8,
    pub entity: u8,
    pub entity_instance: u8,
    pub event_data1: u8,
    pub event_data2: u8,
    pub event_data3: u8,
    pub event_data4: u8,
    pub event_data5: u8,
}

impl AsfMsgNoRetransmit {
    /// Builds a sensor-specific event frame. `byte_count` covers the
    /// bytes following it, per the SMBus block-write framing ASF rides
    /// on.
    pub fn new_event(event_sensor_type: u8, event_offset: u8, severity: u8) -> Self {
        AsfMsgNoRetransmit {
            command: ASF_MSG_COMMAND_MESSAGING,
            byte_count: (core::mem::size_of::<Self>() - 2) as u8,
            sub_command: ASF_MSG_SUBCOMMAND_NO_RETRANSMIT,
            version: ASF_MSG_VERSION_1_0,
            event_sensor_type,
            event_type: ASF_EVENT_TYPE_SENSOR_SPECIFIC,
            event_offset,
            event_source_type: ASF_EVENT_SOURCE_TYPE_ASF10,
            event_severity: severity,
            sensor_device: ASF_SENSOR_DEVICE_UNSPECIFIED,
            sensor_number: ASF_SENSOR_NUMBER_UNSPECIFIED,
            entity: ASF_ENTITY_UNSPECIFIED,
            entity_instance: 0x00,
            event_data1: 0x00,
            event_data2: 0x00,
            event_data3: 0x00,
            event_data4: 0x00,
            event_data5: 0x00,
        }
    }
}

/// Stop-watchdog frame, sent during boot hand-off so the alert-sending
/// device stops its boot watchdog.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, PartialEq)]
#[repr(C, packed)]
pub struct AsfStopWatchdog {
    pub command: u8,
    pub byte_count: u8,
    pub sub_command: u8,
    pub version: u8,
}

impl AsfStopWatchdog {
    pub fn new() -> Self {
        AsfStopWatchdog {
            command: ASF_MSG_COMMAND_MANAGEMENT_CONTROL,
            byte_count: 0x02,
            sub_command: ASF_MSG_SUBCOMMAND_STOP_WATCHDOG,
            version: ASF_MSG_VERSION_1_0,
        }
    }
}

impl Default for AsfStopWatchdog {
    fn default() -> Self {
        Self::new()
    }
}
