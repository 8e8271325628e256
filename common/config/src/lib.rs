// Licensed under the Apache-2.0 license

#![cfg_attr(target_arch = "riscv32", no_std)]

/// Register access method for a BMC system interface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccessType {
    /// Legacy port I/O, 16-bit addresses.
    Io,
    /// Memory-mapped registers.
    Mmio,
}

/// KCS register addresses for a platform. Data-in and data-out share
/// one address, command and status share the other; the direction of
/// the access selects the register.
///
/// These are the defaults that board code overrides before handing the
/// map to the transport.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KcsRegisterMap {
    pub access_type: AccessType,
    pub data_in: u64,
    pub data_out: u64,
    pub command: u64,
    pub status: u64,
}

impl Default for KcsRegisterMap {
    fn default() -> Self {
        KcsRegisterMap {
            access_type: AccessType::Io,
            data_in: 0x0CA2,
            data_out: 0x0CA2,
            command: 0x0CA3,
            status: 0x0CA3,
        }
    }
}

/// Bounded-wait budgets for transport polling. Every wait loop in the
/// transport layer is capped by one of these counts; exhausting a
/// budget surfaces as a timeout, never as a hang.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PollBudget {
    /// Status-flag polls before a KCS register wait gives up.
    pub status_poll_count: u32,
    /// Readiness polls before command submission gives up on a busy
    /// binding.
    pub ready_poll_count: u32,
}

impl Default for PollBudget {
    fn default() -> Self {
        // 5000 polls at the platform's 1 ms poll delay is the 5 second
        // window the KCS interface allows the BMC.
        PollBudget {
            status_poll_count: 5000,
            ready_poll_count: 100,
        }
    }
}

/// MCTP endpoint addressing for the PLDM channel.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MctpEndpointConfig {
    pub local_eid: u8,
    pub remote_eid: u8,
}

impl Default for MctpEndpointConfig {
    fn default() -> Self {
        MctpEndpointConfig {
            local_eid: 0x01,
            remote_eid: 0x08,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_kcs_map_is_legacy_io() {
        let map = KcsRegisterMap::default();
        assert_eq!(map.access_type, AccessType::Io);
        assert_eq!(map.data_in, map.data_out);
        assert_eq!(map.command, map.status);
        assert_eq!(map.data_in, 0x0CA2);
    }

    #[test]
    fn test_default_poll_budget_nonzero() {
        let budget = PollBudget::default();
        assert!(budget.status_poll_count > 0);
        assert!(budget.ready_poll_count > 0);
    }
}
