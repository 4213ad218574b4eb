// Licensed under the Apache-2.0 license

use core::convert::From;

/// Client identifier the bootloader stamps into its requests.
pub const CLIENT_ID_BOOTLOADER: u32 = 1;
/// Request identifier the bootloader uses when it has only one call in flight.
pub const REQUEST_ID_BOOTLOADER: u32 = 1;

pub const IDCODE_RESP_LEN: usize = 1;
pub const RSU_STATUS_RESP_LEN: usize = 9;

/// Command code carried in the low bits of a request header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CommandId(pub u32);

impl CommandId {
    pub const RESTART: Self = Self(0x2);
    pub const CANCEL: Self = Self(0x3);
    pub const CONFIG_STATUS: Self = Self(0x4);
    pub const RECONFIG: Self = Self(0x6);
    pub const RECONFIG_STATUS: Self = Self(0x9);
    pub const GET_IDCODE: Self = Self(0x10);
    pub const QSPI_OPEN: Self = Self(0x32);
    pub const QSPI_CLOSE: Self = Self(0x33);
    pub const QSPI_DIRECT: Self = Self(0x3b);
    pub const REBOOT_HPS: Self = Self(0x47);
    pub const RSU_STATUS: Self = Self(0x5b);
    pub const HPS_STAGE_NOTIFY: Self = Self(0x5d);
}

impl From<u32> for CommandId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<CommandId> for u32 {
    fn from(value: CommandId) -> Self {
        value.0
    }
}

/// Error code carried in a response header. Only `OK` and `DEVICE_BUSY`
/// mean anything to the mailbox driver, the rest are reported verbatim.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RespCode(pub u32);

impl RespCode {
    pub const OK: Self = Self(0);
    pub const INVALID_COMMAND: Self = Self(1);
    pub const UNKNOWN_BR: Self = Self(2);
    pub const UNKNOWN: Self = Self(3);
    pub const NOT_CONFIGURED: Self = Self(0x100);
    pub const DEVICE_BUSY: Self = Self(0x1ff);
    pub const NO_VALID_RESP_AVAILABLE: Self = Self(0x2ff);
    pub const ERROR: Self = Self(0x3ff);

    pub fn is_ok(&self) -> bool {
        *self == Self::OK
    }

    pub fn is_busy(&self) -> bool {
        *self == Self::DEVICE_BUSY
    }
}

impl From<RespCode> for u32 {
    fn from(value: RespCode) -> Self {
        value.0
    }
}

/// Boot stage reported to the far end with `HPS_STAGE_NOTIFY`.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HpsExecutionState {
    Fsbl = 0,
    Ssbl = 1,
    Os = 2,
}

impl From<HpsExecutionState> for u32 {
    fn from(value: HpsExecutionState) -> Self {
        value as u32
    }
}
