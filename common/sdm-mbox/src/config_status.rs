// Licensed under the Apache-2.0 license

use bitflags::bitflags;
use core::fmt;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Number of words returned by `CONFIG_STATUS` and `RECONFIG_STATUS`.
pub const RECONFIG_STATUS_RESP_LEN: usize = 6;

pub const CFGSTAT_STATE_IDLE: u32 = 0;
/// State word reported while the fabric is still being configured.
pub const CFGSTAT_STATE_CONFIG: u32 = 0x1000_0000;
pub const CFGSTAT_STATE_FAILACK: u32 = 0x0800_0000;
pub const CFGSTAT_STATE_ERROR_INVALID: u32 = 0xf000_0001;
pub const CFGSTAT_STATE_ERROR_CORRUPT: u32 = 0xf000_0002;
pub const CFGSTAT_STATE_ERROR_AUTH: u32 = 0xf000_0003;
pub const CFGSTAT_STATE_ERROR_CORE_IO: u32 = 0xf000_0004;
/// Code reported upward when the status words show a hardware fault.
pub const CFGSTAT_STATE_ERROR_HARDWARE: u32 = 0xf000_0005;
pub const CFGSTAT_STATE_ERROR_FAKE: u32 = 0xf000_0006;
pub const CFGSTAT_STATE_ERROR_BOOT_INFO: u32 = 0xf000_0007;
pub const CFGSTAT_STATE_ERROR_QSPI: u32 = 0xf000_0008;
/// Generic mailbox error code, also seen in place of a state word.
pub const CFGSTAT_STATE_MBOX_ERROR: u32 = 0x3ff;

/// Readable name of a configuration state word.
pub fn config_state_name(state: u32) -> &'static str {
    match state {
        CFGSTAT_STATE_IDLE => "FPGA idle",
        CFGSTAT_STATE_CONFIG => "FPGA in configuration",
        CFGSTAT_STATE_FAILACK => "acknowledge failed",
        CFGSTAT_STATE_ERROR_INVALID => "invalid bitstream",
        CFGSTAT_STATE_ERROR_CORRUPT => "corrupted bitstream",
        CFGSTAT_STATE_ERROR_AUTH => "bitstream authentication failed",
        CFGSTAT_STATE_ERROR_CORE_IO => "core I/O error",
        CFGSTAT_STATE_ERROR_HARDWARE => "hardware error",
        CFGSTAT_STATE_ERROR_FAKE => "fake error",
        CFGSTAT_STATE_ERROR_BOOT_INFO => "bad boot info",
        CFGSTAT_STATE_ERROR_QSPI => "QSPI error",
        CFGSTAT_STATE_MBOX_ERROR => "mailbox error",
        _ => "unknown state",
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct PinStatus: u32 {
        const NSTATUS = 1 << 31;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct SoftFuncStatus: u32 {
        const CONF_DONE = 1 << 0;
        const INIT_DONE = 1 << 1;
        const SEU_ERROR = 1 << 3;
    }
}

/// Result words of a configuration status query, in the order the far end
/// produces them.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ReconfigStatusResp {
    pub state: u32,
    pub version: u32,
    pub pin_status: u32,
    pub softfunc_status: u32,
    pub error_location: u32,
    pub error_details: u32,
}

/// FPGA fabric configuration state as seen by the bootloader.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfigStatus {
    Configured,
    /// Still configuring; ask again later.
    Configuring,
    /// nSTATUS low or an SEU error; not recoverable by waiting.
    HardwareError,
    /// The far end reported this non-zero state word.
    Failed(u32),
}

impl ReconfigStatusResp {
    /// Parses the result words of a status query. Missing trailing words
    /// read as zero.
    pub fn from_words(words: &[u32]) -> Self {
        let mut padded = [0u32; RECONFIG_STATUS_RESP_LEN];
        let len = words.len().min(RECONFIG_STATUS_RESP_LEN);
        padded[..len].copy_from_slice(&words[..len]);
        Self::read_from_bytes(padded.as_bytes()).unwrap_or_default()
    }

    pub fn pin_status(&self) -> PinStatus {
        PinStatus::from_bits_truncate(self.pin_status)
    }

    pub fn softfunc_status(&self) -> SoftFuncStatus {
        SoftFuncStatus::from_bits_truncate(self.softfunc_status)
    }

    pub fn evaluate(&self) -> ConfigStatus {
        if self.state != 0 && self.state != CFGSTAT_STATE_CONFIG {
            return ConfigStatus::Failed(self.state);
        }

        if !self.pin_status().contains(PinStatus::NSTATUS) {
            return ConfigStatus::HardwareError;
        }

        let softfunc = self.softfunc_status();
        if softfunc.contains(SoftFuncStatus::SEU_ERROR) {
            return ConfigStatus::HardwareError;
        }

        if softfunc.contains(SoftFuncStatus::CONF_DONE | SoftFuncStatus::INIT_DONE) && self.state == 0
        {
            return ConfigStatus::Configured;
        }

        ConfigStatus::Configuring
    }
}

impl ConfigStatus {
    /// Status code in the form the boot flow reports it: zero on
    /// success, the raw state otherwise.
    pub fn code(&self) -> u32 {
        match self {
            ConfigStatus::Configured => 0,
            ConfigStatus::Configuring => CFGSTAT_STATE_CONFIG,
            ConfigStatus::HardwareError => CFGSTAT_STATE_ERROR_HARDWARE,
            ConfigStatus::Failed(state) => *state,
        }
    }
}

/// Splits a configuration error word into its major `[31:16]` and minor
/// `[15:0]` parts.
pub fn split_config_error(err: u32) -> (u16, u16) {
    ((err >> 16) as u16, (err & 0xffff) as u16)
}

/// Major error classes of a configuration error word.
pub mod major_error {
    pub const STATE_CONFIG: u16 = 0x1000;
    pub const BITSTREAM: u16 = 0xf001;
    pub const EXT_HW_ACCESS: u16 = 0xf002;
    pub const BITSTREAM_CORRUPTION: u16 = 0xf003;
    pub const INTERNAL: u16 = 0xf004;
    pub const DEVICE: u16 = 0xf005;
    pub const HPS_WDT: u16 = 0xf006;
    pub const INTERNAL_UNKNOWN: u16 = 0xf007;
    pub const SYSTEM_INIT: u16 = 0xf008;
    pub const DECRYPTION: u16 = 0xf009;
    pub const VERIFY_IMAGE: u16 = 0xf00a;
}

/// Configuration error word from the `error_details` of a status response.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub major: u16,
    pub minor: u16,
}

impl ConfigError {
    pub fn from_word(err: u32) -> Self {
        let (major, minor) = split_config_error(err);
        ConfigError { major, minor }
    }

    /// A zero word carries no error information at all.
    pub fn is_reported(&self) -> bool {
        self.major != 0 || self.minor != 0
    }

    pub fn major_name(&self) -> &'static str {
        match self.major {
            0 if self.minor == 0 => "no error details reported",
            major_error::STATE_CONFIG => "mailbox in configuration state",
            major_error::BITSTREAM => "invalid bitstream",
            major_error::EXT_HW_ACCESS => "external hardware access failure",
            major_error::BITSTREAM_CORRUPTION => "bitstream corrupted while read from its source",
            major_error::INTERNAL => "bitstream element not understood",
            major_error::DEVICE => "configuration network unreachable",
            major_error::HPS_WDT => "HPS watchdog timeout",
            major_error::INTERNAL_UNKNOWN => "unknown internal error",
            major_error::SYSTEM_INIT => "system init failed before firmware start",
            major_error::DECRYPTION => "decryption error",
            major_error::VERIFY_IMAGE => "image verification error",
            _ => "unknown major error",
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The minor code only refines real errors.
        if !self.is_reported() || self.major == major_error::STATE_CONFIG {
            return f.write_str(self.major_name());
        }
        write!(f, "{} (minor {:#06x})", self.major_name(), self.minor)
    }
}
