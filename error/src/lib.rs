// Licensed under the Apache-2.0 license

#![cfg_attr(target_os = "none", no_std)]

use core::num::NonZeroU32;

/// Fatal boot error code reported to the fatal error handler.
///
/// The upper half identifies the subsystem that gave up, the lower half the
/// step that failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BootError(pub NonZeroU32);

impl BootError {
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("BootError cannot be 0"),
        }
    }

    // SDM mailbox
    pub const SDM_MBOX_INIT: BootError = Self::new_const(0x0001_0001);
    pub const SDM_MBOX_COLD_RESET: BootError = Self::new_const(0x0001_0002);
    pub const SDM_MBOX_UNRESPONSIVE: BootError = Self::new_const(0x0001_0003);

    // FPGA configuration
    pub const FPGA_CONFIG_HW_ERROR: BootError = Self::new_const(0x0002_0001);
    pub const FPGA_CONFIG_TIMEOUT: BootError = Self::new_const(0x0002_0002);
    pub const FPGA_CONFIG_FAILED: BootError = Self::new_const(0x0002_0003);

    pub const fn subsystem(&self) -> u16 {
        (self.0.get() >> 16) as u16
    }
}

impl From<BootError> for u32 {
    fn from(err: BootError) -> Self {
        err.0.get()
    }
}

impl From<BootError> for NonZeroU32 {
    fn from(err: BootError) -> Self {
        err.0
    }
}
