// Licensed under the Apache-2.0 license

#![cfg_attr(target_os = "none", no_std)]

use sdm_mbox_common::messages::{CLIENT_ID_BOOTLOADER, REQUEST_ID_BOOTLOADER};

/// Configures how the bootloader talks to the Secure Device Manager mailbox.
/// These are the defaults that can be overridden by a platform before the
/// mailbox is brought up.
///
/// Every wait in the mailbox driver is a busy-poll: the `*_polls` fields are
/// the number of samples taken, each separated by `poll_interval_us`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SdmMailboxConfig {
    /// Base address of the mailbox register block.
    pub mbox_offset: u32,
    /// Client identifier stamped into every request header.
    pub client_id: u32,
    /// Request identifier used for correlation when the caller has no preference.
    pub request_id: u32,
    pub poll_interval_us: u32,
    /// Samples while waiting for a free command ring slot.
    pub cmd_space_polls: u32,
    /// Samples while waiting for the far end to drain a burst that overflowed.
    pub cmd_drain_polls: u32,
    /// Samples while waiting for the doorbell from the far end.
    pub doorbell_polls: u32,
    /// Samples while waiting for each trailing word of a response.
    pub resp_word_polls: u32,
    /// Total doorbell samples one call may spend discarding unmatched
    /// responses. `None` keeps waiting for as long as the far end keeps
    /// ringing.
    pub call_deadline_polls: Option<u32>,
    /// Attempts made by the retry wrapper, including the first.
    pub retry_attempts: u32,
    pub retry_delay_us: u32,
    /// Interval between FPGA configuration status queries.
    pub config_status_interval_us: u32,
    /// Give up on FPGA configuration after this long.
    pub config_status_timeout_ms: u32,
}

impl SdmMailboxConfig {
    pub const DEFAULT: Self = SdmMailboxConfig {
        mbox_offset: 0xffa3_0000,
        client_id: CLIENT_ID_BOOTLOADER,
        request_id: REQUEST_ID_BOOTLOADER,
        poll_interval_us: 1000,
        cmd_space_polls: 1000,
        cmd_drain_polls: 2000,
        doorbell_polls: 1000,
        resp_word_polls: 2000,
        call_deadline_polls: None,
        retry_attempts: 3,
        retry_delay_us: 2000,
        config_status_interval_us: 1_000_000,
        config_status_timeout_ms: 60_000,
    };

    /// Nominal upper bound, in microseconds, of a single doorbell wait.
    pub const fn doorbell_timeout_us(&self) -> u64 {
        self.doorbell_polls as u64 * self.poll_interval_us as u64
    }
}

impl Default for SdmMailboxConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
